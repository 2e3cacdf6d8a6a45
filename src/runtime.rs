//! Runtime abstraction layer for timer-driven work
//!
//! Everything in this crate runs on one thread (the browser event loop, or a
//! test driving time by hand). This module provides the `Scheduler` seam used
//! for deferred work and the `Retry` primitive used by every polling loop.

use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

/// Deferred-work scheduler (`setTimeout` / `requestAnimationFrame`).
pub trait Scheduler {
    /// Run `task` once after `delay`
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>);

    /// Run `task` before the next paint
    fn request_animation_frame(&self, task: Box<dyn FnOnce()>) {
        self.set_timeout(Duration::from_millis(16), task);
    }
}

/// How many times a retry may re-arm after its first check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    Bounded(u32),
    Unbounded,
}

/// How a retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The probe reported success
    Done,
    /// The attempt bound was reached without success
    Exhausted,
    /// The liveness predicate turned false
    Cancelled,
}

/// Timer-based re-check loop.
///
/// The probe runs immediately, then once per `interval` until it succeeds,
/// the limit is hit, or the liveness predicate fails. Liveness is checked
/// before every probe, so a loop whose owner went away never fires again.
pub struct Retry {
    interval: Duration,
    limit: RetryLimit,
    alive: Option<Rc<dyn Fn() -> bool>>,
}

impl Retry {
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            limit: RetryLimit::Bounded(max_attempts),
            alive: None,
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            limit: RetryLimit::Unbounded,
            alive: None,
        }
    }

    /// Stop (with [`RetryOutcome::Cancelled`]) as soon as `alive` returns false.
    pub fn while_alive(mut self, alive: impl Fn() -> bool + 'static) -> Self {
        self.alive = Some(Rc::new(alive));
        self
    }

    pub fn limit(&self) -> RetryLimit {
        self.limit
    }

    /// Starts the loop. `probe` receives the attempt number (0 for the
    /// immediate check) and returns true once the awaited condition holds;
    /// `finish` is called exactly once with the outcome.
    pub fn run(
        self,
        scheduler: Rc<dyn Scheduler>,
        probe: impl FnMut(u32) -> bool + 'static,
        finish: impl FnOnce(RetryOutcome) + 'static,
    ) {
        RetryRun {
            retry: self,
            scheduler,
            probe: Box::new(probe),
            finish: Box::new(finish),
        }
        .step(0);
    }

    /// Future flavour of [`Retry::run`].
    pub fn wait(
        self,
        scheduler: Rc<dyn Scheduler>,
        probe: impl FnMut(u32) -> bool + 'static,
    ) -> impl Future<Output = RetryOutcome> {
        let (tx, rx) = oneshot::channel();
        self.run(scheduler, probe, move |outcome| {
            let _ = tx.send(outcome);
        });
        async move { rx.await.unwrap_or(RetryOutcome::Cancelled) }
    }
}

struct RetryRun {
    retry: Retry,
    scheduler: Rc<dyn Scheduler>,
    probe: Box<dyn FnMut(u32) -> bool>,
    finish: Box<dyn FnOnce(RetryOutcome)>,
}

impl RetryRun {
    fn step(mut self, attempt: u32) {
        let alive = self.retry.alive.as_ref().map_or(true, |alive| alive());
        if !alive {
            return (self.finish)(RetryOutcome::Cancelled);
        }
        if (self.probe)(attempt) {
            return (self.finish)(RetryOutcome::Done);
        }
        if let RetryLimit::Bounded(max) = self.retry.limit {
            if attempt >= max {
                return (self.finish)(RetryOutcome::Exhausted);
            }
        }

        let scheduler = Rc::clone(&self.scheduler);
        let interval = self.retry.interval;
        scheduler.set_timeout(interval, Box::new(move || self.step(attempt + 1)));
    }
}

struct ScheduledTask {
    due: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

/// Scheduler driven by hand: nothing runs until the clock is advanced.
///
/// Used for headless runs and deterministic tests.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    seq: Cell<u64>,
    timers: RefCell<Vec<ScheduledTask>>,
    frames: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl ManualScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Timers not yet fired
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Animation-frame callbacks not yet fired
    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Moves the clock forward, firing due timers in deadline order
    /// (including timers scheduled by timers that fall inside the window).
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        while let Some(task) = self.pop_due(target) {
            self.now.set(task.due.max(self.now.get()));
            (task.task)();
        }
        self.now.set(target);
    }

    /// Fires timers until none are left. Returns the number fired.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(task) = self.pop_due(Duration::MAX) {
            self.now.set(task.due.max(self.now.get()));
            (task.task)();
            fired += 1;
        }
        fired
    }

    /// Runs the callbacks queued for the next frame. Callbacks queued while
    /// flushing wait for the following frame.
    pub fn flush_frame(&self) -> usize {
        let frames: Vec<_> = self.frames.borrow_mut().drain(..).collect();
        let count = frames.len();
        for frame in frames {
            frame();
        }
        count
    }

    fn pop_due(&self, limit: Duration) -> Option<ScheduledTask> {
        let mut timers = self.timers.borrow_mut();
        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= limit)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(timers.swap_remove(index))
    }
}

impl Scheduler for ManualScheduler {
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.timers.borrow_mut().push(ScheduledTask {
            due: self.now.get() + delay,
            seq,
            task,
        });
    }

    fn request_animation_frame(&self, task: Box<dyn FnOnce()>) {
        self.frames.borrow_mut().push(task);
    }
}

/// Default spawner implementations
#[cfg(feature = "tokio-runtime")]
pub mod tokio_impl {
    use super::*;

    /// Tokio-backed scheduler. Tasks are `!Send`, so they are spawned on the
    /// current `LocalSet`; calling outside one panics inside tokio.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct TokioScheduler;

    impl Scheduler for TokioScheduler {
        fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) {
            ::tokio::task::spawn_local(async move {
                ::tokio::time::sleep(delay).await;
                task();
            });
        }
    }
}

#[cfg(feature = "tokio-runtime")]
pub use tokio_impl::TokioScheduler;
