//! One-shot loader for the Petal Maps JS SDK.
//!
//! The script is injected at most once per loader no matter how many callers
//! ask for it. Every caller waits on the same outcome. Script `onload` does not
//! mean the SDK is usable yet, so the loader keeps checking for the `HWMap`
//! constructor for a bounded number of ticks before giving up.

use crate::core::constants::{
    SDK_MAP_CONSTRUCTOR, SDK_READY_INTERVAL, SDK_READY_MAX_ATTEMPTS, SDK_SCRIPT_PATTERN,
    SDK_SCRIPT_URL,
};
use crate::runtime::{Retry, RetryOutcome, Scheduler};
use crate::sdk::value::NativeObject;
use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Handle to the SDK namespace object (`window.HWMapJsSDK`).
pub type SdkHandle = Rc<dyn NativeObject>;

pub type LoaderResult<T> = std::result::Result<T, LoaderError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("{0}")]
    ScriptFailed(String),

    #[error(
        "Petal Maps SDK script loaded but HWMap constructor is missing. \
         Please ensure the SDK URL is correct and the API has not changed."
    )]
    ConstructorMissing,

    #[error("Petal Maps SDK failed to load previously.")]
    PreviouslyFailed,

    #[error("could not inject Petal Maps SDK script: {0}")]
    Injection(String),

    #[error("Petal Maps SDK loader was dropped before the load settled")]
    Dropped,
}

const SCRIPT_FAILED_MESSAGE: &str =
    "Failed to load Petal Maps SDK script. Please check network connectivity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderStatus {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    pub url: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            url: SDK_SCRIPT_URL.to_string(),
        }
    }
}

/// The document the SDK script lives in.
pub trait ScriptHost {
    /// Current value of the SDK global, if any.
    fn sdk_global(&self) -> Option<SdkHandle>;

    /// Appends an async script tag. Exactly one of the callbacks fires later.
    fn inject_script(
        &self,
        url: &str,
        on_load: Box<dyn FnOnce()>,
        on_error: Box<dyn FnOnce(Option<String>)>,
    ) -> std::result::Result<(), String>;

    /// Removes every script tag whose `src` contains `pattern`.
    fn remove_scripts(&self, pattern: &str) -> usize;

    fn delete_sdk_global(&self);
}

/// What the map service needs from a loader.
#[async_trait(?Send)]
pub trait SdkSource {
    async fn load(&self) -> LoaderResult<SdkHandle>;

    /// The SDK if it is already usable, without loading anything.
    fn current(&self) -> Option<SdkHandle>;

    fn reset(&self);
}

// `None` parks the caller: its future stays pending for good.
type Waiter = oneshot::Sender<Option<LoaderResult<SdkHandle>>>;

#[derive(Default)]
struct LoaderState {
    status: LoaderStatus,
    pending: Vec<Waiter>,
    generation: u64,
}

struct LoaderInner {
    host: Rc<dyn ScriptHost>,
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<LoaderState>,
}

#[derive(Clone)]
pub struct SdkLoader {
    inner: Rc<LoaderInner>,
}

thread_local! {
    static GLOBAL_LOADER: RefCell<Option<SdkLoader>> = RefCell::new(None);
}

/// The SDK global counts as ready once it exposes the map constructor.
fn ready_sdk(host: &dyn ScriptHost) -> Option<SdkHandle> {
    host.sdk_global()
        .filter(|sdk| sdk.has_method(SDK_MAP_CONSTRUCTOR))
}

impl SdkLoader {
    pub fn new(host: Rc<dyn ScriptHost>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(LoaderInner {
                host,
                scheduler,
                state: RefCell::new(LoaderState::default()),
            }),
        }
    }

    /// Installs the process-wide loader, returning the previous one.
    pub fn install_global(loader: SdkLoader) -> Option<SdkLoader> {
        GLOBAL_LOADER.with(|global| global.borrow_mut().replace(loader))
    }

    pub fn global() -> Option<SdkLoader> {
        GLOBAL_LOADER.with(|global| global.borrow().clone())
    }

    pub fn status(&self) -> LoaderStatus {
        self.inner.state.borrow().status
    }

    /// Number of callers waiting on the in-flight load.
    pub fn pending(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    pub fn load(&self) -> LocalBoxFuture<'static, LoaderResult<SdkHandle>> {
        self.load_with(&LoaderOptions::default())
    }

    pub fn load_with(&self, options: &LoaderOptions) -> LocalBoxFuture<'static, LoaderResult<SdkHandle>> {
        if let Some(sdk) = ready_sdk(self.inner.host.as_ref()) {
            self.inner.state.borrow_mut().status = LoaderStatus::Loaded;
            return future::ready(Ok(sdk)).boxed_local();
        }

        let (tx, rx) = oneshot::channel();
        let waiting = async move {
            match rx.await {
                Ok(Some(result)) => result,
                Ok(None) => future::pending::<LoaderResult<SdkHandle>>().await,
                Err(_) => Err(LoaderError::Dropped),
            }
        }
        .boxed_local();
        {
            let mut state = self.inner.state.borrow_mut();
            match state.status {
                LoaderStatus::Failed => {
                    return future::ready(Err(LoaderError::PreviouslyFailed)).boxed_local();
                }
                LoaderStatus::Loading => {
                    state.pending.push(tx);
                    return waiting;
                }
                LoaderStatus::NotLoaded | LoaderStatus::Loaded => {
                    state.pending.push(tx);
                    state.status = LoaderStatus::Loading;
                }
            }
        }

        self.inject(&options.url);
        waiting
    }

    /// Scrubs the injected script and the SDK global and starts over.
    /// Callers still waiting are abandoned, never settled.
    pub fn reset(&self) {
        let removed = self.inner.host.remove_scripts(SDK_SCRIPT_PATTERN);
        self.inner.host.delete_sdk_global();

        let orphaned = {
            let mut state = self.inner.state.borrow_mut();
            state.status = LoaderStatus::NotLoaded;
            state.generation += 1;
            log::debug!(
                "Petal Maps SDK loader reset (removed {removed} script tags, generation {})",
                state.generation
            );
            std::mem::take(&mut state.pending)
        };
        for waiter in orphaned {
            let _ = waiter.send(None);
        }
    }

    fn inject(&self, url: &str) {
        let generation = self.inner.state.borrow().generation;

        let weak = Rc::downgrade(&self.inner);
        let on_load = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                SdkLoader { inner }.wait_for_ready(generation);
            }
        });

        let weak = Rc::downgrade(&self.inner);
        let on_error = Box::new(move |message: Option<String>| {
            if let Some(inner) = weak.upgrade() {
                let message = message.unwrap_or_else(|| SCRIPT_FAILED_MESSAGE.to_string());
                SdkLoader { inner }.fail(generation, LoaderError::ScriptFailed(message));
            }
        });

        log::debug!("injecting Petal Maps SDK script {url}");
        if let Err(message) = self.inner.host.inject_script(url, on_load, on_error) {
            self.fail(generation, LoaderError::Injection(message));
        }
    }

    fn wait_for_ready(&self, generation: u64) {
        let host = Rc::clone(&self.inner.host);
        let alive: Weak<LoaderInner> = Rc::downgrade(&self.inner);
        let owner = alive.clone();

        Retry::bounded(SDK_READY_INTERVAL, SDK_READY_MAX_ATTEMPTS)
            .while_alive(move || {
                alive
                    .upgrade()
                    .map_or(false, |inner| inner.state.borrow().generation == generation)
            })
            .run(
                Rc::clone(&self.inner.scheduler),
                move |_| ready_sdk(host.as_ref()).is_some(),
                move |outcome| {
                    let Some(inner) = owner.upgrade() else {
                        return;
                    };
                    let loader = SdkLoader { inner };
                    match outcome {
                        RetryOutcome::Done => loader.succeed(generation),
                        RetryOutcome::Exhausted => {
                            loader.fail(generation, LoaderError::ConstructorMissing)
                        }
                        RetryOutcome::Cancelled => {
                            log::debug!("SDK readiness check abandoned after reset")
                        }
                    }
                },
            );
    }

    fn succeed(&self, generation: u64) {
        let Some(sdk) = ready_sdk(self.inner.host.as_ref()) else {
            return self.fail(generation, LoaderError::ConstructorMissing);
        };

        let waiters = {
            let mut state = self.inner.state.borrow_mut();
            if state.generation != generation {
                return;
            }
            state.status = LoaderStatus::Loaded;
            std::mem::take(&mut state.pending)
        };

        log::info!("Petal Maps SDK ready ({} waiting callers)", waiters.len());
        for waiter in waiters {
            let _ = waiter.send(Some(Ok(Rc::clone(&sdk))));
        }
    }

    fn fail(&self, generation: u64, error: LoaderError) {
        let waiters = {
            let mut state = self.inner.state.borrow_mut();
            if state.generation != generation {
                return;
            }
            state.status = LoaderStatus::Failed;
            std::mem::take(&mut state.pending)
        };

        log::error!("{error}");
        for waiter in waiters {
            let _ = waiter.send(Some(Err(error.clone())));
        }
    }
}

#[async_trait(?Send)]
impl SdkSource for SdkLoader {
    async fn load(&self) -> LoaderResult<SdkHandle> {
        self.load_with(&LoaderOptions::default()).await
    }

    fn current(&self) -> Option<SdkHandle> {
        ready_sdk(self.inner.host.as_ref())
    }

    fn reset(&self) {
        SdkLoader::reset(self)
    }
}
