use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use maplet_petal::prelude::*;
use maplet_petal::sdk::memory::{MemoryScriptHost, MemorySdk};
use maplet_petal::sdk::{LoaderResult, LoaderStatus, SdkHandle};
use std::cell::RefCell;

type Slot = Rc<RefCell<Option<LoaderResult<SdkHandle>>>>;

fn spawn_loads(pool: &LocalPool, loader: &SdkLoader, count: usize) -> Vec<Slot> {
    (0..count)
        .map(|_| {
            let slot: Slot = Rc::new(RefCell::new(None));
            let out = Rc::clone(&slot);
            let load = loader.load();
            pool.spawner()
                .spawn_local(async move {
                    *out.borrow_mut() = Some(load.await);
                })
                .unwrap();
            slot
        })
        .collect()
}

fn same_handle(a: &SdkHandle, b: &SdkHandle) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

#[test]
fn test_concurrent_loads_share_one_script() {
    let host = MemoryScriptHost::new();
    let scheduler = ManualScheduler::new();
    let loader = SdkLoader::new(host.clone(), scheduler.clone());
    let mut pool = LocalPool::new();

    let slots = spawn_loads(&pool, &loader, 3);
    pool.run_until_stalled();
    assert_eq!(host.injected_urls().len(), 1);
    assert_eq!(loader.pending(), 3);

    host.publish(MemorySdk::new().shared());
    host.complete_load();
    pool.run_until_stalled();

    let handles: Vec<SdkHandle> = slots
        .iter()
        .map(|slot| slot.borrow_mut().take().unwrap().unwrap())
        .collect();
    assert!(handles.windows(2).all(|pair| same_handle(&pair[0], &pair[1])));
    assert_eq!(loader.status(), LoaderStatus::Loaded);
    assert_eq!(host.script_count(), 1);
}

#[test]
fn test_exhausted_poll_rejects_everyone_and_sticks() {
    let host = MemoryScriptHost::new();
    let scheduler = ManualScheduler::new();
    let loader = SdkLoader::new(host.clone(), scheduler.clone());
    let mut pool = LocalPool::new();

    let slots = spawn_loads(&pool, &loader, 2);
    pool.run_until_stalled();
    // script loads but never defines the constructor
    host.complete_load();
    scheduler.run_until_idle();
    pool.run_until_stalled();

    for slot in &slots {
        let result = slot.borrow_mut().take().unwrap();
        assert_eq!(result.err(), Some(LoaderError::ConstructorMissing));
    }
    assert_eq!(loader.status(), LoaderStatus::Failed);

    let later = futures::executor::block_on(loader.load());
    assert_eq!(later.err(), Some(LoaderError::PreviouslyFailed));
    assert_eq!(host.injected_urls().len(), 1);
}

#[test]
fn test_reset_after_failure_allows_a_fresh_load() {
    let host = MemoryScriptHost::new();
    let scheduler = ManualScheduler::new();
    let loader = SdkLoader::new(host.clone(), scheduler.clone());
    let mut pool = LocalPool::new();

    let _failed = spawn_loads(&pool, &loader, 1);
    pool.run_until_stalled();
    host.fail_load(Some("offline"));
    pool.run_until_stalled();
    assert_eq!(loader.status(), LoaderStatus::Failed);

    loader.reset();
    assert_eq!(loader.status(), LoaderStatus::NotLoaded);
    let retry = spawn_loads(&pool, &loader, 1);
    pool.run_until_stalled();
    assert_eq!(host.injected_urls().len(), 2);

    host.publish(MemorySdk::new().shared());
    host.complete_load();
    pool.run_until_stalled();
    assert!(retry[0].borrow().as_ref().map_or(false, |r| r.is_ok()));
}
