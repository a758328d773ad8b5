use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use iocontrol_types::StateChange;

/// A registered change-bus listener: either synchronous (dispatched on a
/// blocking-pool worker, outside the scheduler's critical path) or
/// cooperative (awaited in registration order), per spec §4.8 / Design
/// Note 9 ("Runtime callback variants"). Grounded on
/// `original_source/src/iocontrol/core/manager.py`'s `_notify_changes`,
/// which branches on `asyncio.iscoroutinefunction(callback)`.
#[derive(Clone)]
pub(crate) enum ChangeCallback {
    Sync(Arc<dyn Fn(Vec<StateChange>) + Send + Sync>),
    Async(Arc<dyn Fn(Vec<StateChange>) -> BoxFuture<'static, ()> + Send + Sync>),
}

impl ChangeCallback {
    pub(crate) fn sync<F>(callback: F) -> Self
    where
        F: Fn(&[StateChange]) + Send + Sync + 'static,
    {
        ChangeCallback::Sync(Arc::new(move |changes: Vec<StateChange>| callback(&changes)))
    }

    pub(crate) fn cooperative<F, Fut>(callback: F) -> Self
    where
        F: Fn(Vec<StateChange>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        ChangeCallback::Async(Arc::new(move |changes| Box::pin(callback(changes))))
    }
}
