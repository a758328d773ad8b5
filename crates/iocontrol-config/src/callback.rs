use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::change::ConfigChange;

/// A registered config-change listener: either synchronous (dispatched on
/// a blocking-pool worker) or cooperative (awaited in registration
/// order). Grounded on `original_source/src/iocontrol/core/manager.py`'s
/// `_notify_changes`, which branches on `asyncio.iscoroutinefunction`;
/// the config manager's own callbacks follow the same pattern (spec
/// §4.8 / §4.11).
#[derive(Clone)]
pub(crate) enum ChangeCallback {
    Sync(Arc<dyn Fn(Vec<ConfigChange>) + Send + Sync>),
    Async(Arc<dyn Fn(Vec<ConfigChange>) -> BoxFuture<'static, ()> + Send + Sync>),
}

impl ChangeCallback {
    pub(crate) fn sync<F>(callback: F) -> Self
    where
        F: Fn(&[ConfigChange]) + Send + Sync + 'static,
    {
        ChangeCallback::Sync(Arc::new(move |changes: Vec<ConfigChange>| callback(&changes)))
    }

    pub(crate) fn cooperative<F, Fut>(callback: F) -> Self
    where
        F: Fn(Vec<ConfigChange>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        ChangeCallback::Async(Arc::new(move |changes| Box::pin(callback(changes))))
    }
}
