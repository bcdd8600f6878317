//! Async component factories.
//!
//! A factory may already be resolved, report through a callback, return a
//! future, or return `{ component: future }`. The first successful resolution
//! is cached and shared by every clone of the factory.

use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

use crate::component::ComponentDef;
use crate::errors::RenderError;
use crate::vnode::VNodeRef;

/// What an async factory resolved to
#[derive(Debug, Clone)]
pub enum AsyncResolution {
    Component(Arc<ComponentDef>),
    Node(VNodeRef),
    Nodes(Vec<VNodeRef>),
}

/// Completion callback handed to callback-style factories
pub type ResolveCallback = Box<dyn FnOnce(Result<AsyncResolution, String>) + Send>;

/// Result of an advanced factory: the component arrives through a future
pub struct AdvancedAsync {
    pub component: BoxFuture<'static, Result<Arc<ComponentDef>, String>>,
}

enum FactorySource {
    Resolved,
    Callback(Arc<dyn Fn(ResolveCallback) + Send + Sync>),
    Future(Arc<dyn Fn() -> BoxFuture<'static, Result<AsyncResolution, String>> + Send + Sync>),
    Advanced(Arc<dyn Fn() -> AdvancedAsync + Send + Sync>),
}

/// An async component factory
#[derive(Clone)]
pub struct AsyncFactory {
    source: Arc<FactorySource>,
    cache: Arc<Mutex<Option<AsyncResolution>>>,
}

impl fmt::Debug for AsyncFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match &*self.source {
            FactorySource::Resolved => "resolved",
            FactorySource::Callback(_) => "callback",
            FactorySource::Future(_) => "future",
            FactorySource::Advanced(_) => "advanced",
        };
        f.debug_struct("AsyncFactory")
            .field("style", &style)
            .field("resolved", &self.cache.lock().is_some())
            .finish()
    }
}

impl AsyncFactory {
    fn from_source(source: FactorySource, cache: Option<AsyncResolution>) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// A factory that is resolved from the start.
    pub fn resolved(resolution: AsyncResolution) -> Self {
        Self::from_source(FactorySource::Resolved, Some(resolution))
    }

    /// A factory that reports its result through a callback.
    pub fn callback<F>(factory: F) -> Self
    where
        F: Fn(ResolveCallback) + Send + Sync + 'static,
    {
        Self::from_source(FactorySource::Callback(Arc::new(factory)), None)
    }

    /// A factory returning a future.
    pub fn future<F>(factory: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<AsyncResolution, String>> + Send + Sync + 'static,
    {
        Self::from_source(FactorySource::Future(Arc::new(factory)), None)
    }

    /// A factory returning `{ component: future }`.
    pub fn advanced<F>(factory: F) -> Self
    where
        F: Fn() -> AdvancedAsync + Send + Sync + 'static,
    {
        Self::from_source(FactorySource::Advanced(Arc::new(factory)), None)
    }

    /// The cached resolution, if the factory has already resolved.
    pub fn resolution(&self) -> Option<AsyncResolution> {
        self.cache.lock().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.cache.lock().is_some()
    }

    /// Resolve the factory, using the cached value when present.
    pub fn resolve(&self) -> BoxFuture<'static, Result<AsyncResolution, RenderError>> {
        if let Some(resolution) = self.resolution() {
            return futures::future::ready(Ok(resolution)).boxed();
        }
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        async move {
            let resolution = match &*source {
                FactorySource::Resolved => {
                    return cache.lock().clone().ok_or(RenderError::AsyncCancelled);
                }
                FactorySource::Callback(factory) => {
                    let (tx, rx) = oneshot::channel();
                    factory(Box::new(move |result| {
                        // The receiver is gone only when the render was abandoned.
                        let _ = tx.send(result);
                    }));
                    rx.await.map_err(|_| RenderError::AsyncCancelled)?
                }
                FactorySource::Future(factory) => factory().await,
                FactorySource::Advanced(factory) => {
                    factory().component.await.map(AsyncResolution::Component)
                }
            }
            .map_err(RenderError::AsyncRejected)?;

            tracing::trace!("async factory resolved");
            *cache.lock() = Some(resolution.clone());
            Ok(resolution)
        }
        .boxed()
    }
}
