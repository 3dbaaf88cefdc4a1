use crate::models::DispatchRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;

/// Caller-supplied work executed for a routed request
///
/// Errors, panics and timeouts are all caught by the router and dead-lettered.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handler name for logging
    fn name(&self) -> &str;

    async fn handle(&self, request: &DispatchRequest) -> anyhow::Result<Value>;
}

/// Adapts an async closure into an [`EventHandler`]
pub struct FnHandler<F, Fut> {
    name: String,
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnHandler<F, Fut>
where
    F: Fn(DispatchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F, Fut>
where
    F: Fn(DispatchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, request: &DispatchRequest) -> anyhow::Result<Value> {
        (self.f)(request.clone()).await
    }
}
