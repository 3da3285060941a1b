use crate::error::DbError;
use crate::udbc::connection::Connection;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Produces one live, configured connection per call.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<Arc<dyn Connection>, DbError>;
}

/// Adapts a plain async closure into a [`Driver`].
///
/// ```no_run
/// # use std::sync::Arc;
/// # use upool::udbc::connection::Connection;
/// # use upool::error::DbError;
/// # async fn open_one() -> Result<Arc<dyn Connection>, DbError> { unimplemented!() }
/// let driver = upool::udbc::driver::driver_fn(|| open_one());
/// ```
pub struct FnDriver<F> {
    name: String,
    f: F,
}

pub fn driver_fn<F, Fut>(f: F) -> FnDriver<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<dyn Connection>, DbError>> + Send + 'static,
{
    FnDriver {
        name: "fn".to_string(),
        f,
    }
}

impl<F> FnDriver<F> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Driver for FnDriver<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<dyn Connection>, DbError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<Arc<dyn Connection>, DbError> {
        (self.f)().await
    }
}
