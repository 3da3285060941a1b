mod dispatch;
mod free_list;
mod worker;

pub use dispatch::{DispatchQueue, Task};

use crate::error::DbError;
use crate::executor::session::Session;
use crate::models::db_config::PoolOptions;
use crate::udbc::connection::Connection;
use crate::udbc::driver::Driver;
use crate::udbc::result::ExecResult;
use crate::udbc::value::Value;
use free_list::FreeList;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use worker::Worker;

/// Snapshot of a pool's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub workers: usize,
    pub idle: usize,
    pub queued: usize,
    pub closed: bool,
}

/// A fixed set of connections shared by any number of callers.
///
/// At most `workers` operations touch the store at once; every call gives up
/// waiting after its timeout while the abandoned operation keeps its worker
/// until it actually finishes. Cloning is cheap and shares the same pool.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    driver: Arc<dyn Driver>,
    options: PoolOptions,
    free: FreeList,
    queue: Option<DispatchQueue>,
    closed: AtomicBool,
}

impl Pool {
    /// Opens `workers` connections behind a dispatch queue holding up to
    /// `queue` pending calls, with the default timeout.
    pub async fn open(
        driver: impl Driver + 'static,
        workers: usize,
        queue: usize,
    ) -> Result<Self, DbError> {
        Self::with_options(driver, PoolOptions::new(workers).queue(queue)).await
    }

    pub async fn with_options(
        driver: impl Driver + 'static,
        options: PoolOptions,
    ) -> Result<Self, DbError> {
        Self::from_driver(Arc::new(driver), options).await
    }

    /// Eagerly connects every worker; if any connection fails, the ones
    /// already opened are closed before the error is returned.
    pub async fn from_driver(
        driver: Arc<dyn Driver>,
        options: PoolOptions,
    ) -> Result<Self, DbError> {
        options.validate()?;

        let start = Instant::now();
        let mut workers = Vec::with_capacity(options.workers);
        for id in 0..options.workers {
            match driver.connect().await {
                Ok(conn) => workers.push(Worker::new(id, conn)),
                Err(e) => {
                    for worker in &workers {
                        if let Err(close_err) = worker.close().await {
                            warn!(driver = driver.name(), worker = worker.id(), error = %close_err, "close after failed open");
                        }
                    }
                    debug!(driver = driver.name(), opened = workers.len(), error = %e, "open failed");
                    return Err(e);
                }
            }
        }

        let queue = match options.queue {
            Some(capacity) => Some(DispatchQueue::start(options.workers, capacity)?),
            None => None,
        };
        debug!(
            driver = driver.name(),
            workers = options.workers,
            queue = ?options.queue,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pool opened"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                driver,
                free: FreeList::new(workers),
                queue,
                closed: AtomicBool::new(false),
                options,
            }),
        })
    }

    pub fn options(&self) -> &PoolOptions {
        &self.inner.options
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            workers: self.inner.options.workers,
            idle: self.inner.free.idle(),
            queued: self.inner.queue.as_ref().map_or(0, DispatchQueue::len),
            closed: self.inner.closed.load(Ordering::Acquire),
        }
    }

    /// Call surface using the pool's configured timeout.
    pub fn session(&self) -> Session {
        Session::new(self.clone(), self.inner.options.timeout)
    }

    /// Call surface with a per-call timeout override.
    pub fn with_timeout(&self, timeout: Duration) -> Session {
        Session::new(self.clone(), timeout)
    }

    pub async fn select<R>(&self, sql: &str, args: &[Value]) -> Result<Vec<R>, DbError>
    where
        R: DeserializeOwned,
    {
        self.session().select(sql, args).await
    }

    pub async fn get<R>(&self, sql: &str, args: &[Value]) -> Result<R, DbError>
    where
        R: DeserializeOwned,
    {
        self.session().get(sql, args).await
    }

    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        self.session().exec(sql, args).await
    }

    pub async fn must_exec(&self, sql: &str, args: &[Value]) -> ExecResult {
        self.session().must_exec(sql, args).await
    }

    /// Runs an arbitrary operation against a worker's connection, for
    /// anything the pool does not wrap itself.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, DbError>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DbError>> + Send + 'static,
        T: Send + 'static,
    {
        self.session().run(op).await
    }

    /// Stops the dispatch queue, waits for every worker to come back and
    /// closes each connection once. Later calls fail with
    /// [`DbError::PoolClosed`]. Concurrent or repeated closes all return
    /// once every connection is closed, with the same first error.
    ///
    /// An operation that never finishes keeps its worker forever, and so
    /// does this call.
    pub async fn close(&self) -> Result<(), DbError> {
        let inner = &self.inner;
        inner.closed.store(true, Ordering::Release);
        let start = Instant::now();

        if let Some(queue) = &inner.queue {
            queue.stop().await;
        }

        let closed = inner.free.close_all(inner.driver.name()).await;
        if closed.count > 0 {
            debug!(
                driver = inner.driver.name(),
                closed = closed.count,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "pool closed"
            );
        }
        closed.first_err.map_or(Ok(()), Err)
    }

    /// Routes `op` through the dispatch queue when there is one, then
    /// through the checkout protocol.
    pub(crate) async fn call<T, F, Fut>(&self, timeout: Duration, op: F) -> Result<T, DbError>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DbError>> + Send + 'static,
        T: Send + 'static,
    {
        if timeout.is_zero() {
            return Err(DbError::Config("timeout must be positive".into()));
        }
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(DbError::PoolClosed);
        }
        match &self.inner.queue {
            None => self.inner.checkout_and_run(timeout, op).await,
            Some(queue) => {
                let (tx, rx) = oneshot::channel();
                let inner = self.inner.clone();
                queue
                    .add(Box::pin(async move {
                        let _ = tx.send(inner.checkout_and_run(timeout, op).await);
                    }))
                    .await?;
                rx.await.map_err(|_| DbError::PoolClosed)?
            }
        }
    }
}

impl PoolInner {
    /// Checks out a worker and races `op` against `timeout`.
    ///
    /// The operation runs in its own task which owns the checked-out worker,
    /// so the worker goes back to the free-list only once `op` has really
    /// returned. A caller that stops waiting drops its end of the result
    /// slot; the late value is discarded and can never reach another call.
    async fn checkout_and_run<T, F, Fut>(&self, timeout: Duration, op: F) -> Result<T, DbError>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DbError>> + Send + 'static,
        T: Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(DbError::PoolClosed);
        }
        let checked_out = self.free.checkout().await?;
        let worker = checked_out.id();
        let conn = checked_out.connection();

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = op(conn).await;
            drop(checked_out);
            let _ = tx.send(result);
        });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DbError::Aborted),
            Err(_) => {
                debug!(
                    driver = self.driver.name(),
                    worker,
                    timeout_ms = timeout.as_millis() as u64,
                    "operation timed out"
                );
                Err(DbError::Timeout)
            }
        }
    }
}
