use crate::error::DbError;
use crate::pool::Pool;
use crate::udbc::connection::Connection;
use crate::udbc::deserializer::{from_row, from_rows};
use crate::udbc::result::ExecResult;
use crate::udbc::value::{Row, Value};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Issues calls against a [`Pool`] with a fixed per-call timeout.
#[derive(Clone)]
pub struct Session {
    pool: Pool,
    timeout: Duration,
}

impl Session {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    /// Multi-row read.
    pub async fn select<R>(&self, sql: &str, args: &[Value]) -> Result<Vec<R>, DbError>
    where
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let rows = self.query(sql, args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &rows {
            Ok(rows) => debug!(sql, elapsed_ms, rows = rows.len(), "select"),
            Err(e) => debug!(sql, elapsed_ms, error = %e, "select"),
        }
        from_rows(&rows?)
    }

    /// Single-row read; the first row wins.
    pub async fn get<R>(&self, sql: &str, args: &[Value]) -> Result<R, DbError>
    where
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let rows = self.query(sql, args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &rows {
            Ok(rows) => debug!(sql, elapsed_ms, rows = rows.len(), "get"),
            Err(e) => debug!(sql, elapsed_ms, error = %e, "get"),
        }
        let rows = rows?;
        let row = rows.first().ok_or(DbError::RowNotFound)?;
        from_row(row)
    }

    /// Write operation. A timeout is reported as [`ExecResult::TimedOut`],
    /// driver failures as `Err`.
    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        check_sql(sql)?;
        let (owned_sql, owned_args) = (sql.to_owned(), args.to_vec());
        let start = Instant::now();
        let result = self
            .pool
            .call(self.timeout, move |conn| async move {
                conn.execute(&owned_sql, &owned_args).await
            })
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let affected = result.as_ref().ok().and_then(|r| r.rows_affected().ok());
        let err = result.as_ref().err().map(|e| e.to_string());
        debug!(sql, elapsed_ms, ?affected, ?err, "exec");
        match result {
            Err(DbError::Timeout) => Ok(ExecResult::TimedOut),
            other => other,
        }
    }

    /// Like [`exec`](Self::exec) but never fails the call: every error is
    /// folded into the returned [`ExecResult`].
    pub async fn must_exec(&self, sql: &str, args: &[Value]) -> ExecResult {
        self.exec(sql, args).await.into()
    }

    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, DbError>
    where
        F: FnOnce(Arc<dyn Connection>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, DbError>> + Send + 'static,
        T: Send + 'static,
    {
        let start = Instant::now();
        let result = self.pool.call(self.timeout, op).await;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "run"
        );
        result
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError> {
        check_sql(sql)?;
        let (sql, args) = (sql.to_owned(), args.to_vec());
        self.pool
            .call(self.timeout, move |conn| async move {
                conn.query(&sql, &args).await
            })
            .await
    }
}

fn check_sql(sql: &str) -> Result<(), DbError> {
    if sql.trim().is_empty() {
        return Err(DbError::InvalidArgument("empty SQL statement".into()));
    }
    Ok(())
}
