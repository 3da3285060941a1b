use crate::error::DbError;
use crate::udbc::result::ExecResult;
use crate::udbc::value::{Row, Value};
use async_trait::async_trait;

/// A single live handle to the data store.
///
/// Calls may block for an unbounded time and offer no cancellation; the pool
/// only ever stops waiting for them.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError>;

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError>;

    async fn close(&self) -> Result<(), DbError>;
}
