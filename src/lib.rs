pub mod error;
pub mod executor;
pub mod models;
pub mod pool;
pub mod pool_manager;
pub mod udbc;
#[cfg(feature = "mysql")]
pub mod udbc_mysql;

pub use error::DbError;
pub use models::db_config::PoolOptions;
pub use pool::{Pool, PoolStatus};
pub use udbc::result::ExecResult;
pub use udbc::value::{Row, Value};
