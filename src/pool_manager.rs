use std::sync::LazyLock;

use dashmap::DashMap;
use tracing::warn;

use crate::error::DbError;
use crate::executor::session::Session;
use crate::pool::Pool;
use crate::udbc::DEFAULT_POOL_NAME;

/// Process-wide registry.
pub static DB: LazyLock<PoolManager> = LazyLock::new(PoolManager::new);

/// Keeps named pools reachable from anywhere in the process.
pub struct PoolManager {
    pools: DashMap<String, Pool>,
}

/// Returns the process-wide [`PoolManager`].
pub fn pool_mgr() -> &'static PoolManager {
    &DB
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolManager {
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
        }
    }

    /// Registers `pool` under `name`. A pool already registered under that
    /// name is returned, and closing it is up to the caller.
    pub fn register(&self, name: &str, pool: Pool) -> Option<Pool> {
        self.pools.insert(name.to_string(), pool)
    }

    pub fn pool(&self, name: &str) -> Option<Pool> {
        self.pools.get(name).map(|v| v.value().clone())
    }

    /// Session on the named pool, using its configured timeout.
    pub fn session(&self, name: &str) -> Option<Session> {
        self.pool(name).map(|p| p.session())
    }

    /// The pool registered as `default`.
    pub fn default_pool(&self) -> Option<Pool> {
        self.pool(DEFAULT_POOL_NAME)
    }

    pub fn remove(&self, name: &str) -> Option<Pool> {
        self.pools.remove(name).map(|(_, p)| p)
    }

    /// Removes and closes every pool, returning the first close error.
    pub async fn close_all(&self) -> Result<(), DbError> {
        let names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        let mut first_err = None;
        for name in names {
            if let Some(pool) = self.remove(&name) {
                if let Err(e) = pool.close().await {
                    warn!(pool = %name, error = %e, "close pool");
                    first_err.get_or_insert(e);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
