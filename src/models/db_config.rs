use crate::error::DbError;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Sizing and timing of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// Number of live connections, fixed for the pool's lifetime.
    pub workers: usize,
    /// Capacity of the dispatch queue; `None` disables queuing.
    pub queue: Option<usize>,
    /// Per-call timeout, counted from the moment a worker is checked out.
    pub timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            queue: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PoolOptions {
    pub fn new(workers: usize) -> Self {
        PoolOptions {
            workers,
            ..Default::default()
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn queue(mut self, capacity: usize) -> Self {
        self.queue = Some(capacity);
        self
    }

    pub fn unqueued(mut self) -> Self {
        self.queue = None;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Rejects non-positive sizes instead of clamping them.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.workers == 0 {
            return Err(DbError::Config("worker count must be positive".into()));
        }
        if self.queue == Some(0) {
            return Err(DbError::Config("queue capacity must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(DbError::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(PoolOptions::new(2).queue(8).validate().is_ok());
        assert!(PoolOptions::new(2).validate().is_ok());
        assert!(matches!(
            PoolOptions::new(0).validate(),
            Err(DbError::Config(_))
        ));
        assert!(matches!(
            PoolOptions::new(2).queue(0).validate(),
            Err(DbError::Config(_))
        ));
        assert!(matches!(
            PoolOptions::new(2).timeout(Duration::ZERO).validate(),
            Err(DbError::Config(_))
        ));
    }
}
