#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use upool::error::DbError;
use upool::udbc::connection::Connection;
use upool::udbc::driver::Driver;
use upool::{ExecResult, Row, Value};

/// Counters shared by every connection a [`MockDriver`] hands out.
#[derive(Default)]
pub struct Stats {
    pub opened: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub completed: AtomicUsize,
    closes: Mutex<HashMap<usize, usize>>,
}

impl Stats {
    pub fn closes(&self) -> HashMap<usize, usize> {
        self.closes.lock().unwrap().clone()
    }

    pub fn total_closes(&self) -> usize {
        self.closes.lock().unwrap().values().sum()
    }
}

/// In-memory connection.
///
/// Statements are interpreted as follows: `args[0]` is a delay in
/// milliseconds, `args[1]` a tag echoed back. SQL `FAIL` returns a query
/// error, SQL `PANIC` panics.
pub struct MockConnection {
    id: usize,
    stats: Arc<Stats>,
    close_delay: Duration,
}

impl MockConnection {
    pub fn new(id: usize, stats: Arc<Stats>) -> Self {
        Self {
            id,
            stats,
            close_delay: Duration::ZERO,
        }
    }

    async fn work(&self, sql: &str, args: &[Value]) -> Result<String, DbError> {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(Value::I64(ms)) = args.first() {
            tokio::time::sleep(Duration::from_millis(*ms as u64)).await;
        }
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.completed.fetch_add(1, Ordering::SeqCst);

        match sql {
            "FAIL" => Err(DbError::Query("syntax error".into())),
            "PANIC" => panic!("driver blew up"),
            _ => Ok(match args.get(1) {
                Some(Value::Str(tag)) => tag.clone(),
                _ => String::new(),
            }),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>, DbError> {
        let tag = self.work(sql, args).await?;
        let row: Row = [
            ("conn".to_string(), Value::I64(self.id as i64)),
            ("tag".to_string(), Value::Str(tag)),
        ]
        .into_iter()
        .collect();
        Ok(vec![row.clone(), row])
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult, DbError> {
        self.work(sql, args).await?;
        Ok(ExecResult::new(1, self.id as u64))
    }

    async fn close(&self) -> Result<(), DbError> {
        tokio::time::sleep(self.close_delay).await;
        *self.stats.closes.lock().unwrap().entry(self.id).or_insert(0) += 1;
        Ok(())
    }
}

/// Hands out [`MockConnection`]s; the `fail_at`-th call (1-based) fails.
pub struct MockDriver {
    pub stats: Arc<Stats>,
    fail_at: Option<usize>,
    close_delay: Duration,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Stats::default()),
            fail_at: None,
            close_delay: Duration::ZERO,
        }
    }

    pub fn failing_at(k: usize) -> Self {
        Self {
            stats: Arc::new(Stats::default()),
            fail_at: Some(k),
            close_delay: Duration::ZERO,
        }
    }

    /// Every connection takes `delay` to close.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<Arc<dyn Connection>, DbError> {
        let n = self.stats.opened.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(n) {
            self.stats.opened.fetch_sub(1, Ordering::SeqCst);
            return Err(DbError::Connection(format!("refused connection #{}", n)));
        }
        Ok(Arc::new(MockConnection {
            id: n - 1,
            stats: self.stats.clone(),
            close_delay: self.close_delay,
        }))
    }
}

pub fn slow(ms: i64, tag: &str) -> Vec<Value> {
    upool::args![ms, tag]
}
