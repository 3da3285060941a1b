use crate::error::DbError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// A unit of queued work; it reports its own outcome to its submitter.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Bounded task queue drained by a fixed set of dispatcher tasks.
///
/// Submission waits while the queue is full. Tasks are never timed out here;
/// each task enforces its own deadline once it holds a worker.
pub struct DispatchQueue {
    tx: mpsc::Sender<Task>,
    rx: Arc<Mutex<mpsc::Receiver<Task>>>,
    shutdown: watch::Sender<bool>,
    dispatchers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl DispatchQueue {
    /// Spawns `dispatchers` tasks on the current runtime.
    pub fn start(dispatchers: usize, capacity: usize) -> Result<Self, DbError> {
        if dispatchers == 0 || capacity == 0 {
            return Err(DbError::Config(format!(
                "dispatch queue needs positive sizes, got dispatchers={} capacity={}",
                dispatchers, capacity
            )));
        }
        let (tx, rx) = mpsc::channel(capacity);
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown, _) = watch::channel(false);
        let handles: Vec<_> = (0..dispatchers)
            .map(|id| tokio::spawn(dispatch(id, rx.clone(), shutdown.subscribe())))
            .collect();
        Ok(Self {
            tx,
            rx,
            shutdown,
            dispatchers: std::sync::Mutex::new(handles),
        })
    }

    /// Enqueues `task`, waiting for room while the queue is full.
    pub async fn add(&self, task: Task) -> Result<(), DbError> {
        if *self.shutdown.borrow() {
            return Err(DbError::PoolClosed);
        }
        self.tx.send(task).await.map_err(|_| DbError::PoolClosed)
    }

    /// Number of tasks waiting for a dispatcher.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Lets every dispatcher finish the task it is running, then rejects
    /// blocked submitters and drops whatever is still queued. Dropped tasks
    /// never answer, which their submitters observe as a closed pool.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);

        let handles = {
            let mut guard = self.dispatchers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            let _ = handle.await;
        }

        let mut rx = self.rx.lock().await;
        rx.close();
        let mut dropped = 0usize;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "dispatch queue stopped with pending tasks");
        }
    }
}

async fn dispatch(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Task>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let task = {
            let mut rx = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                rx = queue.lock() => rx,
            };
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                task = rx.recv() => task,
            }
        };
        match task {
            Some(task) => task.await,
            None => break,
        }
    }
    debug!(dispatcher = id, "dispatcher stopped");
}
