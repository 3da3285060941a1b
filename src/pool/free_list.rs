use crate::error::DbError;
use crate::pool::worker::{CheckedOut, Worker};
use tokio::sync::{Mutex, mpsc};
use tracing::warn;

struct State {
    rx: mpsc::Receiver<Worker>,
    /// Workers whose connection has not been closed yet.
    outstanding: usize,
    /// Reclaimed worker whose close has not completed.
    closing: Option<Worker>,
    first_err: Option<DbError>,
}

/// Outcome of [`FreeList::close_all`].
pub(crate) struct Closed {
    /// Connections closed by this call.
    pub(crate) count: usize,
    pub(crate) first_err: Option<DbError>,
}

/// Bounded channel of idle workers that doubles as the concurrency semaphore.
///
/// The receiving half sits behind a fair mutex, so callers waiting for a
/// worker are served in arrival order.
pub(crate) struct FreeList {
    tx: mpsc::Sender<Worker>,
    state: Mutex<State>,
}

impl FreeList {
    pub(crate) fn new(workers: Vec<Worker>) -> Self {
        let size = workers.len().max(1);
        let (tx, rx) = mpsc::channel(size);
        let outstanding = workers.len();
        for worker in workers {
            // Capacity equals the worker count.
            let _ = tx.try_send(worker);
        }
        Self {
            tx,
            state: Mutex::new(State {
                rx,
                outstanding,
                closing: None,
                first_err: None,
            }),
        }
    }

    /// Waits for an idle worker.
    pub(crate) async fn checkout(&self) -> Result<CheckedOut, DbError> {
        let mut state = self.state.lock().await;
        match state.rx.recv().await {
            Some(worker) => Ok(CheckedOut::new(worker, self.tx.clone())),
            None => Err(DbError::PoolClosed),
        }
    }

    /// Number of workers currently idle.
    pub(crate) fn idle(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Waits for every worker to come back and closes its connection,
    /// holding the lock throughout so concurrent callers return only once
    /// all connections are closed.
    ///
    /// A worker is forgotten only after its close completes; if this future
    /// is dropped midway, the next call picks up where it stopped. Every
    /// caller sees the first close error.
    pub(crate) async fn close_all(&self, driver: &str) -> Closed {
        let mut state = self.state.lock().await;
        let mut count = 0;
        loop {
            if state.closing.is_none() {
                if state.outstanding == 0 {
                    break;
                }
                let Some(worker) = state.rx.recv().await else {
                    break;
                };
                state.closing = Some(worker);
            }
            let Some(worker) = state.closing.as_ref() else {
                break;
            };
            let id = worker.id();
            let result = worker.close().await;
            state.closing = None;
            state.outstanding -= 1;
            count += 1;
            if let Err(e) = result {
                warn!(driver, worker = id, error = %e, "close connection");
                state.first_err.get_or_insert(e);
            }
        }
        state.rx.close();
        Closed {
            count,
            first_err: state.first_err.clone(),
        }
    }
}
