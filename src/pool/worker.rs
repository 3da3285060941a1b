use crate::error::DbError;
use crate::udbc::connection::Connection;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One live connection and the slot id it occupies in the pool.
pub(crate) struct Worker {
    id: usize,
    conn: Arc<dyn Connection>,
}

impl Worker {
    pub(crate) fn new(id: usize, conn: Arc<dyn Connection>) -> Self {
        Self { id, conn }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) async fn close(&self) -> Result<(), DbError> {
        self.conn.close().await
    }
}

/// A worker held by exactly one operation.
///
/// Dropping it puts the worker back on the free-list, so the slot is
/// released when the operation really ends, unwinding included.
pub(crate) struct CheckedOut {
    id: usize,
    conn: Arc<dyn Connection>,
    worker: Option<Worker>,
    free: mpsc::Sender<Worker>,
}

impl CheckedOut {
    pub(crate) fn new(worker: Worker, free: mpsc::Sender<Worker>) -> Self {
        Self {
            id: worker.id,
            conn: worker.conn.clone(),
            worker: Some(worker),
            free,
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn connection(&self) -> Arc<dyn Connection> {
        self.conn.clone()
    }
}

impl Drop for CheckedOut {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            // The channel holds exactly as many slots as there are workers,
            // so this only fails once the free-list has been closed.
            let _ = self.free.try_send(worker);
        }
    }
}
