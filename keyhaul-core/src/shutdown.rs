//! End-of-stream Stop protocol.
//!
//! Stops are admitted behind every transfer already in the queue, so once a
//! worker acknowledges a Stop every earlier transfer has been *dequeued* by
//! some worker. It has not necessarily been *completed*: a transfer picked
//! up by another worker may still be running. Await
//! [`WorkerPool::join`](crate::pool::WorkerPool::join) for completion.

use std::fmt;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::{
    error::{Result, TransferError},
    queue::TaskSender,
    task::{Task, WorkerId},
};

/// Sends exactly one Stop per worker and collects the acknowledgments.
pub struct ShutdownCoordinator {
    sender: TaskSender,
    workers: usize,
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("workers", &self.workers)
            .finish()
    }
}

impl ShutdownCoordinator {
    pub fn new(sender: TaskSender, workers: usize) -> Self {
        Self { sender, workers }
    }

    /// Enqueue one Stop, wait for its acknowledgment, repeat for every
    /// worker. Returns the ids of the acknowledging workers in order.
    pub async fn shutdown(self) -> Result<Vec<WorkerId>> {
        let mut acknowledged = Vec::with_capacity(self.workers);

        for sent in 0..self.workers {
            let (ack_tx, ack_rx) = oneshot::channel();
            self.sender.send(Task::Stop(ack_tx)).await?;

            let worker = ack_rx.await.map_err(|_| {
                TransferError::Shutdown(format!(
                    "stop {} of {} was dropped without acknowledgment",
                    sent + 1,
                    self.workers
                ))
            })?;
            debug!(worker, "worker acknowledged stop");
            acknowledged.push(worker);
        }

        info!(workers = acknowledged.len(), "all workers stopped");
        Ok(acknowledged)
    }
}
