//! Bounded FIFO channel between the producer and the worker pool.
//!
//! Admission order is preserved. Which worker dequeues a given task is not:
//! all workers share a single receiver and whoever holds the lock next takes
//! the head of the queue.

use std::{fmt, sync::Arc};

use tokio::sync::{Mutex, mpsc};

use crate::{
    error::{Result, TransferError},
    task::Task,
};

/// Create a queue holding at most `capacity` pending tasks.
pub fn transfer_queue(capacity: usize) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TaskSender { tx },
        TaskReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side. Sending suspends while the queue is full.
#[derive(Clone)]
pub struct TaskSender {
    tx: mpsc::Sender<Task>,
}

impl fmt::Debug for TaskSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSender")
            .field("capacity", &self.tx.max_capacity())
            .field("free", &self.tx.capacity())
            .finish()
    }
}

impl TaskSender {
    pub async fn send(&self, task: Task) -> Result<()> {
        let kind = task.kind();
        self.tx
            .send(task)
            .await
            .map_err(|_| TransferError::QueueClosed(kind))
    }
}

/// Consumer side, cloned into every worker.
#[derive(Clone)]
pub struct TaskReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Task>>>,
}

impl fmt::Debug for TaskReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskReceiver")
            .field("consumers", &Arc::strong_count(&self.rx))
            .finish()
    }
}

impl TaskReceiver {
    /// Next task in admission order, or `None` once every sender is gone and
    /// the queue is empty.
    pub async fn recv(&self) -> Option<Task> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}
