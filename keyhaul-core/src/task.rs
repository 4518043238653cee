use std::fmt;

use tokio::sync::oneshot;

/// Index of a worker inside its pool.
pub type WorkerId = usize;

/// Work item carried by the transfer queue.
pub enum Task {
    /// Move one key from source to destination.
    Transfer(Vec<u8>),
    /// Terminate the worker that receives it; the worker replies with its id.
    Stop(oneshot::Sender<WorkerId>),
}

impl Task {
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Transfer(_) => "transfer",
            Task::Stop(_) => "stop",
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Transfer(key) => f
                .debug_tuple("Transfer")
                .field(&String::from_utf8_lossy(key))
                .finish(),
            Task::Stop(_) => f.debug_tuple("Stop").field(&"<ack>").finish(),
        }
    }
}
