//! Fixed-size pool of transfer workers.
//!
//! Each worker owns one source and one destination connection for its whole
//! lifetime; connections are never shared between workers.

use std::fmt;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    endpoint::Endpoint,
    error::{Result, TransferError},
    queue::{TaskReceiver, TaskSender, transfer_queue},
    shutdown::ShutdownCoordinator,
    store::{KeyStore, StoreConnector},
    task::{Task, WorkerId},
    transfer::{TransferOutcome, transfer_key},
};

/// Running workers plus the producer side of their shared queue.
pub struct WorkerPool {
    sender: TaskSender,
    handles: Vec<JoinHandle<()>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.handles.len())
            .field("sender", &self.sender)
            .finish()
    }
}

impl WorkerPool {
    /// Connect `size` source/destination pairs, then spawn one worker per
    /// pair. Any connection failure aborts before a single worker runs.
    pub async fn start<C>(
        connector: &C,
        from: &Endpoint,
        to: &Endpoint,
        size: usize,
        queue_capacity: usize,
    ) -> Result<Self>
    where
        C: StoreConnector,
    {
        if size == 0 {
            return Err(TransferError::InvalidConfig(
                "worker pool needs at least one worker".to_string(),
            ));
        }

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let source = connector.connect(from).await?;
            let destination = connector.connect(to).await?;
            debug!(worker = id, "worker connections ready");
            workers.push(Worker {
                id,
                source,
                destination,
            });
        }

        let (sender, receiver) = transfer_queue(queue_capacity);
        let handles = workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(receiver.clone())))
            .collect();

        info!(workers = size, queue_capacity, "worker pool started");
        Ok(Self { sender, handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Queue one key. Suspends while the queue is full.
    pub async fn dispatch(&self, key: Vec<u8>) -> Result<()> {
        self.sender.send(Task::Transfer(key)).await
    }

    /// Coordinator that sends one Stop per worker in this pool.
    pub fn shutdown_coordinator(&self) -> ShutdownCoordinator {
        ShutdownCoordinator::new(self.sender.clone(), self.size())
    }

    /// Wait for every worker task to exit.
    pub async fn join(self) -> Result<()> {
        let Self { sender, handles } = self;
        drop(sender);
        for handle in handles {
            handle
                .await
                .map_err(|e| TransferError::Task(format!("worker: {e}")))?;
        }
        Ok(())
    }
}

struct Worker<S> {
    id: WorkerId,
    source: S,
    destination: S,
}

impl<S> Worker<S>
where
    S: KeyStore + 'static,
{
    async fn run(mut self, tasks: TaskReceiver) {
        let mut handled = 0u64;
        let mut copied = 0u64;

        loop {
            match tasks.recv().await {
                Some(Task::Transfer(key)) => {
                    handled += 1;
                    let outcome = transfer_key(
                        &mut self.source,
                        &mut self.destination,
                        &key,
                    )
                    .await;
                    if outcome == TransferOutcome::Copied {
                        copied += 1;
                    }
                }
                Some(Task::Stop(ack)) => {
                    let _ = ack.send(self.id);
                    break;
                }
                None => break,
            }
        }

        debug!(worker = self.id, handled, copied, "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::memory::MemoryConnector;

    fn endpoints() -> (Endpoint, Endpoint) {
        (Endpoint::new("source", 6379), Endpoint::new("dest", 6380))
    }

    #[tokio::test]
    async fn every_worker_opens_its_own_pair() {
        let (from, to) = endpoints();
        let connector = MemoryConnector::new();
        let pool = WorkerPool::start(&connector, &from, &to, 3, 3)
            .await
            .unwrap();
        assert_eq!(pool.size(), 3);
        assert_eq!(connector.connections(), 6);

        pool.shutdown_coordinator().shutdown().await.unwrap();
        pool.join().await.unwrap();
    }

    #[tokio::test]
    async fn connection_failure_aborts_startup() {
        let (from, to) = endpoints();
        let connector = MemoryConnector::new();
        connector.refuse(&to);

        let err = WorkerPool::start(&connector, &from, &to, 2, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Connect { .. }));
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let (from, to) = endpoints();
        let err = WorkerPool::start(&MemoryConnector::new(), &from, &to, 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn stops_are_consumed_once_each_after_all_transfers() {
        let (from, to) = endpoints();
        let connector = MemoryConnector::new();
        let keys: Vec<String> = (0..50).map(|i| format!("k{i:02}")).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        connector.seed(&from, &key_refs);

        let pool = WorkerPool::start(&connector, &from, &to, 4, 4)
            .await
            .unwrap();
        for key in &keys {
            pool.dispatch(key.clone().into_bytes()).await.unwrap();
        }

        let acked = pool.shutdown_coordinator().shutdown().await.unwrap();
        assert_eq!(acked.len(), 4);
        let distinct: HashSet<_> = acked.iter().copied().collect();
        assert_eq!(distinct, HashSet::from([0, 1, 2, 3]));

        pool.join().await.unwrap();
        assert_eq!(connector.keys(&to), keys);
        assert_eq!(connector.writes(&to), 50);
    }

    #[tokio::test]
    async fn absent_keys_produce_no_writes() {
        let (from, to) = endpoints();
        let connector = MemoryConnector::new();
        connector.seed(&from, &["present"]);

        let pool = WorkerPool::start(&connector, &from, &to, 2, 2)
            .await
            .unwrap();
        pool.dispatch(b"present".to_vec()).await.unwrap();
        pool.dispatch(b"expired".to_vec()).await.unwrap();
        pool.shutdown_coordinator().shutdown().await.unwrap();
        pool.join().await.unwrap();

        assert_eq!(connector.writes(&to), 1);
        assert_eq!(connector.keys(&to), ["present"]);
        assert_eq!(
            connector.value(&to, "present"),
            connector.value(&from, "present")
        );
    }
}
