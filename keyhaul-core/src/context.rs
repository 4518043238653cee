//! Run-scoped coordination state shared by the producer, the key source and
//! the progress tracker.

use std::{fmt, future::Future};

use tokio::{sync::oneshot, task::JoinSet};
use tracing::{debug, error};

use crate::error::{Result, TransferError};

/// Owns the total-count announcement and the auxiliary tasks of one run.
///
/// Created when a run starts and consumed by [`RunContext::close`], which is
/// the barrier the run waits on before reporting completion.
pub struct RunContext {
    total_tx: Option<oneshot::Sender<u64>>,
    total_rx: Option<oneshot::Receiver<u64>>,
    tasks: JoinSet<Result<()>>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("total_pending", &self.total_tx.is_some())
            .field("total_followed", &self.total_rx.is_none())
            .field("aux_tasks", &self.tasks.len())
            .finish()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        let (total_tx, total_rx) = oneshot::channel();
        Self {
            total_tx: Some(total_tx),
            total_rx: Some(total_rx),
            tasks: JoinSet::new(),
        }
    }

    /// Publish the total key count. Only the first call has an effect;
    /// returns whether this call delivered it.
    pub fn announce_total(&mut self, total: u64) -> bool {
        match self.total_tx.take() {
            Some(tx) => {
                debug!(total, "total key count announced");
                // Nobody listening is fine: progress may not be followed.
                let _ = tx.send(total);
                true
            }
            None => false,
        }
    }

    /// Receiver side of the total announcement. Resolves with an error if
    /// the run closes without a total ever being announced.
    pub fn take_total_announcement(
        &mut self,
    ) -> Option<oneshot::Receiver<u64>> {
        self.total_rx.take()
    }

    /// Register an auxiliary task whose completion gates [`close`].
    ///
    /// [`close`]: RunContext::close
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        debug!(task = name, "spawning auxiliary task");
        self.tasks.spawn(async move {
            let result = task.await;
            if let Err(err) = &result {
                error!(task = name, error = %err, "auxiliary task failed");
            }
            result
        });
    }

    /// Wait for every auxiliary task. An announcement that never happened is
    /// dropped first so followers waiting on it can finish.
    pub async fn close(mut self) -> Result<()> {
        self.total_tx.take();
        self.total_rx.take();

        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined
                .map_err(|e| TransferError::Task(e.to_string()))
                .and_then(|result| result);
            if let Err(err) = outcome
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn total_is_delivered_once() {
        let mut ctx = RunContext::new();
        let rx = ctx.take_total_announcement().unwrap();
        assert!(ctx.announce_total(3));
        assert!(!ctx.announce_total(4));
        assert_eq!(rx.await.unwrap(), 3);
        ctx.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_releases_unannounced_total() {
        let mut ctx = RunContext::new();
        let rx = ctx.take_total_announcement().unwrap();
        ctx.spawn("follower", async move {
            assert!(rx.await.is_err());
            Ok(())
        });
        ctx.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_waits_for_tasks_and_reports_failure() {
        let mut ctx = RunContext::new();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        ctx.spawn("ok", async move {
            tokio::task::yield_now().await;
            let _ = done_tx.send(());
            Ok(())
        });
        ctx.spawn("failing", async {
            Err(TransferError::Task("boom".to_string()))
        });

        let err = ctx.close().await.unwrap_err();
        assert!(matches!(err, TransferError::Task(msg) if msg == "boom"));
        assert!(done_rx.await.is_ok());
    }
}
