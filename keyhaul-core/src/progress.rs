//! Progress accounting for a run.
//!
//! `processed` counts tasks admitted into the transfer queue, not confirmed
//! transfers. `total` arrives asynchronously from the key source and may stay
//! unknown for the whole run.

use std::{fmt, sync::Arc};

use tokio::sync::watch;
use tracing::debug;

use crate::context::RunContext;

/// Snapshot of a run's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub processed: u64,
    pub total: Option<u64>,
}

impl ProgressState {
    pub fn total_known(&self) -> bool {
        self.total.is_some()
    }

    /// Processed/total ratio, capped at 1.0 because scan totals are only
    /// estimates.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.processed as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Publishes [`ProgressState`] updates to any number of subscribers.
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<watch::Sender<ProgressState>>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &*self.state.borrow())
            .field("subscribers", &self.state.receiver_count())
            .finish()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ProgressState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Receiver for renderers. It observes the sender closing once every
    /// clone of this tracker is dropped.
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ProgressState {
        *self.state.borrow()
    }

    pub fn increment(&self) {
        self.state.send_modify(|state| state.processed += 1);
    }

    pub fn set_total(&self, total: u64) {
        self.state.send_modify(|state| state.total = Some(total));
    }

    /// Install the total once the key source announces it. Leaves it unknown
    /// if the run ends without an announcement.
    pub fn follow_total(&self, ctx: &mut RunContext) {
        let Some(announcement) = ctx.take_total_announcement() else {
            return;
        };
        let tracker = self.clone();
        ctx.spawn("progress-total", async move {
            match announcement.await {
                Ok(total) => tracker.set_total(total),
                Err(_) => debug!("no total key count announced"),
            }
            Ok(())
        });
    }
}
