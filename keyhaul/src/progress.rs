//! Terminal rendering of [`ProgressState`] updates.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use keyhaul_core::ProgressState;
use tokio::{sync::watch, task::JoinHandle};

const KNOWN_TOTAL_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] \
    [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA {eta}";
const UNKNOWN_TOTAL_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {pos} keys {per_sec}";

/// Draw a bar on stderr until the tracker behind `rx` is dropped.
pub fn spawn_renderer(mut rx: watch::Receiver<ProgressState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.set_style(style(UNKNOWN_TOTAL_TEMPLATE));
        bar.enable_steady_tick(Duration::from_millis(120));

        let mut total_known = false;
        loop {
            let state = *rx.borrow_and_update();
            if let Some(total) = state.total {
                if !total_known {
                    bar.set_style(style(KNOWN_TOTAL_TEMPLATE));
                    total_known = true;
                }
                // Scan totals are estimates; never let position overrun.
                bar.set_length(total.max(state.processed));
            }
            bar.set_position(state.processed);

            if rx.changed().await.is_err() {
                break;
            }
        }

        let last = *rx.borrow();
        bar.set_position(last.processed);
        bar.finish();
    })
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}
