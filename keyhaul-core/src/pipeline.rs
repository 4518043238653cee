use std::{fmt, sync::Arc};

use tracing::info;

use crate::{
    config::PipelineConfig,
    context::RunContext,
    error::Result,
    pool::WorkerPool,
    progress::ProgressTracker,
    source::{self, KeySource, KeyStream},
    store::StoreConnector,
};

/// Counters reported after a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Transfer tasks admitted into the queue.
    pub dispatched: u64,
    /// Workers that acknowledged a Stop.
    pub workers_stopped: usize,
    /// Total announced by the key source, if any.
    pub total: Option<u64>,
}

/// One migration run from `config.from` to `config.to`.
pub struct TransferPipeline<C> {
    connector: Arc<C>,
    config: PipelineConfig,
}

impl<C> fmt::Debug for TransferPipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferPipeline")
            .field("connector", &std::any::type_name::<C>())
            .field("config", &self.config)
            .finish()
    }
}

impl<C> TransferPipeline<C>
where
    C: StoreConnector,
{
    pub fn new(connector: Arc<C>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run to completion. Any error returned is fatal; per-key failures are
    /// only logged by the workers.
    pub async fn run(&self, progress: &ProgressTracker) -> Result<RunSummary> {
        let config = &self.config;
        info!(
            from = %config.from,
            to = %config.to,
            source = %config.key_source,
            "starting transfer"
        );

        let pool = WorkerPool::start(
            self.connector.as_ref(),
            &config.from,
            &config.to,
            config.workers,
            config.queue_capacity(),
        )
        .await?;

        let mut ctx = RunContext::new();
        progress.follow_total(&mut ctx);

        let mut keys = self.open_keys(&mut ctx).await?;
        let mut dispatched = 0u64;
        while let Some(key) = keys.next().await {
            pool.dispatch(key?).await?;
            progress.increment();
            dispatched += 1;
        }
        drop(keys);

        let acknowledged = pool.shutdown_coordinator().shutdown().await?;
        pool.join().await?;
        ctx.close().await?;

        let summary = RunSummary {
            dispatched,
            workers_stopped: acknowledged.len(),
            total: progress.snapshot().total,
        };
        info!(
            dispatched = summary.dispatched,
            workers = summary.workers_stopped,
            "transfer finished"
        );
        Ok(summary)
    }

    async fn open_keys(&self, ctx: &mut RunContext) -> Result<KeyStream> {
        match &self.config.key_source {
            KeySource::File(path) => source::open_file(path, ctx).await,
            KeySource::Scan { pattern } => {
                // Dedicated connection; worker connections are never shared.
                let scanner = self.connector.connect(&self.config.from).await?;
                source::open_scan(
                    scanner,
                    pattern.clone(),
                    self.config.from.db,
                    self.config.scan_count,
                    ctx,
                )
                .await
            }
        }
    }
}
