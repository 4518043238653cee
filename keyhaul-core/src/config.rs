use crate::{
    endpoint::Endpoint,
    error::{Result, TransferError},
    source::KeySource,
};

/// SCAN `COUNT` hint used when none is configured.
pub const DEFAULT_SCAN_COUNT: usize = 1000;

/// Capacity of the flattened key channel fed by the scan tasks.
pub const KEY_BUFFER: usize = 1000;

/// Everything one migration run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub from: Endpoint,
    pub to: Endpoint,
    pub key_source: KeySource,
    pub workers: usize,
    pub scan_count: usize,
    /// Pending-task capacity of the transfer queue. Defaults to `workers`.
    pub queue_capacity: Option<usize>,
}

impl PipelineConfig {
    pub fn new(
        from: Endpoint,
        to: Endpoint,
        key_source: KeySource,
        workers: usize,
    ) -> Self {
        Self {
            from,
            to,
            key_source,
            workers,
            scan_count: DEFAULT_SCAN_COUNT,
            queue_capacity: None,
        }
    }

    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(TransferError::InvalidConfig(
                "worker count must be greater than zero".to_string(),
            ));
        }
        if self.scan_count == 0 {
            return Err(TransferError::InvalidConfig(
                "scan count must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(TransferError::InvalidConfig(
                "queue capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
