//! Concurrent key migration between Redis instances.
//!
//! Keys come from a key-list file or a cursor scan of the source, flow
//! through a bounded queue to a fixed pool of workers, and are copied with
//! DUMP/RESTORE (no expiration, replacing existing keys). Transfers are
//! best-effort: per-key failures are logged and skipped, never retried.
//!
//! [`TransferPipeline`] wires the pieces for one run; the modules below are
//! usable on their own for custom drivers.

pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod keyspace;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod shutdown;
pub mod source;
pub mod store;
pub mod task;
pub mod transfer;

pub use config::{DEFAULT_SCAN_COUNT, PipelineConfig};
pub use context::RunContext;
pub use endpoint::{Endpoint, EndpointError};
pub use error::{Result, TransferError};
pub use pipeline::{RunSummary, TransferPipeline};
pub use pool::WorkerPool;
pub use progress::{ProgressState, ProgressTracker};
pub use shutdown::ShutdownCoordinator;
pub use source::{KeySource, KeyStream};
pub use store::{
    KeyScanner, KeyStore, KeyspaceSizeLookup, ScanPage, StoreConnector,
    redis_store::{RedisConnector, RedisStore},
};
pub use task::{Task, WorkerId};
pub use transfer::{TransferOutcome, transfer_key};
