//! Narrow views of the key-value store consumed by the pipeline.
//!
//! Workers only need [`KeyStore`]; the scan-based key source additionally
//! needs [`KeyScanner`] and [`KeyspaceSizeLookup`]. A [`StoreConnector`]
//! produces connections that implement all three.

pub mod redis_store;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::{endpoint::Endpoint, error::Result};

/// One page returned by a cursor scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Continuation cursor. `0` means the iteration is complete.
    pub cursor: u64,
    /// Raw key names; Redis keys are binary-safe.
    pub keys: Vec<Vec<u8>>,
}

/// Serialize and restore single keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send {
    /// Opaque serialized form of `key`, or `None` when the key does not exist.
    async fn dump(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Recreate `key` from `payload` with no expiration, replacing any
    /// existing value.
    async fn restore(&mut self, key: &[u8], payload: &[u8]) -> Result<()>;
}

/// Cursor-paginated key listing filtered by a glob-style pattern.
#[async_trait]
pub trait KeyScanner: Send {
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage>;
}

/// Approximate number of keys in a logical database.
///
/// `Ok(None)` means the backend did not report a size for `db`; callers treat
/// that as an unknown total rather than an error.
#[async_trait]
pub trait KeyspaceSizeLookup: Send {
    async fn keyspace_size(&mut self, db: u32) -> Result<Option<u64>>;
}

/// Opens ready-to-use connections (connected, authenticated, db selected).
#[async_trait]
pub trait StoreConnector: Send + Sync + 'static {
    type Connection: KeyStore + KeyScanner + KeyspaceSizeLookup + 'static;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Connection>;
}
