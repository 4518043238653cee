use std::fmt;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::{
    endpoint::Endpoint,
    error::{Result, TransferError},
    keyspace::parse_keyspace_size,
};

use super::{
    KeyScanner, KeyStore, KeyspaceSizeLookup, ScanPage, StoreConnector,
};

/// Opens [`RedisStore`] connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl StoreConnector for RedisConnector {
    type Connection = RedisStore;

    async fn connect(&self, endpoint: &Endpoint) -> Result<RedisStore> {
        RedisStore::connect(endpoint).await
    }
}

/// A single Redis connection owned by one worker or by the key scanner.
pub struct RedisStore {
    conn: MultiplexedConnection,
    address: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("address", &self.address)
            .field("connection", &"MultiplexedConnection")
            .finish()
    }
}

impl RedisStore {
    /// Connect, authenticate when the endpoint carries a password, then
    /// select the endpoint's database.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let address = endpoint.address();
        debug!(endpoint = %endpoint, "connecting");

        let client =
            redis::Client::open(endpoint.connection_url()).map_err(|e| {
                TransferError::Connect {
                    endpoint: address.clone(),
                    reason: e.to_string(),
                }
            })?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TransferError::Connect {
                endpoint: address.clone(),
                reason: e.to_string(),
            })?;

        if let Some(password) = endpoint.password.as_deref() {
            redis::cmd("AUTH")
                .arg(password)
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| TransferError::Auth {
                    endpoint: address.clone(),
                    reason: e.to_string(),
                })?;
        }

        redis::cmd("SELECT")
            .arg(endpoint.db)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| TransferError::Select {
                endpoint: address.clone(),
                db: endpoint.db,
                reason: e.to_string(),
            })?;

        info!(endpoint = %endpoint, "connected");
        Ok(Self { conn, address })
    }
}

fn dump_cmd(key: &[u8]) -> redis::Cmd {
    let mut cmd = redis::cmd("DUMP");
    cmd.arg(key);
    cmd
}

/// TTL 0 restores without expiration; REPLACE overwrites.
fn restore_cmd(key: &[u8], payload: &[u8]) -> redis::Cmd {
    let mut cmd = redis::cmd("RESTORE");
    cmd.arg(key).arg(0).arg(payload).arg("REPLACE");
    cmd
}

fn scan_cmd(cursor: u64, pattern: &str, count: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("SCAN");
    cmd.arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(count);
    cmd
}

fn keyspace_info_cmd() -> redis::Cmd {
    let mut cmd = redis::cmd("INFO");
    cmd.arg("keyspace");
    cmd
}

#[async_trait]
impl KeyStore for RedisStore {
    async fn dump(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        dump_cmd(key)
            .query_async::<Option<Vec<u8>>>(&mut self.conn)
            .await
            .map_err(|e| TransferError::Command {
                command: "DUMP",
                reason: e.to_string(),
            })
    }

    async fn restore(&mut self, key: &[u8], payload: &[u8]) -> Result<()> {
        restore_cmd(key, payload)
            .query_async::<()>(&mut self.conn)
            .await
            .map_err(|e| TransferError::Command {
                command: "RESTORE",
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl KeyScanner for RedisStore {
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage> {
        // Keys stay raw bytes; a non-UTF-8 name must not fail the page.
        let (cursor_next, keys) = scan_cmd(cursor, pattern, count)
            .query_async::<(u64, Vec<Vec<u8>>)>(&mut self.conn)
            .await
            .map_err(|e| TransferError::Scan {
                cursor,
                reason: e.to_string(),
            })?;

        Ok(ScanPage {
            cursor: cursor_next,
            keys,
        })
    }
}

#[async_trait]
impl KeyspaceSizeLookup for RedisStore {
    async fn keyspace_size(&mut self, db: u32) -> Result<Option<u64>> {
        let info = keyspace_info_cmd()
            .query_async::<String>(&mut self.conn)
            .await
            .map_err(|e| TransferError::Command {
                command: "INFO",
                reason: e.to_string(),
            })?;

        Ok(parse_keyspace_size(&info, db))
    }
}
