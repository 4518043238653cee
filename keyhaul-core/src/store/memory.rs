//! In-process store used by the pipeline tests.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use regex::bytes::Regex;

use crate::{
    endpoint::Endpoint,
    error::{Result, TransferError},
};

use super::{
    KeyScanner, KeyStore, KeyspaceSizeLookup, ScanPage, StoreConnector,
};

type DbKey = (String, u16, u32);

fn db_key(endpoint: &Endpoint) -> DbKey {
    (endpoint.host.clone(), endpoint.port, endpoint.db)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
pub(crate) struct MemoryDb {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    writes: usize,
    report_size: bool,
}

#[derive(Debug, Default)]
struct ConnectorState {
    dbs: HashMap<DbKey, Arc<Mutex<MemoryDb>>>,
    refused: HashSet<DbKey>,
    connections: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MemoryConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn db(&self, endpoint: &Endpoint) -> Arc<Mutex<MemoryDb>> {
        let mut state = lock(&self.state);
        Arc::clone(state.dbs.entry(db_key(endpoint)).or_insert_with(|| {
            Arc::new(Mutex::new(MemoryDb {
                report_size: true,
                ..MemoryDb::default()
            }))
        }))
    }

    pub(crate) fn seed(&self, endpoint: &Endpoint, keys: &[&str]) {
        let raw: Vec<&[u8]> = keys.iter().map(|key| key.as_bytes()).collect();
        self.seed_raw(endpoint, &raw);
    }

    pub(crate) fn seed_raw(&self, endpoint: &Endpoint, keys: &[&[u8]]) {
        let db = self.db(endpoint);
        let mut db = lock(&db);
        for key in keys {
            let mut payload = b"payload:".to_vec();
            payload.extend_from_slice(key);
            db.entries.insert(key.to_vec(), payload);
        }
    }

    pub(crate) fn hide_keyspace_size(&self, endpoint: &Endpoint) {
        lock(&self.db(endpoint)).report_size = false;
    }

    pub(crate) fn refuse(&self, endpoint: &Endpoint) {
        lock(&self.state).refused.insert(db_key(endpoint));
    }

    pub(crate) fn connections(&self) -> usize {
        lock(&self.state).connections
    }

    /// Key names, lossily decoded for readable assertions.
    pub(crate) fn keys(&self, endpoint: &Endpoint) -> Vec<String> {
        self.raw_keys(endpoint)
            .iter()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .collect()
    }

    pub(crate) fn raw_keys(&self, endpoint: &Endpoint) -> Vec<Vec<u8>> {
        lock(&self.db(endpoint)).entries.keys().cloned().collect()
    }

    pub(crate) fn value(
        &self,
        endpoint: &Endpoint,
        key: impl AsRef<[u8]>,
    ) -> Option<Vec<u8>> {
        lock(&self.db(endpoint)).entries.get(key.as_ref()).cloned()
    }

    pub(crate) fn writes(&self, endpoint: &Endpoint) -> usize {
        lock(&self.db(endpoint)).writes
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Connection = MemoryStore;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MemoryStore> {
        {
            let mut state = lock(&self.state);
            if state.refused.contains(&db_key(endpoint)) {
                return Err(TransferError::Connect {
                    endpoint: endpoint.address(),
                    reason: "connection refused".to_string(),
                });
            }
            state.connections += 1;
        }
        Ok(MemoryStore {
            db: self.db(endpoint),
        })
    }
}

#[derive(Debug)]
pub(crate) struct MemoryStore {
    db: Arc<Mutex<MemoryDb>>,
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn dump(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.db).entries.get(key).cloned())
    }

    async fn restore(&mut self, key: &[u8], payload: &[u8]) -> Result<()> {
        let mut db = lock(&self.db);
        db.writes += 1;
        db.entries.insert(key.to_vec(), payload.to_vec());
        Ok(())
    }
}

#[async_trait]
impl KeyScanner for MemoryStore {
    async fn scan(
        &mut self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage> {
        let matcher = glob_regex(pattern);
        let db = lock(&self.db);
        let start = cursor as usize;
        let end = start.saturating_add(count.max(1));

        let keys = db
            .entries
            .keys()
            .skip(start)
            .take(end - start)
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect();
        let cursor = if end >= db.entries.len() { 0 } else { end as u64 };

        Ok(ScanPage { cursor, keys })
    }
}

#[async_trait]
impl KeyspaceSizeLookup for MemoryStore {
    async fn keyspace_size(&mut self, _db: u32) -> Result<Option<u64>> {
        let db = lock(&self.db);
        Ok(db.report_size.then_some(db.entries.len() as u64))
    }
}

/// Byte-level glob: `*` and `?` match any bytes, including invalid UTF-8.
fn glob_regex(pattern: &str) -> Regex {
    let mut expr = String::from("(?s-u)^");
    for byte in pattern.bytes() {
        match byte {
            b'*' => expr.push_str(".*"),
            b'?' => expr.push('.'),
            other => expr.push_str(&format!("\\x{other:02X}")),
        }
    }
    expr.push('$');
    Regex::new(&expr).expect("escaped glob is a valid regex")
}
