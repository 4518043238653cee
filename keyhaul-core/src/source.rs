//! Key enumeration: a newline-delimited key file or a cursor scan against
//! the source store.

use std::{
    fmt,
    path::{Path, PathBuf},
    vec,
};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    config::KEY_BUFFER,
    context::RunContext,
    error::{Result, TransferError},
    store::{KeyScanner, KeyspaceSizeLookup},
};

/// Where the keys of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Newline-delimited key list.
    File(PathBuf),
    /// Glob-style pattern handed to the store's cursor scan.
    Scan { pattern: String },
}

impl KeySource {
    /// Pick the file variant when `arg` names something on the filesystem,
    /// the scan variant otherwise.
    pub fn select(arg: &str) -> Self {
        if std::fs::metadata(arg).is_ok() {
            KeySource::File(PathBuf::from(arg))
        } else {
            KeySource::Scan {
                pattern: arg.to_string(),
            }
        }
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::File(path) => write!(f, "file {}", path.display()),
            KeySource::Scan { pattern } => write!(f, "scan '{pattern}'"),
        }
    }
}

/// Lazily produced raw key names, consumed once.
pub struct KeyStream {
    inner: Inner,
}

enum Inner {
    Listed(vec::IntoIter<Vec<u8>>),
    Channel(mpsc::Receiver<Result<Vec<u8>>>),
}

impl fmt::Debug for KeyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            Inner::Listed(ref keys) => format!("listed ({} left)", keys.len()),
            Inner::Channel(_) => "channel".to_string(),
        };
        f.debug_struct("KeyStream").field("inner", &kind).finish()
    }
}

impl KeyStream {
    /// Next key. An `Err` item is fatal and ends the stream.
    pub async fn next(&mut self) -> Option<Result<Vec<u8>>> {
        match &mut self.inner {
            Inner::Listed(keys) => keys.next().map(Ok),
            Inner::Channel(rx) => rx.recv().await,
        }
    }
}

/// Read a key list, announce its size, and stream it in file order.
pub async fn open_file(path: &Path, ctx: &mut RunContext) -> Result<KeyStream> {
    let contents = tokio::fs::read(path).await.map_err(|source| {
        TransferError::KeyFile {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let keys = split_keys(&contents);
    info!(path = %path.display(), keys = keys.len(), "loaded key list");
    ctx.announce_total(keys.len() as u64);

    Ok(KeyStream {
        inner: Inner::Listed(keys.into_iter()),
    })
}

/// One key per line. A trailing `\r` is dropped, empty lines are skipped and
/// every other byte is part of the key.
fn split_keys(contents: &[u8]) -> Vec<Vec<u8>> {
    contents
        .split(|&byte| byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
        .collect()
}

/// Enumerate keys matching `pattern` with a cursor scan on `scanner`.
///
/// The store's keyspace size for `db` is announced as the total when it is
/// available. Pagination and batch flattening run as auxiliary tasks on
/// `ctx`. Keys are not deduplicated across pages.
pub async fn open_scan<S>(
    mut scanner: S,
    pattern: String,
    db: u32,
    count: usize,
    ctx: &mut RunContext,
) -> Result<KeyStream>
where
    S: KeyScanner + KeyspaceSizeLookup + 'static,
{
    match scanner.keyspace_size(db).await {
        Ok(Some(total)) => {
            ctx.announce_total(total);
        }
        Ok(None) => debug!(db, "keyspace size not reported"),
        Err(err) => debug!(db, error = %err, "keyspace size lookup failed"),
    }

    let (batch_tx, mut batch_rx) = mpsc::channel::<Result<Vec<Vec<u8>>>>(1);
    let (key_tx, key_rx) = mpsc::channel::<Result<Vec<u8>>>(KEY_BUFFER);

    ctx.spawn("scan-pager", async move {
        let mut cursor = 0u64;
        let mut pages = 0usize;
        let mut seen = 0usize;
        loop {
            let page = match scanner.scan(cursor, &pattern, count).await {
                Ok(page) => page,
                Err(err) => {
                    let _ = batch_tx.send(Err(err)).await;
                    break;
                }
            };
            pages += 1;
            seen += page.keys.len();
            debug!(
                cursor,
                next = page.cursor,
                batch = page.keys.len(),
                "scan page"
            );

            if batch_tx.send(Ok(page.keys)).await.is_err() {
                break;
            }
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        debug!(pages, keys = seen, "scan finished");
        Ok(())
    });

    ctx.spawn("scan-forwarder", async move {
        while let Some(batch) = batch_rx.recv().await {
            match batch {
                Ok(keys) => {
                    for key in keys {
                        if key_tx.send(Ok(key)).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                Err(err) => {
                    let _ = key_tx.send(Err(err)).await;
                    return Ok(());
                }
            }
        }
        Ok(())
    });

    Ok(KeyStream {
        inner: Inner::Channel(key_rx),
    })
}
