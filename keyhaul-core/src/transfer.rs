use tracing::{trace, warn};

use crate::store::KeyStore;

/// What happened to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Copied,
    /// The key vanished (expired or deleted) between enumeration and read.
    Absent,
    ReadFailed,
    WriteFailed,
}

/// Copy `key` from `source` to `destination` via DUMP/RESTORE.
///
/// Failures are logged and reported through the outcome only; they never
/// stop the caller.
pub async fn transfer_key<S, D>(
    source: &mut S,
    destination: &mut D,
    key: &[u8],
) -> TransferOutcome
where
    S: KeyStore + ?Sized,
    D: KeyStore + ?Sized,
{
    let name = String::from_utf8_lossy(key);
    let payload = match source.dump(key).await {
        Ok(Some(payload)) if !payload.is_empty() => payload,
        Ok(_) => {
            trace!(key = %name, "key absent at read time, skipping");
            return TransferOutcome::Absent;
        }
        Err(err) => {
            warn!(key = %name, error = %err, "FAIL:DUMP");
            return TransferOutcome::ReadFailed;
        }
    };

    match destination.restore(key, &payload).await {
        Ok(()) => TransferOutcome::Copied,
        Err(err) => {
            warn!(key = %name, error = %err, "FAIL:RESTORE");
            TransferOutcome::WriteFailed
        }
    }
}
