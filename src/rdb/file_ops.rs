//! RDB files on disk: startup load and SAVE.

use std::path::{Path, PathBuf};

use jiff::Timestamp;
use tokio::fs;
use tracing::warn;

use crate::rdb::parser::parse_rdb;
use crate::store::StringStore;

/// Loads `<dir>/<filename>` into the string store. Keys whose TTL has
/// already passed are dropped at load time. Returns the number of keys
/// loaded; a missing file loads nothing and is not an error.
pub async fn load_rdb_file(
    dir: &str,
    filename: &str,
    store: &mut StringStore,
) -> tokio::io::Result<usize> {
    let path = Path::new(dir).join(filename);
    if !path.exists() {
        return Ok(0);
    }

    let bytes = fs::read(&path).await?;
    let records = parse_rdb(&bytes)?;
    let now_ms = Timestamp::now().as_millisecond();

    let mut loaded = 0;
    for record in records {
        let expiry_at = match record.expiry_ms {
            Some(expiry_ms) if now_ms >= expiry_ms => continue,
            Some(expiry_ms) => match Timestamp::from_millisecond(expiry_ms) {
                Ok(timestamp) => Some(timestamp),
                Err(error) => {
                    warn!(key = %record.key, %error, "skipping key with unusable expiry");
                    continue;
                }
            },
            None => None,
        };

        store.set(record.key, record.value, expiry_at);
        loaded += 1;
    }

    Ok(loaded)
}

/// Writes a serialized snapshot to `dump.rdb` in the process working
/// directory, going through a temp file and an atomic rename.
pub async fn save_rdb_file(bytes: &[u8]) -> tokio::io::Result<PathBuf> {
    let target = PathBuf::from("dump.rdb");
    let temp = PathBuf::from("dump.rdb.tmp");

    fs::write(&temp, bytes).await?;
    fs::rename(&temp, &target).await?;

    Ok(target)
}
