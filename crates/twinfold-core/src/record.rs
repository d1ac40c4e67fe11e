//! Per-file fingerprint records.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::method::FingerprintMethod;

/// BLAKE3 content hash for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Attributes gathered for one file during a scan.
///
/// Fields that could not be read are `None`; the file is then left out of the
/// mappings for the methods that depend on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path as produced by the walk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Content digest, only computed when the hash method is selected.
    pub content_hash: Option<ContentHash>,
}

impl FileRecord {
    /// Create a record with no attributes filled in yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: None,
            modified: None,
            content_hash: None,
        }
    }

    /// Base file name of the record.
    pub fn name(&self) -> Option<String> {
        file_name_key(&self.path)
    }

    /// The index key for a method, if the attribute it needs is available.
    pub fn key(&self, method: FingerprintMethod) -> Option<String> {
        match method {
            FingerprintMethod::Hash => self.content_hash.map(|h| h.to_hex()),
            FingerprintMethod::Size => self.size.map(|s| s.to_string()),
            FingerprintMethod::Name => self.name(),
            FingerprintMethod::ModifiedTime => self.modified.map(modified_key),
        }
    }
}

fn file_name_key(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Render a modification time as decimal seconds since the Unix epoch.
///
/// Sub-second precision is kept (`1700000000.25`); whole seconds print
/// without a fractional part.
pub fn modified_key(time: SystemTime) -> String {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    };
    format!("{secs}")
}

/// Turn a modification-time key back into a readable UTC timestamp.
pub fn describe_modified_key(key: &str) -> Option<String> {
    let secs: f64 = key.parse().ok()?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let dt: DateTime<Utc> = DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))?;
    Some(dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
