//! Conflict detection and resolution for merges.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A destination that is already taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// The item being moved.
    pub source: PathBuf,
    /// The existing item at the destination.
    pub destination: PathBuf,
    pub kind: ConflictKind,
}

impl Conflict {
    /// Classify what occupies `destination`, or `None` if it is free.
    ///
    /// Dangling links count as occupied.
    pub fn detect(source: &Path, destination: &Path) -> Option<Self> {
        let metadata = destination.symlink_metadata().ok()?;
        let kind = if metadata.is_dir() {
            ConflictKind::DirectoryExists
        } else {
            ConflictKind::FileExists
        };
        Some(Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            kind,
        })
    }
}

/// The kind of conflict encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    #[strum(to_string = "File already exists")]
    FileExists,
    /// A directory already exists where a file should go.
    #[strum(to_string = "Directory already exists")]
    DirectoryExists,
}

/// How to resolve a conflict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ConflictResolution {
    /// Leave the source where it is.
    #[default]
    Skip,
    /// Move the source next to the existing item as "name (1).ext".
    AutoRename,
}

/// Generate an auto-renamed path to avoid conflicts.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc.
pub fn auto_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let candidate = |suffix: String| match &extension {
        Some(ext) => parent.join(format!("{stem} {suffix}.{ext}")),
        None => parent.join(format!("{stem} {suffix}")),
    };

    for i in 1..1000 {
        let new_path = candidate(format!("({i})"));
        if new_path.symlink_metadata().is_err() {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    candidate(format!("({timestamp})"))
}
