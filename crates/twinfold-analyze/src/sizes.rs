//! Files of a tree listed largest first.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use twinfold_core::{EngineError, ScanWarning, WarningKind};
use twinfold_scan::unreadable_dir_warning;

/// Unit for displaying file sizes, in binary multiples.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum SizeUnit {
    #[default]
    #[strum(to_string = "Bytes", serialize = "B")]
    Bytes,
    KB,
    MB,
    GB,
}

impl SizeUnit {
    /// Bytes per unit.
    pub fn divisor(self) -> u64 {
        match self {
            Self::Bytes => 1,
            Self::KB => 1024,
            Self::MB => 1024 * 1024,
            Self::GB => 1024 * 1024 * 1024,
        }
    }

    /// Render a byte count, e.g. `"1.50 MB"` or `"512 Bytes"`.
    pub fn format(self, bytes: u64) -> String {
        match self {
            Self::Bytes => format!("{bytes} Bytes"),
            unit => format!("{:.2} {unit}", bytes as f64 / unit.divisor() as f64),
        }
    }
}

/// One listed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Every file under a root with its size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeListing {
    pub root: PathBuf,
    /// Sorted by size descending; equal sizes keep walk order.
    pub files: Vec<SizedFile>,
    pub warnings: Vec<ScanWarning>,
}

impl SizeListing {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// The `n` largest files.
    pub fn top(&self, n: usize) -> &[SizedFile] {
        &self.files[..n.min(self.files.len())]
    }
}

/// List every file under `root`, largest first.
///
/// Links are not followed into directories; a link to a file reports the
/// target's size.
pub fn list_files_by_size(root: &Path) -> Result<SizeListing, EngineError> {
    let metadata = fs::metadata(root).map_err(|e| EngineError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(EngineError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false);

    let mut files = Vec::new();
    let mut warnings = Vec::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                warn!(path = %path.display(), "skipping unreadable entry: {err}");
                warnings.push(ScanWarning::new(path, err.to_string(), WarningKind::ReadError));
                continue;
            }
        };

        if let Some(err) = &entry.read_children_error {
            warnings.push(unreadable_dir_warning(entry.path(), err));
            continue;
        }

        let file_type = entry.file_type();
        if !(file_type.is_file() || file_type.is_symlink()) {
            continue;
        }

        let path = entry.path();
        match fs::metadata(&path) {
            Ok(m) if m.is_file() => files.push(SizedFile { path, size: m.len() }),
            Ok(_) => debug!(path = %path.display(), "skipping link to non-file"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read size");
                warnings.push(ScanWarning::from_io(path, &e));
            }
        }
    }

    files.sort_by(|a, b| b.size.cmp(&a.size));

    Ok(SizeListing {
        root: root.to_path_buf(),
        files,
        warnings,
    })
}
