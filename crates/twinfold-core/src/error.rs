//! Error and warning types shared by the engine crates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::method::FingerprintMethod;

/// Errors that stop an operation before or while it runs.
///
/// Per-item problems during a walk are not errors; they become
/// [`ScanWarning`]s and the walk continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or unusable input, e.g. no method selected.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Root path is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index cache exists but could not be read.
    #[error("Index cache at {path} is unreadable: {source}")]
    CacheUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index cache could not be parsed.
    #[error("Index cache at {path} is corrupt: {source}")]
    CacheCorrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing an archive failed as a whole.
    #[error("Archive error at {path}: {message}")]
    Archive { path: PathBuf, message: String },
}

impl EngineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Shorthand for [`EngineError::InvalidConfig`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Input problems reported before any work is attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::NotFound { .. } | Self::NotADirectory { .. }
        )
    }

    /// Index cache problems. These are never masked by a fresh scan.
    pub fn is_cache(&self) -> bool {
        matches!(self, Self::CacheUnreadable { .. } | Self::CacheCorrupted { .. })
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Symbolic link target does not exist.
    BrokenSymlink,
    /// Error reading file/directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// The index cache could not be written.
    CacheWriteError,
}

/// Non-fatal warning encountered during a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
    /// Method the file was skipped for, if the failure was method specific.
    pub method: Option<FingerprintMethod>,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
            method: None,
        }
    }

    /// Attach the method the file was skipped for.
    pub fn for_method(mut self, method: FingerprintMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Classify an I/O error on a path.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self {
                message: format!("Permission denied: {}", path.display()),
                path,
                kind: WarningKind::PermissionDenied,
                method: None,
            },
            std::io::ErrorKind::NotFound => Self::broken_symlink(path),
            _ => Self::read_error(path, error),
        }
    }

    /// Create a broken symlink warning.
    pub fn broken_symlink(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let target = std::fs::read_link(&path)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            message: format!("Broken symlink: {} -> {target}", path.display()),
            path,
            kind: WarningKind::BrokenSymlink,
            method: None,
        }
    }

    /// Create a warning for a directory whose entries could not be listed.
    pub fn unreadable_dir(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        Self {
            message: format!("Cannot read directory {}: {error}", path.display()),
            path,
            kind,
            method: None,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self {
            message: format!("Read error: {error}"),
            path: path.into(),
            kind: WarningKind::ReadError,
            method: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_io() {
        let err = EngineError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, EngineError::PermissionDenied { .. }));
        assert!(!err.is_configuration());

        let err = EngineError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cache_errors_classified() {
        let source = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = EngineError::CacheCorrupted {
            path: PathBuf::from("/root/index.json"),
            source,
        };
        assert!(err.is_cache());
        assert!(err.to_string().contains("corrupt"));
    }

    #[test]
    fn test_warning_for_method() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let warning = ScanWarning::from_io("/x", &io).for_method(FingerprintMethod::Hash);
        assert_eq!(warning.kind, WarningKind::ReadError);
        assert_eq!(warning.method, Some(FingerprintMethod::Hash));
        assert!(warning.message.contains("boom"));
    }
}
