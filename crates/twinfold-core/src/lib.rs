//! Core types and traits for twinfold.
//!
//! This crate provides the data structures shared by the scanning, analysis
//! and operations crates: fingerprint methods, per-file records, the
//! fingerprint index, folder structure snapshots, configuration and errors.

mod config;
mod error;
mod index;
mod method;
mod record;
mod structure;

pub use config::{CachePolicy, DEFAULT_HASH_CHUNK_SIZE, ScanConfig, ScanConfigBuilder};
pub use error::{EngineError, ScanWarning, WarningKind};
pub use index::{FingerprintIndex, KeyMap};
pub use method::{FingerprintMethod, MethodSet};
pub use record::{ContentHash, FileRecord, describe_modified_key, modified_key};
pub use structure::{FolderEntry, FolderStructure, ROOT_KEY, relative_key};
