//! File system scanning engine for twinfold.
//!
//! This crate walks directory trees and produces the two inputs of the
//! analysis stage:
//!
//! - **Fingerprint index** via [`IndexScanner`]: every file keyed by content
//!   hash, size, name and/or modification time, in deterministic walk order.
//! - **Folder structure** via [`StructureMapper`]: one entry per directory
//!   listing its immediate children.
//!
//! Built indexes are persisted to `index.json` inside the scanned root by
//! [`IndexCache`] and reused on the next scan unless the config asks for a
//! rescan.
//!
//! # Example
//!
//! ```rust,no_run
//! use twinfold_scan::{IndexScanner, ScanConfig};
//! use twinfold_core::{FingerprintMethod, MethodSet};
//!
//! let config = ScanConfig::new("/path/to/scan", MethodSet::only(FingerprintMethod::Hash));
//! let report = IndexScanner::new().build_index(&config).unwrap();
//!
//! println!("{} files, {} warnings", report.files_scanned, report.warnings.len());
//! ```
//!
//! # Progress Monitoring
//!
//! Scans run on the calling thread; progress is broadcast to subscribers:
//!
//! ```rust,no_run
//! use twinfold_scan::IndexScanner;
//!
//! let scanner = IndexScanner::new();
//! let mut progress_rx = scanner.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("{:.0}%", progress.percentage());
//!     }
//! });
//! ```

mod cache;
mod hasher;
mod mapper;
mod progress;
mod scanner;

pub use cache::{CACHE_FILE_NAME, IndexCache};
pub use hasher::{hash_file, hash_reader};
pub use mapper::{MappedStructure, StructureMapper, map_structure};
pub use progress::ScanProgress;
pub use scanner::{IndexScanner, IndexSource, ScanReport, build_index, unreadable_dir_warning};

// Re-export core types for convenience
pub use twinfold_core::{
    CachePolicy, EngineError, FingerprintIndex, FingerprintMethod, FolderStructure, MethodSet,
    ScanConfig, ScanWarning, WarningKind,
};
