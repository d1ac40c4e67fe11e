//! Analysis algorithms for twinfold.
//!
//! This crate works on the outputs of `twinfold-scan`:
//!
//! - **Duplicate detection** - Keys shared by several files in a fingerprint index
//! - **Folder similarity** - Folders whose structures share most subpaths
//! - **Size listing** - Every file of a tree, largest first
//!
//! # Duplicate Detection
//!
//! ```rust,no_run
//! use twinfold_analyze::DuplicateFinder;
//! use twinfold_core::{FingerprintMethod, MethodSet};
//! use twinfold_scan::{ScanConfig, build_index};
//!
//! let methods = MethodSet::from([FingerprintMethod::Hash, FingerprintMethod::Size]);
//! let scan = build_index(&ScanConfig::new("/path/to/scan", methods.clone())).unwrap();
//!
//! let report = DuplicateFinder::new().find_duplicates(&scan.index, &methods).unwrap();
//! for group in &report.groups {
//!     println!("{} {}: {} files", group.method, group.key, group.count());
//! }
//! ```
//!
//! # Folder Similarity
//!
//! Each folder opens a group with every later folder that has a comparable
//! number of subpaths and shares at least the threshold percentage of them.
//! A folder can belong to several groups.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use twinfold_analyze::{SimilarityEstimator, candidate_folders};
//!
//! let folders = candidate_folders(Path::new("/media")).unwrap();
//! let report = SimilarityEstimator::new().group_similar_folders(&folders);
//!
//! for group in &report.groups {
//!     println!("{:?}", group.paths());
//! }
//! ```

mod duplicates;
mod similarity;
mod sizes;

pub use duplicates::{DuplicateFinder, DuplicateGroup, DuplicateReport, find_duplicates};
pub use similarity::{
    DEFAULT_COUNT_TOLERANCE, DEFAULT_THRESHOLD, GroupMember, SimilarityConfig,
    SimilarityConfigBuilder, SimilarityEstimator, SimilarityGroup, SimilarityReport,
    candidate_folders,
};
pub use sizes::{SizeListing, SizeUnit, SizedFile, list_files_by_size};

// Re-export core types
pub use twinfold_core::{FingerprintIndex, FingerprintMethod, FolderStructure, MethodSet};
