//! Folder similarity based on shared subpaths.
//!
//! Two folders are compared by the relative directory paths their structure
//! snapshots have in common. A cheap count check runs first so that folders of
//! very different size are never scored.

use std::fs;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use twinfold_core::{EngineError, FolderStructure, ScanWarning, WarningKind};
use twinfold_scan::StructureMapper;

/// Default minimum score for two folders to be grouped.
pub const DEFAULT_THRESHOLD: f64 = 60.0;

/// Default relative tolerance of the subpath count pre-filter.
pub const DEFAULT_COUNT_TOLERANCE: f64 = 0.25;

/// Configuration for similarity grouping.
#[derive(Debug, Clone, Copy, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SimilarityConfig {
    /// Minimum percentage (0-100) for a folder to join a group.
    #[builder(default = "DEFAULT_THRESHOLD")]
    pub threshold: f64,

    /// Allowed relative difference in subpath counts.
    #[builder(default = "DEFAULT_COUNT_TOLERANCE")]
    pub count_tolerance: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            count_tolerance: DEFAULT_COUNT_TOLERANCE,
        }
    }
}

impl SimilarityConfig {
    /// Create a new config builder.
    pub fn builder() -> SimilarityConfigBuilder {
        SimilarityConfigBuilder::default()
    }
}

impl SimilarityConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(threshold) = self.threshold {
            if !(0.0..=100.0).contains(&threshold) {
                return Err(format!("threshold must be within 0-100, got {threshold}"));
            }
        }
        if let Some(tolerance) = self.count_tolerance {
            if !(tolerance >= 0.0 && tolerance.is_finite()) {
                return Err(format!("count tolerance must be non-negative, got {tolerance}"));
            }
        }
        Ok(())
    }
}

/// A folder in a similarity group and its score against the group's primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub path: PathBuf,
    pub score: f64,
}

/// A primary folder followed by every later folder similar to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityGroup {
    /// First member is the primary (score 100).
    pub members: Vec<GroupMember>,
}

impl SimilarityGroup {
    /// The folder the others were compared against.
    pub fn primary(&self) -> &Path {
        &self.members[0].path
    }

    /// Members after the primary.
    pub fn secondaries(&self) -> impl Iterator<Item = &GroupMember> {
        self.members.iter().skip(1)
    }

    /// All member paths, primary first.
    pub fn paths(&self) -> Vec<&Path> {
        self.members.iter().map(|m| m.path.as_path()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Groups plus the folders that could not be mapped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub groups: Vec<SimilarityGroup>,
    pub warnings: Vec<ScanWarning>,
}

impl SimilarityReport {
    pub fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Scores and groups folder structures.
#[derive(Debug, Clone, Default)]
pub struct SimilarityEstimator {
    config: SimilarityConfig,
    mapper: StructureMapper,
}

impl SimilarityEstimator {
    /// Create an estimator with default threshold and tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SimilarityConfig) -> Self {
        Self {
            config,
            mapper: StructureMapper::new(),
        }
    }

    /// Use a custom mapper, e.g. one with a depth limit.
    pub fn with_mapper(mut self, mapper: StructureMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Whether `b` has roughly as many subpaths as `a`.
    ///
    /// The bounds are derived from `a` only, so the check is not symmetric.
    pub fn is_count_similar(&self, a: &FolderStructure, b: &FolderStructure) -> bool {
        let base = a.len() as f64;
        let other = b.len() as f64;
        let tolerance = self.config.count_tolerance;
        (1.0 - tolerance) * base <= other && other <= (1.0 + tolerance) * base
    }

    /// Shared subpaths as a percentage of the smaller structure.
    pub fn similarity_percentage(&self, a: &FolderStructure, b: &FolderStructure) -> f64 {
        let smaller = a.len().min(b.len());
        if smaller == 0 {
            return if a.is_empty() && b.is_empty() { 100.0 } else { 0.0 };
        }
        a.common_keys(b) as f64 / smaller as f64 * 100.0
    }

    /// Group already mapped structures.
    ///
    /// Each structure opens a group that collects every later structure passing
    /// both checks. Groups may overlap; only groups with at least two members
    /// are returned.
    pub fn group_structures(&self, structures: &[FolderStructure]) -> Vec<SimilarityGroup> {
        let mut groups = Vec::new();

        for (i, primary) in structures.iter().enumerate() {
            let mut members = vec![GroupMember {
                path: primary.root().to_path_buf(),
                score: 100.0,
            }];

            for candidate in &structures[i + 1..] {
                if !self.is_count_similar(primary, candidate) {
                    continue;
                }
                let score = self.similarity_percentage(primary, candidate);
                debug!(
                    primary = %primary.root().display(),
                    candidate = %candidate.root().display(),
                    score,
                    "compared folders"
                );
                if score >= self.config.threshold {
                    members.push(GroupMember {
                        path: candidate.root().to_path_buf(),
                        score,
                    });
                }
            }

            if members.len() > 1 {
                groups.push(SimilarityGroup { members });
            }
        }

        groups
    }

    /// Map each folder and group the results.
    ///
    /// Folders are mapped in parallel but keep their input order. A folder
    /// that cannot be mapped is left out of every group.
    pub fn group_similar_folders(&self, folders: &[PathBuf]) -> SimilarityReport {
        let mapped: Vec<_> = folders
            .par_iter()
            .map(|folder| (folder, self.mapper.map(folder)))
            .collect();

        let mut structures = Vec::with_capacity(mapped.len());
        let mut warnings = Vec::new();
        for (folder, result) in mapped {
            match result {
                Ok(m) => {
                    warnings.extend(m.warnings);
                    structures.push(m.structure);
                }
                Err(e) => {
                    warn!(folder = %folder.display(), error = %e, "skipping folder");
                    warnings.push(skipped_folder(folder, &e));
                }
            }
        }

        let groups = self.group_structures(&structures);
        info!(folders = structures.len(), groups = groups.len(), "grouped similar folders");
        SimilarityReport { groups, warnings }
    }
}

fn skipped_folder(folder: &Path, error: &EngineError) -> ScanWarning {
    match error {
        EngineError::Io { source, .. } => ScanWarning::read_error(folder, source),
        EngineError::PermissionDenied { .. } => {
            ScanWarning::new(folder, error.to_string(), WarningKind::PermissionDenied)
        }
        _ => ScanWarning::new(folder, error.to_string(), WarningKind::ReadError),
    }
}

/// Immediate subdirectories of `root`, sorted by name.
///
/// Links to directories are not candidates.
pub fn candidate_folders(root: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let entries = fs::read_dir(root).map_err(|e| EngineError::io(root, e))?;
    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(root, e))?;
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => folders.push(entry.path()),
            Ok(_) => {}
            Err(e) => warn!(path = %entry.path().display(), error = %e, "cannot stat entry"),
        }
    }
    folders.sort();
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(name: &str, keys: &[&str]) -> FolderStructure {
        FolderStructure::from_subpaths(name, keys.iter().copied())
    }

    #[test]
    fn test_count_similarity_is_asymmetric() {
        let estimator = SimilarityEstimator::new();
        let ten = structure("ten", &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
        let thirteen = structure(
            "thirteen",
            &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c"],
        );

        assert!(!estimator.is_count_similar(&ten, &thirteen));
        assert!(estimator.is_count_similar(&thirteen, &ten));
    }

    #[test]
    fn test_percentage_uses_smaller_side() {
        let estimator = SimilarityEstimator::new();
        let a = structure("a", &[".", "x", "y", "z"]);
        let b = structure("b", &[".", "x"]);

        assert_eq!(estimator.similarity_percentage(&a, &b), 100.0);
        assert_eq!(estimator.similarity_percentage(&b, &a), 100.0);
        assert_eq!(estimator.similarity_percentage(&a, &a), 100.0);
    }

    #[test]
    fn test_empty_structures() {
        let estimator = SimilarityEstimator::new();
        let empty = structure("e", &[]);
        let other = structure("o", &["."]);

        assert_eq!(estimator.similarity_percentage(&empty, &empty), 100.0);
        assert_eq!(estimator.similarity_percentage(&empty, &other), 0.0);
        assert_eq!(estimator.similarity_percentage(&other, &empty), 0.0);
    }

    #[test]
    fn test_below_threshold_not_grouped() {
        let estimator = SimilarityEstimator::new();
        let a = structure("a", &[".", "p", "q", "r", "s"]);
        let b = structure("b", &[".", "p", "t", "u", "v"]);

        assert_eq!(estimator.similarity_percentage(&a, &b), 40.0);
        assert!(estimator.group_structures(&[a, b]).is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(SimilarityConfig::builder().threshold(120.0).build().is_err());
        assert!(SimilarityConfig::builder().count_tolerance(-0.1).build().is_err());

        let config = SimilarityConfig::builder().threshold(75.0).build().unwrap();
        assert_eq!(config.threshold, 75.0);
        assert_eq!(config.count_tolerance, DEFAULT_COUNT_TOLERANCE);
    }
}
