//! Duplicate detection over a fingerprint index.
//!
//! Every key that more than one path shares under a method is a duplicate
//! group for that method. Groups carry the method that produced them, so a
//! size collision is never confused with a name collision that happens to use
//! the same key text.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use twinfold_core::{EngineError, FingerprintIndex, FingerprintMethod, MethodSet};

/// Paths sharing one key under one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Method whose key the paths share.
    pub method: FingerprintMethod,

    /// The shared key (hex digest, byte count, file name or timestamp).
    pub key: String,

    /// All paths with this key, in index order.
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Get the number of files in the group.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups ordered by method, then by key insertion order.
    pub groups: Vec<DuplicateGroup>,

    /// Methods that were examined.
    pub methods: MethodSet,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Total number of paths across all groups. Overlapping groups count twice.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }

    /// Groups found by one method.
    pub fn groups_for(&self, method: FingerprintMethod) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(move |g| g.method == method)
    }

    /// Flatten all groups into a single key namespace.
    ///
    /// Later methods overwrite earlier entries with an identical key while the
    /// key keeps its first position. This is the legacy single-dictionary view
    /// of the results; prefer [`DuplicateReport::groups`].
    pub fn merged(&self) -> IndexMap<String, Vec<PathBuf>> {
        let mut merged = IndexMap::new();
        for group in &self.groups {
            merged.insert(group.key.clone(), group.paths.clone());
        }
        merged
    }
}

/// Duplicate file finder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateFinder;

impl DuplicateFinder {
    /// Create a new duplicate finder.
    pub fn new() -> Self {
        Self
    }

    /// Collect every key shared by two or more paths for the given methods.
    ///
    /// Methods are visited in their fixed order. A method the index was not
    /// built with simply yields no groups.
    pub fn find_duplicates(
        &self,
        index: &FingerprintIndex,
        methods: &MethodSet,
    ) -> Result<DuplicateReport, EngineError> {
        methods.require_non_empty()?;

        let mut groups = Vec::new();
        for method in methods.iter() {
            let before = groups.len();
            groups.extend(
                index
                    .mapping(method)
                    .iter()
                    .filter(|(_, paths)| paths.len() > 1)
                    .map(|(key, paths)| DuplicateGroup {
                        method,
                        key: key.clone(),
                        paths: paths.iter().cloned().collect(),
                    }),
            );
            debug!(%method, groups = groups.len() - before, "collected duplicate groups");
        }

        Ok(DuplicateReport {
            groups,
            methods: methods.clone(),
        })
    }
}

/// Find duplicates with a default finder.
pub fn find_duplicates(
    index: &FingerprintIndex,
    methods: &MethodSet,
) -> Result<DuplicateReport, EngineError> {
    DuplicateFinder::new().find_duplicates(index, methods)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FingerprintIndex {
        let mut index = FingerprintIndex::new();
        index.insert(FingerprintMethod::Size, "3", PathBuf::from("/d/a/x.txt"));
        index.insert(FingerprintMethod::Size, "3", PathBuf::from("/d/b/x.txt"));
        index.insert(FingerprintMethod::Size, "9", PathBuf::from("/d/c.txt"));
        index.insert(FingerprintMethod::Name, "x.txt", PathBuf::from("/d/a/x.txt"));
        index.insert(FingerprintMethod::Name, "x.txt", PathBuf::from("/d/b/x.txt"));
        index.insert(FingerprintMethod::Name, "c.txt", PathBuf::from("/d/c.txt"));
        index
    }

    #[test]
    fn test_singletons_are_not_groups() {
        let report = find_duplicates(&sample_index(), &MethodSet::all()).unwrap();
        assert_eq!(report.groups.len(), 2);
        assert!(report.groups.iter().all(|g| g.count() >= 2));
        assert_eq!(report.total_duplicate_files(), 4);
    }

    #[test]
    fn test_groups_follow_method_order() {
        let report = find_duplicates(&sample_index(), &MethodSet::all()).unwrap();
        let tags: Vec<_> = report.groups.iter().map(|g| g.method).collect();
        assert_eq!(tags, vec![FingerprintMethod::Size, FingerprintMethod::Name]);
        assert_eq!(report.groups_for(FingerprintMethod::Name).count(), 1);
    }

    #[test]
    fn test_unselected_methods_ignored() {
        let report = find_duplicates(
            &sample_index(),
            &MethodSet::only(FingerprintMethod::Hash),
        )
        .unwrap();
        assert!(!report.has_duplicates());
    }

    #[test]
    fn test_empty_selection_rejected() {
        let err = find_duplicates(&sample_index(), &MethodSet::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_merged_later_method_wins() {
        let mut index = FingerprintIndex::new();
        // A file literally named "3" collides with the size key "3".
        index.insert(FingerprintMethod::Size, "3", PathBuf::from("/a"));
        index.insert(FingerprintMethod::Size, "3", PathBuf::from("/b"));
        index.insert(FingerprintMethod::Name, "3", PathBuf::from("/x/3"));
        index.insert(FingerprintMethod::Name, "3", PathBuf::from("/y/3"));

        let report = find_duplicates(&index, &MethodSet::all()).unwrap();
        assert_eq!(report.groups.len(), 2);

        let merged = report.merged();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["3"], vec![PathBuf::from("/x/3"), PathBuf::from("/y/3")]);
    }
}
