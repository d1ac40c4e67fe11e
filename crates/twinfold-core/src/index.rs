//! Fingerprint index: key to path mappings, one per method.

use std::path::{Path, PathBuf};

use indexmap::set::Slice;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::method::FingerprintMethod;
use crate::record::FileRecord;

/// Key to ordered path set. Keys and paths keep first-insertion order.
pub type KeyMap = IndexMap<String, IndexSet<PathBuf>>;

/// Four independent mappings produced by one scan.
///
/// Serializes as the array `[byHash, bySize, byName, byModifiedTime]`, the
/// layout of the on-disk index cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexDocument", into = "IndexDocument")]
pub struct FingerprintIndex {
    by_hash: KeyMap,
    by_size: KeyMap,
    by_name: KeyMap,
    by_modified: KeyMap,
}

#[derive(Serialize, Deserialize)]
struct IndexDocument(KeyMap, KeyMap, KeyMap, KeyMap);

impl From<IndexDocument> for FingerprintIndex {
    fn from(doc: IndexDocument) -> Self {
        Self {
            by_hash: doc.0,
            by_size: doc.1,
            by_name: doc.2,
            by_modified: doc.3,
        }
    }
}

impl From<FingerprintIndex> for IndexDocument {
    fn from(index: FingerprintIndex) -> Self {
        Self(
            index.by_hash,
            index.by_size,
            index.by_name,
            index.by_modified,
        )
    }
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mapping for one method.
    pub fn mapping(&self, method: FingerprintMethod) -> &KeyMap {
        match method {
            FingerprintMethod::Hash => &self.by_hash,
            FingerprintMethod::Size => &self.by_size,
            FingerprintMethod::Name => &self.by_name,
            FingerprintMethod::ModifiedTime => &self.by_modified,
        }
    }

    fn mapping_mut(&mut self, method: FingerprintMethod) -> &mut KeyMap {
        match method {
            FingerprintMethod::Hash => &mut self.by_hash,
            FingerprintMethod::Size => &mut self.by_size,
            FingerprintMethod::Name => &mut self.by_name,
            FingerprintMethod::ModifiedTime => &mut self.by_modified,
        }
    }

    /// Append a path under a key. Returns false if the path was already
    /// listed under that key.
    pub fn insert(
        &mut self,
        method: FingerprintMethod,
        key: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> bool {
        self.mapping_mut(method)
            .entry(key.into())
            .or_default()
            .insert(path.into())
    }

    /// Record every available key of a file for the given method.
    ///
    /// Returns false when the record lacks the attribute for that method.
    pub fn record(&mut self, record: &FileRecord, method: FingerprintMethod) -> bool {
        match record.key(method) {
            Some(key) => {
                self.insert(method, key, record.path.clone());
                true
            }
            None => false,
        }
    }

    /// Paths stored under a key.
    pub fn paths(&self, method: FingerprintMethod, key: &str) -> Option<&Slice<PathBuf>> {
        self.mapping(method).get(key).map(IndexSet::as_slice)
    }

    /// Whether a path is listed anywhere in a method's mapping.
    pub fn contains_path(&self, method: FingerprintMethod, path: &Path) -> bool {
        self.mapping(method)
            .values()
            .any(|paths| paths.contains(path))
    }

    /// Number of distinct keys for a method.
    pub fn key_count(&self, method: FingerprintMethod) -> usize {
        self.mapping(method).len()
    }

    /// Number of paths recorded for a method.
    pub fn path_count(&self, method: FingerprintMethod) -> usize {
        self.mapping(method).values().map(IndexSet::len).sum()
    }

    /// True when no method has any entry.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
            && self.by_size.is_empty()
            && self.by_name.is_empty()
            && self.by_modified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order_and_uniqueness() {
        let mut index = FingerprintIndex::new();
        assert!(index.insert(FingerprintMethod::Name, "x.txt", "/a/x.txt"));
        assert!(index.insert(FingerprintMethod::Name, "x.txt", "/b/x.txt"));
        assert!(!index.insert(FingerprintMethod::Name, "x.txt", "/a/x.txt"));

        let paths = index.paths(FingerprintMethod::Name, "x.txt").unwrap();
        assert_eq!(paths, &[PathBuf::from("/a/x.txt"), PathBuf::from("/b/x.txt")]);
        assert_eq!(index.path_count(FingerprintMethod::Name), 2);
        assert_eq!(index.key_count(FingerprintMethod::Hash), 0);
    }

    #[test]
    fn test_many_paths_under_one_key() {
        let mut index = FingerprintIndex::new();
        for i in 0..20_000 {
            assert!(index.insert(FingerprintMethod::Name, "index.js", format!("/p{i}/index.js")));
        }
        assert!(!index.insert(FingerprintMethod::Name, "index.js", "/p7/index.js"));

        let paths = index.paths(FingerprintMethod::Name, "index.js").unwrap();
        assert_eq!(paths.len(), 20_000);
        assert_eq!(paths[7], PathBuf::from("/p7/index.js"));
        assert_eq!(paths[19_999], PathBuf::from("/p19999/index.js"));
    }

    #[test]
    fn test_serializes_as_four_element_array() {
        let mut index = FingerprintIndex::new();
        index.insert(FingerprintMethod::Size, "3", "/a/x.txt");
        index.insert(FingerprintMethod::ModifiedTime, "1700000000.5", "/a/x.txt");

        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(
            json,
            r#"[{},{"3":["/a/x.txt"]},{},{"1700000000.5":["/a/x.txt"]}]"#
        );

        let back: FingerprintIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        assert!(serde_json::from_str::<FingerprintIndex>(r#"[{},{}]"#).is_err());
        assert!(serde_json::from_str::<FingerprintIndex>(r#"{"by_hash":{}}"#).is_err());
    }
}
