//! Folder structure snapshots used for similarity comparison.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Key of the scanned directory itself.
pub const ROOT_KEY: &str = ".";

/// Immediate children of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Child directory names, sorted.
    pub directories: BTreeSet<String>,
    /// Child file names, sorted.
    pub files: BTreeSet<String>,
}

/// One-level-per-node description of a directory tree.
///
/// Keys are paths relative to the scanned root joined with `/`, with
/// [`ROOT_KEY`] for the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderStructure {
    root: PathBuf,
    entries: BTreeMap<String, FolderEntry>,
}

impl FolderStructure {
    /// Create an empty structure for a root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build a structure that only carries subpath keys, with no children.
    pub fn from_subpaths<I, S>(root: impl Into<PathBuf>, subpaths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut structure = Self::new(root);
        for key in subpaths {
            structure.entries.entry(key.into()).or_default();
        }
        structure
    }

    /// The directory this snapshot describes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of subpath entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subpath identifiers in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FolderEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FolderEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Register a visited directory. Idempotent.
    pub fn add_node(&mut self, key: impl Into<String>) -> &mut FolderEntry {
        self.entries.entry(key.into()).or_default()
    }

    /// Record a child directory name under a node.
    pub fn add_directory(&mut self, parent: &str, name: impl Into<String>) {
        self.add_node(parent).directories.insert(name.into());
    }

    /// Record a child file name under a node.
    pub fn add_file(&mut self, parent: &str, name: impl Into<String>) {
        self.add_node(parent).files.insert(name.into());
    }

    /// Number of subpath keys present in both structures.
    pub fn common_keys(&self, other: &FolderStructure) -> usize {
        self.entries
            .keys()
            .filter(|k| other.entries.contains_key(*k))
            .count()
    }

    /// Total file names across all nodes.
    pub fn file_count(&self) -> usize {
        self.entries.values().map(|e| e.files.len()).sum()
    }
}

/// Compute the structure key of `path` relative to `root`.
///
/// Returns `None` when `path` is not inside `root`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        Some(ROOT_KEY.to_string())
    } else {
        Some(parts.join("/"))
    }
}
