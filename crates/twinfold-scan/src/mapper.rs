//! Folder structure mapping.

use std::fs;
use std::path::Path;

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, warn};

use twinfold_core::{
    EngineError, FolderStructure, ROOT_KEY, ScanWarning, WarningKind, relative_key,
};

use crate::scanner::unreadable_dir_warning;

/// A mapped structure plus the entries that could not be read.
#[derive(Debug, Clone)]
pub struct MappedStructure {
    pub structure: FolderStructure,
    pub warnings: Vec<ScanWarning>,
}

/// Builds [`FolderStructure`] snapshots.
///
/// Symbolic links are listed but never followed, which keeps link cycles from
/// recursing. `max_depth` bounds the walk further.
#[derive(Debug, Clone, Default)]
pub struct StructureMapper {
    max_depth: Option<usize>,
}

impl StructureMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop descending below this many levels under the mapped folder.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Map the tree at `path`.
    pub fn map(&self, path: &Path) -> Result<MappedStructure, EngineError> {
        let metadata = fs::metadata(path).map_err(|e| EngineError::io(path, e))?;
        if !metadata.is_dir() {
            return Err(EngineError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let max_depth = self.max_depth.unwrap_or(usize::MAX);
        let walker = WalkDir::new(path)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(false)
            .follow_links(false)
            .max_depth(max_depth);

        let mut structure = FolderStructure::new(path);
        let mut warnings = Vec::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let err_path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warn!(path = %err_path.display(), "skipping unreadable entry: {err}");
                    warnings.push(ScanWarning::new(err_path, err.to_string(), WarningKind::ReadError));
                    continue;
                }
            };

            if entry.depth() == 0 {
                structure.add_node(ROOT_KEY);
                if let Some(err) = &entry.read_children_error {
                    warnings.push(unreadable_dir_warning(entry.path(), err));
                }
                continue;
            }

            let Some(parent_key) = relative_key(path, &entry.parent_path()) else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                structure.add_directory(&parent_key, name);
                if let Some(err) = &entry.read_children_error {
                    warnings.push(unreadable_dir_warning(entry.path(), err));
                    continue;
                }
                // Directories at the depth limit are listed but not read.
                if entry.depth() < max_depth {
                    if let Some(key) = relative_key(path, &entry.path()) {
                        structure.add_node(key);
                    }
                }
            } else if file_type.is_symlink() && entry.path().is_dir() {
                debug!(path = %entry.path().display(), "not following directory link");
                structure.add_directory(&parent_key, name);
            } else {
                structure.add_file(&parent_key, name);
            }
        }

        Ok(MappedStructure {
            structure,
            warnings,
        })
    }
}

/// Map the tree at `path` with default settings.
pub fn map_structure(path: &Path) -> Result<FolderStructure, EngineError> {
    StructureMapper::new().map(path).map(|m| m.structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_map_one_level_per_node() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("Action/2019")).unwrap();
        fs::create_dir(root.join("Drama")).unwrap();
        fs::write(root.join("Action/heat.mkv"), "").unwrap();
        fs::write(root.join("readme.txt"), "").unwrap();

        let s = map_structure(root).unwrap();
        let keys: Vec<_> = s.keys().collect();
        assert_eq!(keys, vec![".", "Action", "Action/2019", "Drama"]);

        let top = s.get(ROOT_KEY).unwrap();
        assert_eq!(top.directories.iter().collect::<Vec<_>>(), vec!["Action", "Drama"]);
        assert_eq!(top.files.iter().collect::<Vec<_>>(), vec!["readme.txt"]);

        let action = s.get("Action").unwrap();
        assert!(action.directories.contains("2019"));
        assert!(action.files.contains("heat.mkv"));
        // Nested content is not repeated at the root.
        assert!(!top.files.contains("heat.mkv"));
    }

    #[test]
    fn test_max_depth_bounds_walk() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a/b/c")).unwrap();

        let mapped = StructureMapper::new()
            .with_max_depth(1)
            .map(temp.path())
            .unwrap();
        let keys: Vec<_> = mapped.structure.keys().collect();
        assert_eq!(keys, vec!["."]);
        assert!(mapped.structure.get(".").unwrap().directories.contains("a"));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("inner")).unwrap();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("inner/loop")).unwrap();

        let s = map_structure(temp.path()).unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.get("inner").unwrap().directories.contains("loop"));
        assert!(!s.contains("inner/loop"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subfolder_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("open/inside")).unwrap();
        let locked = temp.path().join("locked");
        fs::create_dir_all(locked.join("hidden")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Permission bits do not apply to this user.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mapped = StructureMapper::new().map(temp.path()).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let s = &mapped.structure;
        assert!(s.contains("open/inside"));
        assert!(s.get(ROOT_KEY).unwrap().directories.contains("locked"));
        assert!(!s.contains("locked"));
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.warnings[0].path, locked);
        assert_eq!(mapped.warnings[0].kind, WarningKind::PermissionDenied);
    }

    #[test]
    fn test_missing_folder() {
        let temp = TempDir::new().unwrap();
        let err = map_structure(&temp.path().join("missing")).unwrap_err();
        assert!(err.is_configuration());
    }
}
