//! Directory creation from a list of relative names.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::progress::{OperationComplete, OperationProgress, OperationType};
use crate::OperationError;

/// Check that a folder name stays under its base.
pub fn validate_folder_name(name: &str) -> Result<PathBuf, String> {
    let path = Path::new(name);
    if name.contains('\0') {
        return Err("Name cannot contain '\\0'".into());
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err("Name cannot contain '..'".into()),
            Component::RootDir | Component::Prefix(_) => {
                return Err("Name must be relative".into());
            }
        }
    }
    Ok(path.to_path_buf())
}

/// Create each named folder under `base`, including missing parents.
///
/// Names are trimmed and blank names ignored, so the lines of a text file can
/// be passed as-is. Existing folders count as created.
pub fn create_folders<I, S>(
    base: &Path,
    names: I,
    mut on_progress: impl FnMut(&OperationProgress),
) -> OperationComplete
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    let mut progress = OperationProgress::new(OperationType::CreateDirectory, names.len());

    for name in &names {
        let target = base.join(name);
        progress.set_current_file(Some(target.clone()));

        let result = validate_folder_name(name)
            .and_then(|rel| fs::create_dir_all(base.join(rel)).map_err(|e| e.to_string()));
        match result {
            Ok(()) => debug!(path = %target.display(), "created directory"),
            Err(message) => {
                warn!(path = %target.display(), "cannot create directory: {message}");
                progress.add_error(OperationError::new(target, message));
            }
        }
        progress.complete_file(0);
        on_progress(&progress);
    }

    progress.into_complete()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_folder_name() {
        assert!(validate_folder_name("Movies/Action").is_ok());
        assert!(validate_folder_name("../escape").is_err());
        assert!(validate_folder_name("a/../../b").is_err());
        assert!(validate_folder_name("/etc").is_err());
    }

    #[test]
    fn test_create_folders_skips_blanks() {
        let temp = TempDir::new().unwrap();
        let lines = "Action\n\n  Comedy/Old  \n../outside\n";

        let complete = create_folders(temp.path(), lines.lines(), |_| {});

        assert_eq!(complete.succeeded, 2);
        assert_eq!(complete.failed, 1);
        assert!(temp.path().join("Action").is_dir());
        assert!(temp.path().join("Comedy/Old").is_dir());
        assert!(!temp.path().parent().unwrap().join("outside").exists());
    }
}
