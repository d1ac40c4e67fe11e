//! Permanent file deletion.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::progress::{OperationComplete, OperationProgress, OperationType};
use crate::OperationError;

/// Remove each file for good. Directories are refused.
///
/// Every failure is recorded and the remaining files are still processed.
pub fn delete_files(
    paths: &[PathBuf],
    mut on_progress: impl FnMut(&OperationProgress),
) -> OperationComplete {
    let mut progress = OperationProgress::new(OperationType::Delete, paths.len());

    for path in paths {
        progress.set_current_file(Some(path.clone()));

        let result = match path.symlink_metadata() {
            Ok(metadata) if metadata.is_dir() => Err("is a directory".to_string()),
            Ok(metadata) => fs::remove_file(path)
                .map(|()| metadata.len())
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(bytes) => {
                debug!(path = %path.display(), "deleted");
                progress.complete_file(bytes);
            }
            Err(message) => {
                warn!(path = %path.display(), "cannot delete: {message}");
                progress.add_error(OperationError::new(path.clone(), message));
                progress.complete_file(0);
            }
        }
        on_progress(&progress);
    }

    progress.into_complete()
}
