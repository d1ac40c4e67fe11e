//! File operations engine for twinfold.
//!
//! Merging similar folders is the main operation; deleting, archiving and
//! folder creation act on user selections. All operations run on the calling
//! thread, report progress through a callback and record per-item failures
//! instead of stopping.

mod archive;
mod conflict;
mod create;
mod delete;
mod merge;
mod operation;
mod progress;

pub use archive::{ARCHIVE_FILE_NAME, ArchiveReport, archive_files};
pub use conflict::{Conflict, ConflictKind, ConflictResolution, auto_rename_path};
pub use create::{create_folders, validate_folder_name};
pub use delete::delete_files;
pub use merge::{
    MergeAction, MergeOptions, MergeReport, merge_group, merge_into, merge_into_with_progress,
};
pub use operation::OperationError;
pub use progress::{OperationComplete, OperationProgress, OperationType};
