//! Progress reporting types for file operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::OperationError;

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum OperationType {
    Merge,
    Delete,
    Archive,
    #[strum(to_string = "Create directory")]
    CreateDirectory,
}

/// Progress information for an ongoing operation.
#[derive(Debug, Clone)]
pub struct OperationProgress {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of items completed.
    pub files_completed: usize,
    /// Total number of items to process.
    pub files_total: usize,
    /// Number of bytes processed so far.
    pub bytes_processed: u64,
    /// The item currently being processed.
    pub current_file: Option<PathBuf>,
    /// Errors encountered so far.
    pub errors: Vec<OperationError>,
}

impl OperationProgress {
    /// Create a new progress tracker for an operation.
    pub fn new(operation_type: OperationType, files_total: usize) -> Self {
        Self {
            operation_type,
            files_completed: 0,
            files_total,
            bytes_processed: 0,
            current_file: None,
            errors: Vec::new(),
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.files_total > 0 {
            (self.files_completed as f64 / self.files_total as f64) * 100.0
        } else {
            100.0
        }
    }

    /// Add an error to the progress.
    pub fn add_error(&mut self, error: OperationError) {
        self.errors.push(error);
    }

    /// Update the current item being processed.
    pub fn set_current_file(&mut self, path: Option<PathBuf>) {
        self.current_file = path;
    }

    /// Increment the completed count and add bytes.
    pub fn complete_file(&mut self, bytes: u64) {
        self.files_completed += 1;
        self.bytes_processed += bytes;
    }

    /// Turn the final progress state into a result.
    pub fn into_complete(self) -> OperationComplete {
        let failed = self.errors.len();
        OperationComplete {
            operation_type: self.operation_type,
            succeeded: self.files_completed.saturating_sub(failed),
            failed,
            bytes_processed: self.bytes_processed,
            errors: self.errors,
        }
    }
}

/// Result of a completed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of items successfully processed.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Total bytes processed.
    pub bytes_processed: u64,
    /// Errors that occurred.
    pub errors: Vec<OperationError>,
}

impl OperationComplete {
    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::Merge => "Merged",
            OperationType::Delete => "Deleted",
            OperationType::Archive => "Archived",
            OperationType::CreateDirectory => "Created",
        };

        if self.failed == 0 {
            format!("{} {} items", action, self.succeeded)
        } else {
            format!(
                "{} {} items, {} failed",
                action, self.succeeded, self.failed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_into_complete() {
        let mut progress = OperationProgress::new(OperationType::Delete, 3);
        progress.complete_file(10);
        progress.complete_file(0);
        progress.add_error(OperationError::new("/gone".into(), "not found"));
        progress.complete_file(0);

        assert_eq!(progress.percentage(), 100.0);
        let complete = progress.into_complete();
        assert_eq!(complete.succeeded, 2);
        assert_eq!(complete.failed, 1);
        assert_eq!(complete.bytes_processed, 10);
        assert_eq!(complete.summary(), "Deleted 2 items, 1 failed");
    }

    #[test]
    fn test_operation_type_display() {
        assert_eq!(OperationType::Merge.to_string(), "Merge");
        assert_eq!(OperationType::CreateDirectory.to_string(), "Create directory");
    }
}
