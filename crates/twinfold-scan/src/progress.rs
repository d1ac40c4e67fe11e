//! Scan progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information while fingerprinting files.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Files fingerprinted so far.
    pub files_processed: u64,
    /// Files found by the walk.
    pub files_total: u64,
    /// Last file that finished.
    pub current_path: PathBuf,
    /// Number of per-file failures so far.
    pub errors_count: u64,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new(files_total: u64) -> Self {
        Self {
            files_processed: 0,
            files_total,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Completion as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.files_total == 0 {
            100.0
        } else {
            self.files_processed as f64 / self.files_total as f64 * 100.0
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_processed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn is_finished(&self) -> bool {
        self.files_processed >= self.files_total
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new(0)
    }
}
