//! Merging one folder tree into another.
//!
//! Every file of the secondary folder is moved to the same relative location
//! under the primary folder, creating directories as needed. Once everything
//! that could be moved has moved, the secondary tree is removed bottom-up with
//! non-recursive removals, so anything left behind keeps its directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use twinfold_analyze::SimilarityGroup;
use twinfold_core::EngineError;

use crate::conflict::{Conflict, ConflictResolution, auto_rename_path};
use crate::progress::{OperationComplete, OperationProgress, OperationType};
use crate::OperationError;

/// Options for merge operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// What to do when a file already exists in the primary folder.
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
}

impl MergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conflict_resolution(mut self, resolution: ConflictResolution) -> Self {
        self.conflict_resolution = resolution;
        self
    }
}

/// One step taken (or refused) during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MergeAction {
    /// A directory was created under the primary folder.
    CreatedDir { path: PathBuf },
    /// A file was moved.
    Moved { from: PathBuf, to: PathBuf },
    /// The destination was taken and the source stayed in place.
    Skipped { source: PathBuf, existing: PathBuf },
    /// A directory of the secondary tree was removed.
    RemovedDir { path: PathBuf },
    /// An item could not be processed.
    Failed { path: PathBuf, message: String },
}

/// Everything that happened while merging one secondary folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub actions: Vec<MergeAction>,
}

impl MergeReport {
    fn new(primary: &Path, secondary: &Path) -> Self {
        Self {
            primary: primary.to_path_buf(),
            secondary: secondary.to_path_buf(),
            actions: Vec::new(),
        }
    }

    /// A merge that was refused before touching anything.
    pub fn rejected(primary: &Path, secondary: &Path, error: &EngineError) -> Self {
        let mut report = Self::new(primary, secondary);
        report.actions.push(MergeAction::Failed {
            path: secondary.to_path_buf(),
            message: error.to_string(),
        });
        report
    }

    pub fn moved_count(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Moved { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|a| matches!(a, MergeAction::Failed { .. }))
    }

    /// Whether the secondary folder itself is gone.
    pub fn secondary_removed(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, MergeAction::RemovedDir { path } if *path == self.secondary))
    }

    /// Failed items as operation errors.
    pub fn errors(&self) -> Vec<OperationError> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                MergeAction::Failed { path, message } => {
                    Some(OperationError::new(path.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Summarize as a generic operation result. Skipped files count as failed.
    pub fn to_complete(&self) -> OperationComplete {
        let errors = self.errors();
        OperationComplete {
            operation_type: OperationType::Merge,
            succeeded: self.moved_count(),
            failed: errors.len() + self.skipped_count(),
            bytes_processed: 0,
            errors,
        }
    }

    fn count(&self, f: impl Fn(&MergeAction) -> bool) -> usize {
        self.actions.iter().filter(|a| f(a)).count()
    }

    fn fail(&mut self, path: &Path, message: impl Into<String>) {
        let message = message.into();
        warn!(path = %path.display(), "{message}");
        self.actions.push(MergeAction::Failed {
            path: path.to_path_buf(),
            message,
        });
    }
}

/// Merge `secondary` into `primary`.
pub fn merge_into(
    primary: &Path,
    secondary: &Path,
    options: &MergeOptions,
) -> Result<MergeReport, EngineError> {
    merge_into_with_progress(primary, secondary, options, |_| {})
}

/// Merge `secondary` into `primary`, reporting progress once per file.
///
/// Fails up front when either folder is missing or when `primary` is
/// `secondary` or lies inside it. Afterwards every per-item problem is
/// recorded in the report and the merge carries on.
pub fn merge_into_with_progress(
    primary: &Path,
    secondary: &Path,
    options: &MergeOptions,
    mut on_progress: impl FnMut(&OperationProgress),
) -> Result<MergeReport, EngineError> {
    let primary = resolve_folder(primary)?;
    let secondary = resolve_folder(secondary)?;
    if primary == secondary {
        return Err(EngineError::config(format!(
            "cannot merge {} into itself",
            secondary.display()
        )));
    }
    if primary.starts_with(&secondary) {
        return Err(EngineError::config(format!(
            "cannot merge {} into its own subfolder {}",
            secondary.display(),
            primary.display()
        )));
    }

    let mut report = MergeReport::new(&primary, &secondary);
    let (directories, files) = collect_tree(&secondary, &mut report);
    info!(
        primary = %primary.display(),
        secondary = %secondary.display(),
        files = files.len(),
        "merging folders"
    );

    for dir in &directories {
        let Ok(rel) = dir.strip_prefix(&secondary) else {
            continue;
        };
        let target = primary.join(rel);
        if target.is_dir() {
            continue;
        }
        match fs::create_dir_all(&target) {
            Ok(()) => {
                debug!(path = %target.display(), "created directory");
                report.actions.push(MergeAction::CreatedDir { path: target });
            }
            Err(e) => report.fail(&target, format!("cannot create directory: {e}")),
        }
    }

    let mut progress = OperationProgress::new(OperationType::Merge, files.len());
    for source in &files {
        progress.set_current_file(Some(source.clone()));
        if let Some(error) = move_file(&primary, &secondary, source, options, &mut report) {
            progress.add_error(error);
        }
        progress.complete_file(0);
        on_progress(&progress);
    }

    // Deepest first; the secondary root goes last.
    for dir in directories.iter().rev().chain(std::iter::once(&secondary)) {
        match fs::remove_dir(dir) {
            Ok(()) => {
                debug!(path = %dir.display(), "removed directory");
                report.actions.push(MergeAction::RemovedDir { path: dir.clone() });
            }
            Err(e) => report.fail(dir, format!("cannot remove directory: {e}")),
        }
    }

    info!(
        moved = report.moved_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "merge finished"
    );
    Ok(report)
}

/// Merge every secondary of a similarity group into its primary, in order.
///
/// A secondary that cannot be merged at all yields a report with a single
/// failed action; the remaining secondaries are still merged.
pub fn merge_group(group: &SimilarityGroup, options: &MergeOptions) -> Vec<MergeReport> {
    let primary = group.primary();
    group
        .secondaries()
        .map(|member| {
            merge_into(primary, &member.path, options).unwrap_or_else(|e| {
                warn!(secondary = %member.path.display(), error = %e, "merge refused");
                MergeReport::rejected(primary, &member.path, &e)
            })
        })
        .collect()
}

fn resolve_folder(path: &Path) -> Result<PathBuf, EngineError> {
    let resolved = path.canonicalize().map_err(|e| EngineError::io(path, e))?;
    if !resolved.is_dir() {
        return Err(EngineError::NotADirectory { path: resolved });
    }
    Ok(resolved)
}

/// List the secondary tree before anything moves.
///
/// Directories come out parents first. Links are collected as files and never
/// followed.
fn collect_tree(secondary: &Path, report: &mut MergeReport) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let walker = WalkDir::new(secondary)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false);

    let mut directories = Vec::new();
    let mut files = Vec::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                report.fail(&path, format!("cannot read entry: {err}"));
                continue;
            }
        };
        if let Some(err) = &entry.read_children_error {
            report.fail(&entry.path(), format!("cannot read directory: {err}"));
        }
        if entry.depth() == 0 {
            continue;
        }
        if entry.file_type().is_dir() {
            directories.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }

    (directories, files)
}

/// Move one file, recording the outcome. Returns the error if it failed.
fn move_file(
    primary: &Path,
    secondary: &Path,
    source: &Path,
    options: &MergeOptions,
    report: &mut MergeReport,
) -> Option<OperationError> {
    let rel = source.strip_prefix(secondary).ok()?;
    let mut destination = primary.join(rel);

    if let Some(conflict) = Conflict::detect(source, &destination) {
        match options.conflict_resolution {
            ConflictResolution::Skip => {
                info!(
                    source = %source.display(),
                    existing = %conflict.destination.display(),
                    "{}, skipping", conflict.kind
                );
                report.actions.push(MergeAction::Skipped {
                    source: conflict.source,
                    existing: conflict.destination,
                });
                return None;
            }
            ConflictResolution::AutoRename => destination = auto_rename_path(&destination),
        }
    }

    match move_path(source, &destination) {
        Ok(()) => {
            debug!(from = %source.display(), to = %destination.display(), "moved");
            report.actions.push(MergeAction::Moved {
                from: source.to_path_buf(),
                to: destination,
            });
            None
        }
        Err(e) => {
            let message = format!("cannot move to {}: {e}", destination.display());
            report.fail(source, message.clone());
            Some(OperationError::new(source.to_path_buf(), message))
        }
    }
}

/// Rename, falling back to copy and remove across file systems.
fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_merge_moves_everything() {
        let temp = TempDir::new().unwrap();
        let primary = temp.path().join("primary");
        let secondary = temp.path().join("secondary");
        fs::create_dir_all(primary.join("Action")).unwrap();
        fs::create_dir_all(secondary.join("Action")).unwrap();
        fs::create_dir_all(secondary.join("Drama/Old")).unwrap();
        fs::write(secondary.join("Action/heat.mkv"), "heat").unwrap();
        fs::write(secondary.join("Drama/Old/casablanca.mkv"), "c").unwrap();

        let report = merge_into(&primary, &secondary, &MergeOptions::default()).unwrap();

        assert_eq!(report.moved_count(), 2);
        assert_eq!(report.failed_count(), 0);
        assert!(report.secondary_removed());
        assert!(!secondary.exists());
        assert_eq!(
            fs::read_to_string(primary.join("Action/heat.mkv")).unwrap(),
            "heat"
        );
        assert!(primary.join("Drama/Old/casablanca.mkv").is_file());
    }

    #[test]
    fn test_merge_into_itself_rejected() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("f");
        fs::create_dir_all(folder.join("inner")).unwrap();

        let err = merge_into(&folder, &folder, &MergeOptions::default()).unwrap_err();
        assert!(err.is_configuration());

        let err = merge_into(&folder.join("inner"), &folder, &MergeOptions::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(folder.join("inner").is_dir());
    }

    #[test]
    fn test_missing_secondary_rejected() {
        let temp = TempDir::new().unwrap();
        let err = merge_into(
            temp.path(),
            &temp.path().join("missing"),
            &MergeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subfolder_recorded_as_failed() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let primary = root.join("p");
        let secondary = root.join("s");
        let locked = secondary.join("locked");
        fs::create_dir_all(&primary).unwrap();
        fs::create_dir_all(&locked).unwrap();
        fs::write(secondary.join("ok.txt"), "ok").unwrap();
        fs::write(locked.join("kept.txt"), "kept").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = merge_into(&primary, &secondary, &MergeOptions::default()).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(report.moved_count(), 1);
        assert!(primary.join("ok.txt").is_file());
        assert!(report.actions.iter().any(|a| matches!(
            a,
            MergeAction::Failed { path, message }
                if *path == locked && message.starts_with("cannot read directory")
        )));
        assert!(!report.secondary_removed());
        assert!(locked.join("kept.txt").is_file());
    }

    #[test]
    fn test_progress_per_file() {
        let temp = TempDir::new().unwrap();
        let primary = temp.path().join("p");
        let secondary = temp.path().join("s");
        fs::create_dir_all(&primary).unwrap();
        fs::create_dir_all(&secondary).unwrap();
        for name in ["a", "b", "c"] {
            fs::write(secondary.join(name), name).unwrap();
        }

        let mut seen = Vec::new();
        merge_into_with_progress(&primary, &secondary, &MergeOptions::default(), |p| {
            seen.push(p.files_completed)
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
