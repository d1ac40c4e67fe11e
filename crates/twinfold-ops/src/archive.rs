//! Flat zip archives of selected files.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use twinfold_core::EngineError;

use crate::progress::{OperationComplete, OperationProgress, OperationType};
use crate::OperationError;

/// Default archive file name.
pub const ARCHIVE_FILE_NAME: &str = "compressed_files.zip";

/// Outcome of [`archive_files`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveReport {
    /// The archive that was written.
    pub output: PathBuf,
    /// Entry names in archive order.
    pub entries: Vec<String>,
    /// Selections replaced by a later file with the same name.
    pub replaced: Vec<PathBuf>,
    pub complete: OperationComplete,
}

/// Write the selected files into a zip archive at `output`.
///
/// Entries are stored by base name only. When two selections share a name the
/// later one is archived. Files that cannot be read are recorded and left out;
/// failing to write the archive itself is an error.
pub fn archive_files(
    paths: &[PathBuf],
    output: &Path,
    mut on_progress: impl FnMut(&OperationProgress),
) -> Result<ArchiveReport, EngineError> {
    let archive_error = |message: String| EngineError::Archive {
        path: output.to_path_buf(),
        message,
    };

    let mut progress = OperationProgress::new(OperationType::Archive, paths.len());
    let mut replaced = Vec::new();
    let mut selected: IndexMap<String, &Path> = IndexMap::new();
    for path in paths {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            progress.add_error(OperationError::new(path.clone(), "path has no file name"));
            progress.complete_file(0);
            continue;
        };
        if let Some(previous) = selected.insert(name, path.as_path()) {
            warn!(
                dropped = %previous.display(),
                kept = %path.display(),
                "archive entry name already taken, keeping the later file"
            );
            progress.add_error(OperationError::new(
                previous.to_path_buf(),
                format!("replaced by {}", path.display()),
            ));
            progress.complete_file(0);
            replaced.push(previous.to_path_buf());
        }
    }

    let file = File::create(output).map_err(|e| EngineError::io(output, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(selected.len());
    for (name, path) in selected {
        progress.set_current_file(Some(path.to_path_buf()));
        match File::open(path) {
            Ok(mut source) => {
                zip.start_file(name.as_str(), options)
                    .map_err(|e| archive_error(format!("cannot add {name}: {e}")))?;
                let bytes = io::copy(&mut source, &mut zip)
                    .map_err(|e| archive_error(format!("cannot write {name}: {e}")))?;
                debug!(path = %path.display(), bytes, "archived");
                entries.push(name);
                progress.complete_file(bytes);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read file, not archived");
                progress.add_error(OperationError::new(path.to_path_buf(), e.to_string()));
                progress.complete_file(0);
            }
        }
        on_progress(&progress);
    }

    let mut writer = zip
        .finish()
        .map_err(|e| archive_error(format!("cannot finish archive: {e}")))?;
    writer.flush().map_err(|e| EngineError::io(output, e))?;
    info!(output = %output.display(), entries = entries.len(), "archive written");

    Ok(ArchiveReport {
        output: output.to_path_buf(),
        entries,
        replaced,
        complete: progress.into_complete(),
    })
}
