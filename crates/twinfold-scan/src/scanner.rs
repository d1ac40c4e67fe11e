//! JWalk-based fingerprint index builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use globset::GlobSet;
use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use twinfold_core::{
    CachePolicy, EngineError, FileRecord, FingerprintIndex, FingerprintMethod, MethodSet,
    ScanConfig, ScanWarning, WarningKind,
};

use crate::cache::IndexCache;
use crate::hasher::hash_file;
use crate::progress::ScanProgress;

/// Send a progress update every this many files.
const PROGRESS_INTERVAL: u64 = 100;

/// Where the index of a [`ScanReport`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexSource {
    /// Loaded from the cache; the tree was not walked.
    Cache,
    /// Built by walking the tree.
    Scan,
}

/// Outcome of [`IndexScanner::build_index`].
#[derive(Debug, Serialize)]
pub struct ScanReport {
    /// Canonical root that was indexed.
    pub root: PathBuf,
    /// The fingerprint mappings.
    pub index: FingerprintIndex,
    /// Whether the index was loaded or computed.
    pub source: IndexSource,
    /// Files visited by the walk (0 for a cache hit).
    pub files_scanned: u64,
    /// Per-file problems; each skipped the file for one method.
    pub warnings: Vec<ScanWarning>,
    /// Cache file that was read or written, if any.
    pub cache_path: Option<PathBuf>,
    /// Wall time of the call.
    pub duration: Duration,
}

impl ScanReport {
    pub fn from_cache(&self) -> bool {
        self.source == IndexSource::Cache
    }
}

/// Builds fingerprint indexes, optionally backed by the index cache.
pub struct IndexScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl IndexScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Index every file under `config.root` by the selected methods.
    ///
    /// With [`CachePolicy::TrustCache`] an existing cache is returned without
    /// walking the tree, even if files changed since it was written.
    pub fn build_index(&self, config: &ScanConfig) -> Result<ScanReport, EngineError> {
        let start = Instant::now();
        config.validate()?;
        let root = resolve_root(&config.root)?;

        if config.cache_policy == CachePolicy::TrustCache {
            if let Some(index) = IndexCache::load(&root)? {
                let cache_path = IndexCache::path(&root);
                warn!(
                    cache = %cache_path.display(),
                    "using cached index; changes made since it was written are not reflected"
                );
                return Ok(ScanReport {
                    root,
                    index,
                    source: IndexSource::Cache,
                    files_scanned: 0,
                    warnings: Vec::new(),
                    cache_path: Some(cache_path),
                    duration: start.elapsed(),
                });
            }
        }

        let matcher = config.ignore_matcher()?;
        let mut warnings = Vec::new();
        let files = collect_files(config, &root, matcher, &mut warnings);
        info!(root = %root.display(), files = files.len(), methods = %config.methods, "fingerprinting");

        let fingerprints = self.fingerprint_all(config, &files, start)?;

        // Fold in walk order so path lists are deterministic.
        let mut index = FingerprintIndex::new();
        for (record, record_warnings) in fingerprints {
            for method in config.methods.iter() {
                index.record(&record, method);
            }
            warnings.extend(record_warnings);
        }

        let mut cache_path = None;
        if config.write_cache {
            match IndexCache::store(&root, &index) {
                Ok(path) => cache_path = Some(path),
                Err(e) => {
                    warn!(error = %e, "could not write index cache");
                    warnings.push(ScanWarning::new(
                        IndexCache::path(&root),
                        e.to_string(),
                        WarningKind::CacheWriteError,
                    ));
                }
            }
        }

        Ok(ScanReport {
            root,
            index,
            source: IndexSource::Scan,
            files_scanned: files.len() as u64,
            warnings,
            cache_path,
            duration: start.elapsed(),
        })
    }

    /// Fingerprint files on the configured pool, returning results in input order.
    fn fingerprint_all(
        &self,
        config: &ScanConfig,
        files: &[PathBuf],
        start: Instant,
    ) -> Result<Vec<(FileRecord, Vec<ScanWarning>)>, EngineError> {
        let total = files.len() as u64;
        let processed = AtomicU64::new(0);
        let errors = AtomicU64::new(0);

        let work = |path: &PathBuf| {
            let result = fingerprint_file(path, &config.methods, config.hash_chunk_size);
            if !result.1.is_empty() {
                errors.fetch_add(result.1.len() as u64, Ordering::Relaxed);
            }
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_INTERVAL == 0 || done == total {
                let _ = self.progress_tx.send(ScanProgress {
                    files_processed: done,
                    files_total: total,
                    current_path: path.clone(),
                    errors_count: errors.load(Ordering::Relaxed),
                    elapsed: start.elapsed(),
                });
            }
            result
        };

        let results: Vec<(FileRecord, Vec<ScanWarning>)> = match config.threads {
            1 => files.iter().map(work).collect(),
            0 => files.par_iter().map(work).collect(),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| EngineError::config(format!("cannot start {n} threads: {e}")))?;
                pool.install(|| files.par_iter().map(work).collect())
            }
        };

        Ok(results)
    }
}

impl Default for IndexScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an index with a throwaway scanner.
pub fn build_index(config: &ScanConfig) -> Result<ScanReport, EngineError> {
    IndexScanner::new().build_index(config)
}

/// Canonicalize the root and make sure it is a directory.
fn resolve_root(root: &Path) -> Result<PathBuf, EngineError> {
    let path = root.canonicalize().map_err(|e| EngineError::io(root, e))?;
    if !path.is_dir() {
        return Err(EngineError::NotADirectory { path });
    }
    Ok(path)
}

/// Walk the tree in sorted order and collect every file-like entry.
///
/// Links to directories are not followed. Links to files and dangling links
/// are kept so the per-method failure policy applies to them.
fn collect_files(
    config: &ScanConfig,
    root: &Path,
    matcher: GlobSet,
    warnings: &mut Vec<ScanWarning>,
) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(!config.include_hidden)
        .follow_links(false)
        .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX))
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|entry| match entry {
                Ok(e) => !matcher.is_match(e.file_name()),
                Err(_) => true,
            });
        });

    let mut files = Vec::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                warn!(path = %path.display(), error = %err, "walk error");
                warnings.push(ScanWarning::new(path, err.to_string(), WarningKind::ReadError));
                continue;
            }
        };

        let path = entry.path();
        let file_type = entry.file_type();

        if let Some(err) = &entry.read_children_error {
            warnings.push(unreadable_dir_warning(path, err));
            continue;
        }

        if file_type.is_dir() {
            continue;
        }

        if entry.depth() == 1 && IndexCache::is_cache_artifact(&entry.file_name().to_string_lossy()) {
            continue;
        }

        if file_type.is_symlink() {
            match fs::metadata(&path) {
                Ok(target) if target.is_file() => files.push(path),
                Ok(_) => debug!(path = %path.display(), "skipping link to non-file"),
                Err(_) => files.push(path),
            }
        } else if file_type.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
    }

    files
}

/// Warning for a directory the walk could not list; its contents are skipped.
pub fn unreadable_dir_warning(path: PathBuf, error: &jwalk::Error) -> ScanWarning {
    let warning = match error.io_error() {
        Some(io) => ScanWarning::unreadable_dir(path, io),
        None => ScanWarning::new(path, error.to_string(), WarningKind::ReadError),
    };
    warn!(path = %warning.path.display(), "{}", warning.message);
    warning
}

/// Gather the attributes the selected methods need.
///
/// A failure only affects the methods that needed the failed read; the name
/// is always available.
fn fingerprint_file(
    path: &Path,
    methods: &MethodSet,
    chunk_size: usize,
) -> (FileRecord, Vec<ScanWarning>) {
    let mut record = FileRecord::new(path);
    let mut warnings = Vec::new();

    let metadata_methods: Vec<FingerprintMethod> = methods
        .iter()
        .filter(|m| matches!(m, FingerprintMethod::Size | FingerprintMethod::ModifiedTime))
        .collect();

    if !metadata_methods.is_empty() {
        match fs::metadata(path) {
            Ok(metadata) => {
                record.size = Some(metadata.len());
                match metadata.modified() {
                    Ok(t) => record.modified = Some(t),
                    Err(e) if methods.contains(FingerprintMethod::ModifiedTime) => {
                        warnings.push(
                            ScanWarning::new(path, e.to_string(), WarningKind::MetadataError)
                                .for_method(FingerprintMethod::ModifiedTime),
                        );
                    }
                    Err(_) => {}
                }
            }
            Err(e) => {
                for method in metadata_methods {
                    warnings.push(ScanWarning::from_io(path, &e).for_method(method));
                }
            }
        }
    }

    if methods.contains(FingerprintMethod::Hash) {
        match hash_file(path, chunk_size) {
            Ok(hash) => record.content_hash = Some(hash),
            Err(e) => {
                warnings.push(ScanWarning::from_io(path, &e).for_method(FingerprintMethod::Hash))
            }
        }
    }

    for warning in &warnings {
        warn!(path = %warning.path.display(), method = ?warning.method, "{}", warning.message);
    }

    (record, warnings)
}
