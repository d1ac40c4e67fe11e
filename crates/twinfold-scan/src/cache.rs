//! On-disk index cache stored inside the scanned root.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use twinfold_core::{EngineError, FingerprintIndex};

/// File name of the cache inside the scanned root.
pub const CACHE_FILE_NAME: &str = "index.json";

const TEMP_PREFIX: &str = ".index.json.";
const TEMP_SUFFIX: &str = ".tmp";

/// Load, store and invalidate the index cache of a root directory.
///
/// The cache is trusted as-is: nothing checks whether the tree changed since
/// it was written.
pub struct IndexCache;

impl IndexCache {
    /// Location of the cache for a root.
    pub fn path(root: &Path) -> PathBuf {
        root.join(CACHE_FILE_NAME)
    }

    /// Whether a cache file is present.
    pub fn exists(root: &Path) -> bool {
        Self::path(root).is_file()
    }

    /// Names at the root that belong to the cache and must not be indexed.
    pub fn is_cache_artifact(name: &str) -> bool {
        name == CACHE_FILE_NAME || (name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX))
    }

    /// Read the cached index, `None` if there is no cache.
    ///
    /// A cache that exists but cannot be read or parsed is an error.
    pub fn load(root: &Path) -> Result<Option<FingerprintIndex>, EngineError> {
        let path = Self::path(root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(EngineError::CacheUnreadable { path, source }),
        };

        let index = serde_json::from_slice(&bytes)
            .map_err(|source| EngineError::CacheCorrupted { path: path.clone(), source })?;
        debug!(path = %path.display(), "loaded index cache");
        Ok(Some(index))
    }

    /// Write the index next to the data, replacing any previous cache.
    ///
    /// The document goes to a temporary file in the same directory first and
    /// is renamed over the cache, so a crash never leaves a partial cache.
    pub fn store(root: &Path, index: &FingerprintIndex) -> Result<PathBuf, EngineError> {
        let path = Self::path(root);
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(root)
            .map_err(|e| EngineError::io(root, e))?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, index)
                .map_err(|e| EngineError::io(&path, e.into()))?;
            writer.flush().map_err(|e| EngineError::io(&path, e))?;
        }
        tmp.as_file().sync_all().map_err(|e| EngineError::io(&path, e))?;
        tmp.persist(&path).map_err(|e| EngineError::io(&path, e.error))?;

        debug!(path = %path.display(), "stored index cache");
        Ok(path)
    }

    /// Remove the cache. Returns false if there was none.
    pub fn invalidate(root: &Path) -> Result<bool, EngineError> {
        let path = Self::path(root);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EngineError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use twinfold_core::FingerprintMethod;

    #[test]
    fn test_missing_cache_is_absent() {
        let temp = TempDir::new().unwrap();
        assert!(IndexCache::load(temp.path()).unwrap().is_none());
        assert!(!IndexCache::exists(temp.path()));
        assert!(!IndexCache::invalidate(temp.path()).unwrap());
    }

    #[test]
    fn test_store_then_load() {
        let temp = TempDir::new().unwrap();
        let mut index = FingerprintIndex::new();
        index.insert(FingerprintMethod::Size, "3", temp.path().join("a.txt"));

        let path = IndexCache::store(temp.path(), &index).unwrap();
        assert_eq!(path, temp.path().join(CACHE_FILE_NAME));

        let loaded = IndexCache::load(temp.path()).unwrap().unwrap();
        assert_eq!(loaded, index);

        // Only the cache itself is left behind, no temp files.
        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![CACHE_FILE_NAME.to_string()]);

        assert!(IndexCache::invalidate(temp.path()).unwrap());
        assert!(!IndexCache::exists(temp.path()));
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(IndexCache::path(temp.path()), "[{}, {\"3\": [").unwrap();

        let err = IndexCache::load(temp.path()).unwrap_err();
        assert!(matches!(err, EngineError::CacheCorrupted { .. }));
        assert!(err.is_cache());
    }

    #[test]
    fn test_cache_artifact_names() {
        assert!(IndexCache::is_cache_artifact("index.json"));
        assert!(IndexCache::is_cache_artifact(".index.json.a1B2c3.tmp"));
        assert!(!IndexCache::is_cache_artifact("index.json.bak"));
        assert!(!IndexCache::is_cache_artifact("notes.txt"));
    }
}
