//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::EngineError;
use crate::method::{FingerprintMethod, MethodSet};

/// Default read size when streaming file content into the hasher.
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 64 * 1024;

/// What to do when an index cache already exists for the root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CachePolicy {
    /// Load the cache and skip the walk, even if the tree changed since.
    #[default]
    TrustCache,
    /// Ignore any existing cache and walk the tree.
    AlwaysRescan,
}

/// Configuration for building a fingerprint index.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Fingerprint methods to compute.
    #[builder(default = "MethodSet::only(FingerprintMethod::Hash)")]
    #[serde(default = "default_methods")]
    pub methods: MethodSet,

    /// Whether an existing index cache short-circuits the scan.
    #[builder(default)]
    #[serde(default)]
    pub cache_policy: CachePolicy,

    /// Persist the index to the root after a fresh walk.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub write_cache: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Glob patterns matched against entry names; matches are skipped.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Number of hashing threads (0 = auto-detect, 1 = hash on the caller).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Bytes read per chunk while hashing.
    #[builder(default = "DEFAULT_HASH_CHUNK_SIZE")]
    #[serde(default = "default_chunk_size")]
    pub hash_chunk_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_methods() -> MethodSet {
    MethodSet::only(FingerprintMethod::Hash)
}

fn default_chunk_size() -> usize {
    DEFAULT_HASH_CHUNK_SIZE
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if let Some(ref methods) = self.methods {
            if methods.is_empty() {
                return Err("At least one fingerprint method is required".to_string());
            }
        }
        if self.hash_chunk_size == Some(0) {
            return Err("Hash chunk size must be positive".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path with the given methods.
    pub fn new(root: impl Into<PathBuf>, methods: impl Into<MethodSet>) -> Self {
        Self {
            root: root.into(),
            methods: methods.into(),
            cache_policy: CachePolicy::TrustCache,
            write_cache: true,
            include_hidden: true,
            ignore_patterns: Vec::new(),
            max_depth: None,
            threads: 0,
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
        }
    }

    /// Re-check invariants on a config that may not have come from the builder.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.root.as_os_str().is_empty() {
            return Err(EngineError::config("no path given"));
        }
        self.methods.require_non_empty()?;
        if self.hash_chunk_size == 0 {
            return Err(EngineError::config("hash chunk size must be positive"));
        }
        Ok(())
    }

    /// Compile the ignore patterns into a matcher.
    pub fn ignore_matcher(&self) -> Result<GlobSet, EngineError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                EngineError::config(format!("bad ignore pattern {pattern:?}: {e}"))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| EngineError::config(format!("bad ignore patterns: {e}")))
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".", MethodSet::only(FingerprintMethod::Hash))
    }
}
