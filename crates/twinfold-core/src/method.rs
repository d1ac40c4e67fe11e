//! Fingerprint method selection.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::EngineError;

/// A single attribute dimension files can be grouped by.
///
/// Variants are declared in the fixed order used everywhere a set of methods
/// is iterated: hash, size, name, modification time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(ascii_case_insensitive)]
pub enum FingerprintMethod {
    /// Digest of the full file content.
    #[strum(to_string = "hash", serialize = "content")]
    Hash,
    /// Exact byte length.
    #[strum(to_string = "size")]
    Size,
    /// Base file name.
    #[strum(to_string = "name")]
    Name,
    /// Last modification timestamp.
    #[strum(
        to_string = "modifiedTime",
        serialize = "date",
        serialize = "modified",
        serialize = "mtime"
    )]
    ModifiedTime,
}

/// An ordered, duplicate-free selection of fingerprint methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodSet(BTreeSet<FingerprintMethod>);

impl MethodSet {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select every method.
    pub fn all() -> Self {
        FingerprintMethod::iter().collect()
    }

    /// Select a single method.
    pub fn only(method: FingerprintMethod) -> Self {
        Self(BTreeSet::from([method]))
    }

    /// Add a method; returns false if it was already selected.
    pub fn insert(&mut self, method: FingerprintMethod) -> bool {
        self.0.insert(method)
    }

    pub fn contains(&self, method: FingerprintMethod) -> bool {
        self.0.contains(&method)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the selection in fixed method order.
    pub fn iter(&self) -> impl Iterator<Item = FingerprintMethod> + '_ {
        self.0.iter().copied()
    }

    /// Fail with a configuration error when nothing is selected.
    pub fn require_non_empty(&self) -> Result<(), EngineError> {
        if self.is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "at least one fingerprint method must be selected".to_string(),
            });
        }
        Ok(())
    }
}

impl FromIterator<FingerprintMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = FingerprintMethod>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<FingerprintMethod> for MethodSet {
    fn extend<I: IntoIterator<Item = FingerprintMethod>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<const N: usize> From<[FingerprintMethod; N]> for MethodSet {
    fn from(methods: [FingerprintMethod; N]) -> Self {
        methods.into_iter().collect()
    }
}

/// Parses a comma separated list, e.g. `"hash,size"`.
impl FromStr for MethodSet {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = MethodSet::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let method = part
                .parse::<FingerprintMethod>()
                .map_err(|_| EngineError::InvalidConfig {
                    message: format!("unknown fingerprint method: {part}"),
                })?;
            set.insert(method);
        }
        Ok(set)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", names.join(","))
    }
}
