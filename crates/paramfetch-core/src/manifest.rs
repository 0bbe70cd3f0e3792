//! Parameter manifest: file name -> remote content id, digest prefix, sector size.
//!
//! The manifest is a JSON object whose keys are local file names and whose
//! values describe where the content lives on the gateway and what it must
//! hash to. It is parsed once per fetch and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Suffix of bulk parameter files. Only these are filtered by sector size;
/// verifying keys and other auxiliary files are always in scope.
pub const PARAMS_SUFFIX: &str = ".params";

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamFile {
    /// Content id, appended to the gateway prefix to form the request URL.
    pub cid: String,
    /// Hex of the first 16 bytes of the BLAKE2b-512 digest of the full file.
    pub digest: String,
    /// Size class tag. Used for filtering only, never checked against file length.
    pub sector_size: u64,
}

/// Parsed manifest, keyed by local file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: HashMap<String, ParamFile>,
}

impl Manifest {
    /// Parse manifest JSON.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParamFile> {
        self.entries.get(name)
    }

    /// All entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamFile)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries that should be reconciled for `sector_size`.
    pub fn in_scope(&self, sector_size: u64) -> impl Iterator<Item = (&str, &ParamFile)> {
        self.iter()
            .filter(move |(name, entry)| is_in_scope(name, entry, sector_size))
    }
}

impl FromIterator<(String, ParamFile)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, ParamFile)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// False only for a `.params` file whose size class differs from `sector_size`.
pub fn is_in_scope(name: &str, entry: &ParamFile, sector_size: u64) -> bool {
    !(name.ends_with(PARAMS_SUFFIX) && entry.sector_size != sector_size)
}
