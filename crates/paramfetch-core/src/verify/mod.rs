//! Integrity check of a local parameter file against its manifest entry.

mod cache;

pub use cache::VerifiedCache;

use crate::checksum;
use crate::manifest::ParamFile;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Why a file did not verify.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Opening or reading the file failed (including "does not exist").
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file was read in full but its digest prefix differs.
    #[error("checksum mismatch in param file {}, {actual} != {expected}", .path.display())]
    Mismatch {
        path: PathBuf,
        actual: String,
        expected: String,
    },
}

impl VerifyError {
    /// True when the file is simply absent (the expected case before a first fetch).
    pub fn is_not_found(&self) -> bool {
        matches!(self, VerifyError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Checks files against manifest digests, memoizing successes in a shared cache.
///
/// Cheap to clone; clones share the cache.
#[derive(Debug, Clone)]
pub struct Verifier {
    cache: Arc<VerifiedCache>,
    trust_params: bool,
}

impl Verifier {
    /// `trust_params` disables all checking. Never enable it in production.
    pub fn new(cache: Arc<VerifiedCache>, trust_params: bool) -> Self {
        Self {
            cache,
            trust_params,
        }
    }

    pub fn cache(&self) -> &Arc<VerifiedCache> {
        &self.cache
    }

    /// Verify `path` against `entry.digest`. Blocking: hashes the whole file
    /// unless trust bypass is on or the path is already cached.
    pub fn check(&self, path: &Path, entry: &ParamFile) -> Result<(), VerifyError> {
        if self.trust_params {
            tracing::warn!("Assuming parameter files are ok. DO NOT USE IN PRODUCTION");
            return Ok(());
        }

        if self.cache.contains(path) {
            return Ok(());
        }

        let actual = checksum::digest_prefix_path(path).map_err(|source| VerifyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if actual == entry.digest {
            tracing::info!(path = %path.display(), "parameter file is ok");
            self.cache.insert(path);
            return Ok(());
        }

        Err(VerifyError::Mismatch {
            path: path.to_path_buf(),
            actual,
            expected: entry.digest.clone(),
        })
    }
}
