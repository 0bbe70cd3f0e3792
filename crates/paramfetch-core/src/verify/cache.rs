//! Memo of parameter files already confirmed correct.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Set of file paths that passed verification.
///
/// Entries are never invalidated: a file modified on disk after it was
/// verified keeps reporting ok for the lifetime of the cache. Re-hashing
/// multi-GiB parameter files on every call is what this avoids, and the
/// staleness is accepted in exchange.
///
/// One cache belongs to one `ParamFetcher` unless shared explicitly with
/// `ParamFetcher::with_cache`.
#[derive(Debug, Default)]
pub struct VerifiedCache {
    paths: Mutex<HashSet<PathBuf>>,
}

impl VerifiedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Record `path` as verified. Returns false if it was already present.
    pub fn insert(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // A set of paths cannot be left half-updated, so a poisoned lock is still usable.
        self.paths.lock().unwrap_or_else(|e| e.into_inner())
    }
}
