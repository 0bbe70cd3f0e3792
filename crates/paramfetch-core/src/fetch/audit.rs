//! Read-only status report of a parameter directory against a manifest.

use std::path::{Path, PathBuf};

use crate::manifest::{is_in_scope, Manifest};
use crate::verify::{Verifier, VerifyError};

/// Local state of one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    /// Digest matches (or cached, or trust bypass on).
    Verified,
    /// No file on disk.
    Missing,
    /// File present but digest differs (also the state of a partial download).
    Corrupt { actual: String },
    /// File present but could not be read.
    Unreadable { reason: String },
    /// `.params` file for another sector size.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    pub name: String,
    pub path: PathBuf,
    pub state: EntryState,
}

/// Check every entry of `manifest`, sorted by name. Entries are checked one
/// at a time; successful checks populate the verifier's cache.
pub(super) async fn audit(
    verifier: &Verifier,
    param_dir: &Path,
    manifest: &Manifest,
    sector_size: u64,
) -> Vec<EntryStatus> {
    let mut names: Vec<&str> = manifest.iter().map(|(n, _)| n).collect();
    names.sort_unstable();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let Some(entry) = manifest.get(name) else {
            continue;
        };
        let path = param_dir.join(name);
        let state = if !is_in_scope(name, entry, sector_size) {
            EntryState::Skipped
        } else {
            let verifier = verifier.clone();
            let p = path.clone();
            let e = entry.clone();
            let res = tokio::task::spawn_blocking(move || verifier.check(&p, &e)).await;
            match res {
                Ok(Ok(())) => EntryState::Verified,
                Ok(Err(err)) if err.is_not_found() => EntryState::Missing,
                Ok(Err(VerifyError::Mismatch { actual, .. })) => EntryState::Corrupt { actual },
                Ok(Err(err)) => EntryState::Unreadable {
                    reason: err.to_string(),
                },
                Err(join) => EntryState::Unreadable {
                    reason: join.to_string(),
                },
            }
        };
        out.push(EntryStatus {
            name: name.to_string(),
            path,
            state,
        });
    }
    out
}
