//! Errors of a `get_params` call: fatal setup errors and aggregated per-entry failures.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::downloader::DownloadError;
use crate::verify::VerifyError;

/// Failure of one manifest entry. Other entries keep going.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("fetching file {} failed: {source}", .path.display())]
    Fetch {
        path: PathBuf,
        #[source]
        source: DownloadError,
    },
    /// Downloaded content did not verify; the file has been removed (unless
    /// followed by a `Remove` error for the same path).
    #[error("checking file {} failed: {source}", .path.display())]
    Check {
        path: PathBuf,
        #[source]
        source: VerifyError,
    },
    #[error("remove file {} failed: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The entry's task panicked or was aborted by the runtime.
    #[error("task for {name} failed: {message}")]
    Task { name: String, message: String },
}

impl EntryError {
    /// Local path the error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            EntryError::Fetch { path, .. }
            | EntryError::Check { path, .. }
            | EntryError::Remove { path, .. } => Some(path),
            EntryError::Task { .. } => None,
        }
    }
}

/// Every entry failure recorded during one call, combined into one error.
#[derive(Debug)]
pub struct Failures {
    pub errors: Vec<EntryError>,
    /// The call returned on cancellation; more failures may have followed unreported.
    pub cancelled: bool,
}

impl Failures {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryError> {
        self.errors.iter()
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parameter file(s) failed", self.errors.len())?;
        if self.cancelled {
            write!(f, " (cancelled, results incomplete)")?;
        }
        for e in &self.errors {
            write!(f, "\n  {}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failures {}

/// Error returned by `ParamFetcher::get_params`.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    /// Parameter directory could not be created. No entry was processed.
    #[error("creating parameter directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Manifest is not valid JSON of the expected shape. No entry was processed.
    #[error("parsing parameter manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    /// One or more entries failed.
    #[error(transparent)]
    Failed(#[from] Failures),
}
