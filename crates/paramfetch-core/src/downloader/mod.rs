//! Resumable retrieval of parameter files from a content gateway.
//!
//! A `ParamSource` appends the remaining bytes of one file onto whatever
//! partial content is already on disk. It makes exactly one attempt; there is
//! no retry at this layer or above it.

mod curl_source;

pub use curl_source::CurlSource;

use crate::control::CancelSignal;
use crate::manifest::ParamFile;
use crate::progress::ProgressSink;
use std::path::Path;

/// Error from a single download attempt.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Gateway prefix plus content id did not form a valid URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// Opening, sizing or appending to the local file failed.
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
    /// Curl reported an error (connect, timeout, TLS, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// The gateway answered with a non-2xx status. Nothing was written.
    #[error("GET returned HTTP {0}")]
    Http(u32),
    /// The cancel signal fired mid-transfer. Bytes received so far stay on disk.
    #[error("transfer cancelled")]
    Cancelled,
}

/// Retrieves the content of one manifest entry into `path`.
///
/// Implementations are blocking and are run on tokio's blocking pool.
pub trait ParamSource: Send + Sync {
    /// Append the bytes of `entry` missing from `path` (creating it if absent).
    /// Returns the number of bytes appended by this call.
    fn fetch(
        &self,
        path: &Path,
        entry: &ParamFile,
        cancel: &CancelSignal,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError>;
}
