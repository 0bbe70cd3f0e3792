//! Fetch orchestrator: reconcile a parameter directory against a manifest.
//!
//! One tokio task per in-scope entry, no bound on how many run at once.
//! Verification happens in parallel on the blocking pool; transfers are
//! serialized through a single-permit gate owned by the `ParamFetcher`.
//! Entry failures are collected and returned as one combined error.

mod audit;
mod error;
mod task;

pub use audit::{EntryState, EntryStatus};
pub use error::{EntryError, Failures, ParamsError};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::FetchConfig;
use crate::control::{CancelMode, CancelSignal};
use crate::downloader::{CurlSource, ParamSource};
use crate::manifest::Manifest;
use crate::progress::{NoProgress, ProgressSink};
use crate::verify::{VerifiedCache, Verifier};

use task::{FetchTask, TaskContext};

/// How a `get_params` call ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Every in-scope entry verified (possibly after a fetch); skipped entries count as success.
    Complete,
    /// Returned on cancellation with no failure recorded yet. Detached tasks
    /// may still fail later; that is not reported.
    Cancelled,
}

/// Ensures the parameter files named by a manifest exist and are byte-correct.
pub struct ParamFetcher {
    param_dir: PathBuf,
    cancel_mode: CancelMode,
    trust_params: bool,
    verifier: Verifier,
    source: Arc<dyn ParamSource>,
    progress: Arc<dyn ProgressSink>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl ParamFetcher {
    /// Fetcher downloading from `config.gateway` with curl, with its own
    /// verification cache and download gate.
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            param_dir: config.param_dir.clone(),
            cancel_mode: config.cancel_mode,
            trust_params: config.trust_params,
            verifier: Verifier::new(Arc::new(VerifiedCache::new()), config.trust_params),
            source: Arc::new(CurlSource::new(config.gateway.clone())),
            progress: Arc::new(NoProgress),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Replace the download backend.
    pub fn with_source(mut self, source: Arc<dyn ParamSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Share a verification cache with other fetchers.
    pub fn with_cache(mut self, cache: Arc<VerifiedCache>) -> Self {
        self.verifier = Verifier::new(cache, self.trust_params);
        self
    }

    pub fn param_dir(&self) -> &Path {
        &self.param_dir
    }

    pub fn cache(&self) -> &Arc<VerifiedCache> {
        self.verifier.cache()
    }

    /// Make sure every in-scope entry of `manifest_bytes` is present and verified
    /// in the parameter directory, fetching what is missing or corrupt.
    ///
    /// `.params` entries whose `sector_size` differs from `sector_size` are
    /// skipped; every other entry is processed. Directory creation and manifest
    /// parsing errors are returned before any entry is touched.
    ///
    /// `cancel` is only observed while waiting for tasks (and by in-flight
    /// transfers); see `CancelMode` for what happens to tasks still running.
    pub async fn get_params(
        &self,
        cancel: &CancelSignal,
        manifest_bytes: &[u8],
        sector_size: u64,
    ) -> Result<FetchOutcome, ParamsError> {
        std::fs::create_dir_all(&self.param_dir).map_err(|source| ParamsError::CreateDir {
            path: self.param_dir.clone(),
            source,
        })?;

        let manifest = Manifest::parse(manifest_bytes)?;

        let errors: Arc<Mutex<Vec<EntryError>>> = Arc::new(Mutex::new(Vec::new()));
        let ctx = Arc::new(TaskContext {
            verifier: self.verifier.clone(),
            source: Arc::clone(&self.source),
            progress: Arc::clone(&self.progress),
            gate: Arc::clone(&self.gate),
            errors: Arc::clone(&errors),
            cancel: cancel.clone(),
        });

        let mut handles = Vec::new();
        for (name, entry) in manifest.in_scope(sector_size) {
            let task = FetchTask {
                path: self.param_dir.join(name),
                entry: entry.clone(),
            };
            handles.push((name.to_string(), tokio::spawn(task.run(Arc::clone(&ctx)))));
        }
        tracing::debug!(
            spawned = handles.len(),
            skipped = manifest.len() - handles.len(),
            sector_size,
            "reconciling parameter files"
        );

        let wait_all = {
            let ctx = Arc::clone(&ctx);
            async move {
                for (name, handle) in handles {
                    if let Err(e) = handle.await {
                        ctx.record(EntryError::Task {
                            name,
                            message: e.to_string(),
                        });
                    }
                }
            }
        };

        let cancelled = match self.cancel_mode {
            CancelMode::Detach => {
                tokio::select! {
                    biased;
                    _ = wait_all => {
                        tracing::info!("parameter and key-fetching complete");
                        false
                    }
                    _ = cancel.cancelled() => {
                        // Dropping the join handles detaches the tasks; they are not aborted.
                        tracing::info!("context closed... shutting down");
                        true
                    }
                }
            }
            CancelMode::Drain => {
                wait_all.await;
                let cancelled = cancel.is_cancelled();
                if cancelled {
                    tracing::info!("cancelled; in-flight tasks drained");
                } else {
                    tracing::info!("parameter and key-fetching complete");
                }
                cancelled
            }
        };

        let errors = std::mem::take(&mut *errors.lock().unwrap_or_else(|e| e.into_inner()));
        if errors.is_empty() {
            return Ok(if cancelled {
                FetchOutcome::Cancelled
            } else {
                FetchOutcome::Complete
            });
        }
        Err(ParamsError::Failed(Failures { errors, cancelled }))
    }

    /// Verification-only pass over every manifest entry: no network, no deletion.
    pub async fn check_params(
        &self,
        manifest_bytes: &[u8],
        sector_size: u64,
    ) -> Result<Vec<EntryStatus>, ParamsError> {
        let manifest = Manifest::parse(manifest_bytes)?;
        Ok(audit::audit(&self.verifier, &self.param_dir, &manifest, sector_size).await)
    }
}
