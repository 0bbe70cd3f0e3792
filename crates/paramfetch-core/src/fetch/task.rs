//! Reconciliation of one manifest entry: verify, else fetch under the gate and re-verify.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::control::CancelSignal;
use crate::downloader::{DownloadError, ParamSource};
use crate::manifest::ParamFile;
use crate::progress::ProgressSink;
use crate::verify::{Verifier, VerifyError};

use super::error::EntryError;

/// Shared by every task of one `get_params` call.
pub(super) struct TaskContext {
    pub(super) verifier: Verifier,
    pub(super) source: Arc<dyn ParamSource>,
    pub(super) progress: Arc<dyn ProgressSink>,
    /// One permit: at most one transfer in flight across all tasks.
    pub(super) gate: Arc<tokio::sync::Mutex<()>>,
    pub(super) errors: Arc<Mutex<Vec<EntryError>>>,
    pub(super) cancel: CancelSignal,
}

impl TaskContext {
    /// Callers hold the download gate, so recording is serialized with transfers.
    /// The inner lock only lets the orchestrator snapshot without the gate.
    pub(super) fn record(&self, err: EntryError) {
        tracing::warn!(error = %err, "parameter file failed");
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(err);
    }
}

pub(super) struct FetchTask {
    pub(super) path: PathBuf,
    pub(super) entry: ParamFile,
}

impl FetchTask {
    pub(super) async fn run(self, ctx: Arc<TaskContext>) {
        match self.check(&ctx.verifier).await {
            Ok(()) => return,
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                // Unreadable or stale content is treated as "needs fetch", not as a failure.
                tracing::warn!(path = %self.path.display(), error = %e, "pre-fetch check failed, fetching");
            }
        }

        let _gate = ctx.gate.lock().await;

        if let Err(source) = self.fetch(&ctx).await {
            ctx.record(EntryError::Fetch {
                path: self.path.clone(),
                source,
            });
            return;
        }

        if let Err(source) = self.check(&ctx.verifier).await {
            ctx.record(EntryError::Check {
                path: self.path.clone(),
                source,
            });
            if let Err(source) = std::fs::remove_file(&self.path) {
                ctx.record(EntryError::Remove {
                    path: self.path.clone(),
                    source,
                });
            }
        }
    }

    async fn check(&self, verifier: &Verifier) -> Result<(), VerifyError> {
        let verifier = verifier.clone();
        let path = self.path.clone();
        let entry = self.entry.clone();
        tokio::task::spawn_blocking(move || verifier.check(&path, &entry))
            .await
            .unwrap_or_else(|e| {
                Err(VerifyError::Io {
                    path: self.path.clone(),
                    source: io::Error::other(e.to_string()),
                })
            })
    }

    async fn fetch(&self, ctx: &TaskContext) -> Result<u64, DownloadError> {
        let source = Arc::clone(&ctx.source);
        let progress = Arc::clone(&ctx.progress);
        let cancel = ctx.cancel.clone();
        let path = self.path.clone();
        let entry = self.entry.clone();
        tokio::task::spawn_blocking(move || {
            source.fetch(&path, &entry, &cancel, progress.as_ref())
        })
        .await
        .unwrap_or_else(|e| Err(DownloadError::Io(io::Error::other(e.to_string()))))
    }
}
