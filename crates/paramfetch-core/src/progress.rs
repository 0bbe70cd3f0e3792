//! Progress reporting for parameter downloads (bytes done, ETA, rate).
//!
//! The downloader reports through a `ProgressSink`; the CLI renders the stats.
//! Consumers can compute rate = bytes_done / elapsed_secs and
//! ETA = (total_bytes - bytes_done) / rate.

/// Snapshot of download progress for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Local file name being fetched.
    pub name: String,
    /// Bytes on disk so far, including content present before this transfer.
    pub bytes_done: u64,
    /// Bytes already on disk when the transfer started (resumed prefix).
    pub resumed_from: u64,
    /// Expected final size: resumed prefix plus declared remaining length.
    /// `None` when the server sent no `Content-Length`.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the transfer started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Rate of this transfer in bytes per second, excluding the resumed prefix.
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done.saturating_sub(self.resumed_from) as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if total unknown or rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0], if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.bytes_done as f64 / total as f64).min(1.0))
    }

    pub fn is_done(&self) -> bool {
        self.total_bytes.is_some_and(|t| self.bytes_done >= t)
    }
}

/// Receives byte-level progress from a running transfer.
///
/// Called from the blocking download thread on every received chunk, so
/// implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stats: &ProgressStats);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stats: &ProgressStats) {}
}

/// Forwards stats to an async consumer. Drops updates when the channel is full.
impl ProgressSink for tokio::sync::mpsc::Sender<ProgressStats> {
    fn report(&self, stats: &ProgressStats) {
        let _ = self.try_send(stats.clone());
    }
}
