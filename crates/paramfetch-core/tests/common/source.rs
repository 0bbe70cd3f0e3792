//! In-memory `ParamSource` double: serves bodies by cid, counts calls and
//! the peak number of concurrent fetches.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use paramfetch_core::control::CancelSignal;
use paramfetch_core::downloader::{DownloadError, ParamSource};
use paramfetch_core::manifest::ParamFile;
use paramfetch_core::progress::{ProgressSink, ProgressStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub path: PathBuf,
    pub offset: u64,
}

#[derive(Default)]
pub struct ScriptedSource {
    bodies: HashMap<String, Vec<u8>>,
    /// Time spent "on the wire" per fetch.
    delay: Duration,
    /// Stop early (with `Cancelled`) when the signal fires during `delay`.
    honor_cancel: bool,
    /// Fail every fetch with this HTTP status after the delay.
    fail_with: Option<u32>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(bodies: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            bodies: bodies
                .into_iter()
                .map(|(cid, b)| (cid.to_string(), b))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration, honor_cancel: bool) -> Self {
        self.delay = delay;
        self.honor_cancel = honor_cancel;
        self
    }

    pub fn failing(mut self, status: u32) -> Self {
        self.fail_with = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn wait(&self, cancel: &CancelSignal) -> bool {
        let deadline = Instant::now() + self.delay;
        while Instant::now() < deadline {
            if self.honor_cancel && cancel.is_cancelled() {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

impl ParamSource for ScriptedSource {
    fn fetch(
        &self,
        path: &Path,
        entry: &ParamFile,
        cancel: &CancelSignal,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.fetch_inner(path, entry, cancel, progress);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl ScriptedSource {
    fn fetch_inner(
        &self,
        path: &Path,
        entry: &ParamFile,
        cancel: &CancelSignal,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        let offset = file.metadata()?.len();
        self.calls.lock().unwrap().push(Call {
            path: path.to_path_buf(),
            offset,
        });

        if !self.wait(cancel) {
            return Err(DownloadError::Cancelled);
        }
        if let Some(code) = self.fail_with {
            return Err(DownloadError::Http(code));
        }
        let Some(body) = self.bodies.get(&entry.cid) else {
            return Err(DownloadError::Http(404));
        };
        // Offset at or past the end sends nothing, as CurlSource does on a 416.
        let rest = body.get(offset as usize..).unwrap_or(&[]);
        file.write_all(rest)?;
        progress.report(&ProgressStats {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            bytes_done: offset + rest.len() as u64,
            resumed_from: offset,
            total_bytes: Some(body.len() as u64),
            elapsed_secs: self.delay.as_secs_f64(),
        });
        Ok(rest.len() as u64)
    }
}

/// Leaves a non-empty directory where the file should be: verification
/// cannot read it and `remove_file` cannot delete it.
pub struct DirectorySource;

impl ParamSource for DirectorySource {
    fn fetch(
        &self,
        path: &Path,
        _entry: &ParamFile,
        _cancel: &CancelSignal,
        _progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join("leftover"), b"x")?;
        Ok(0)
    }
}
