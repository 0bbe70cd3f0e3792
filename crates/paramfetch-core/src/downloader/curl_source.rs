//! libcurl-backed `ParamSource`: one `Range: bytes=<size>-` GET per call.

use std::cell::{Cell, RefCell};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str;
use std::time::{Duration, Instant};

use url::Url;

use super::{DownloadError, ParamSource};
use crate::control::CancelSignal;
use crate::manifest::ParamFile;
use crate::progress::{ProgressSink, ProgressStats};

/// Downloads `<gateway><cid>` with libcurl.
#[derive(Debug, Clone)]
pub struct CurlSource {
    gateway: String,
}

impl CurlSource {
    /// `gateway` is a URL prefix; the content id is appended verbatim,
    /// so it normally ends with `/`.
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
        }
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Request target for `entry`.
    pub fn url_for(&self, entry: &ParamFile) -> Result<Url, DownloadError> {
        Ok(Url::parse(&format!("{}{}", self.gateway, entry.cid))?)
    }
}

impl ParamSource for CurlSource {
    fn fetch(
        &self,
        path: &Path,
        entry: &ParamFile,
        cancel: &CancelSignal,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        tracing::info!(path = %path.display(), gateway = %self.gateway, "fetching parameter file");

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        let url = self.url_for(entry)?;
        tracing::info!(%url, offset, "GET");

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.connect_timeout(Duration::from_secs(30))?;
        // Abort if throughput drops below 1 KiB/s for 60s; no wall-clock cap,
        // parameter files can take hours.
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;
        // curl sends this as `Range: bytes=<offset>-`.
        easy.range(&format!("{}-", offset))?;
        easy.progress(true)?;

        let body = AppendState::new(&file, offset, name);
        let status = Cell::new(0u32);
        let content_length: Cell<Option<u64>> = Cell::new(None);
        let perform_result = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    parse_header_line(line.trim_end(), &status, &content_length);
                }
                true
            })?;
            transfer.write_function(|data| {
                let code = status.get();
                if !(200..300).contains(&code) {
                    // Error body: swallow it, the status is reported after perform.
                    return Ok(data.len());
                }
                Ok(body.append(data, code, content_length.get(), progress))
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            transfer.perform()
        };

        if let Err(e) = perform_result {
            if e.is_write_error() {
                if let Some(io_err) = body.take_error() {
                    return Err(DownloadError::Io(io_err));
                }
            }
            if e.is_aborted_by_callback() {
                return Err(DownloadError::Cancelled);
            }
            return Err(DownloadError::Curl(e));
        }

        let code = easy.response_code()?;
        if code == 416 && offset > 0 {
            // Nothing past the local size. Let the re-check judge the file,
            // so a full-length corrupt file gets deleted instead of stuck.
            tracing::info!(path = %path.display(), offset, "range not satisfiable, local file is complete or oversized");
            return Ok(0);
        }
        if !(200..300).contains(&code) {
            return Err(DownloadError::Http(code));
        }

        body.finish(progress);
        Ok(body.written.get())
    }
}

/// Body sink: appends chunks to the local file and reports progress.
struct AppendState<'a> {
    file: &'a File,
    offset: Cell<u64>,
    written: Cell<u64>,
    started: Cell<Option<Instant>>,
    total: Cell<Option<u64>>,
    name: String,
    error: RefCell<Option<io::Error>>,
}

impl<'a> AppendState<'a> {
    fn new(file: &'a File, offset: u64, name: String) -> Self {
        Self {
            file,
            offset: Cell::new(offset),
            written: Cell::new(0),
            started: Cell::new(None),
            total: Cell::new(None),
            name,
            error: RefCell::new(None),
        }
    }

    /// Returns the number of bytes consumed; anything short of `data.len()`
    /// makes curl abort with a write error.
    fn append(
        &self,
        data: &[u8],
        status: u32,
        content_length: Option<u64>,
        progress: &dyn ProgressSink,
    ) -> usize {
        if self.started.get().is_none() {
            self.started.set(Some(Instant::now()));
            if status == 200 && self.offset.get() > 0 {
                // Server ignored the range and is sending the whole file.
                tracing::warn!(
                    name = %self.name,
                    offset = self.offset.get(),
                    "gateway ignored Range header, restarting from zero"
                );
                if let Err(e) = self.file.set_len(0) {
                    *self.error.borrow_mut() = Some(e);
                    return 0;
                }
                self.offset.set(0);
            }
            self.total
                .set(content_length.map(|len| self.offset.get() + len));
        }

        let mut file = self.file;
        if let Err(e) = file.write_all(data) {
            *self.error.borrow_mut() = Some(e);
            return 0;
        }
        self.written.set(self.written.get() + data.len() as u64);
        progress.report(&self.stats());
        data.len()
    }

    fn finish(&self, progress: &dyn ProgressSink) {
        if self.started.get().is_none() {
            // Empty body: still tell the observer where the file stands.
            progress.report(&self.stats());
        }
    }

    fn stats(&self) -> ProgressStats {
        ProgressStats {
            name: self.name.clone(),
            bytes_done: self.offset.get() + self.written.get(),
            resumed_from: self.offset.get(),
            total_bytes: self.total.get(),
            elapsed_secs: self
                .started
                .get()
                .map(|s| s.elapsed().as_secs_f64())
                .unwrap_or(0.0),
        }
    }

    fn take_error(&self) -> Option<io::Error> {
        self.error.borrow_mut().take()
    }
}

/// Track the final response's status and `Content-Length`. A new status line
/// (after a redirect or `100 Continue`) resets what was seen before it.
fn parse_header_line(line: &str, status: &Cell<u32>, content_length: &Cell<Option<u64>>) {
    if line.starts_with("HTTP/") {
        let code = line
            .split_whitespace()
            .nth(1)
            .and_then(|c| c.parse::<u32>().ok())
            .unwrap_or(0);
        status.set(code);
        content_length.set(None);
        return;
    }
    if let Some((name, value)) = line.split_once(':') {
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length.set(value.trim().parse::<u64>().ok());
        }
    }
}
