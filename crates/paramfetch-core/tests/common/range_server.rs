//! Minimal HTTP/1.1 gateway that serves bodies by path and honors `Range: bytes=X-`.
//!
//! Records the path and `Range` header of every GET so tests can assert how
//! many requests were made and from which offset.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If set, the body is written in 1 KiB chunks with this pause between them.
    pub chunk_delay: Option<Duration>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            chunk_delay: None,
        }
    }
}

/// One GET the server received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub path: String,
    pub range: Option<String>,
}

pub struct RangeServer {
    /// Gateway prefix, e.g. "http://127.0.0.1:12345/ipfs/".
    pub gateway: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl RangeServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serves each `(cid, body)` at `/ipfs/<cid>`. The server runs until the process exits.
pub fn start(bodies: Vec<(&str, Vec<u8>)>) -> RangeServer {
    start_with_options(bodies, RangeServerOptions::default())
}

pub fn start_with_options(bodies: Vec<(&str, Vec<u8>)>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let bodies: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        bodies
            .into_iter()
            .map(|(cid, body)| (format!("/ipfs/{}", cid), body))
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let bodies = Arc::clone(&bodies);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &bodies, &seen, opts));
        }
    });
    RangeServer {
        gateway: format!("http://127.0.0.1:{}/ipfs/", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    bodies: &HashMap<String, Vec<u8>>,
    seen: &Mutex<Vec<SeenRequest>>,
    opts: RangeServerOptions,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path, range_header) = parse_request(request);
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    seen.lock().unwrap().push(SeenRequest {
        path: path.to_string(),
        range: range_header.map(str::to_string),
    });

    let Some(body) = bodies.get(path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nnot found");
        return;
    };
    let total = body.len() as u64;
    let start = if opts.support_ranges {
        range_header.and_then(range_start)
    } else {
        None
    };

    let (status, content_range, slice) = match start {
        Some(start) if start >= total && total > 0 => {
            let response = format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        Some(start) => (
            "206 Partial Content",
            format!(
                "bytes {}-{}/{}",
                start,
                total.saturating_sub(1),
                total
            ),
            &body[start as usize..],
        ),
        None => (
            "200 OK",
            format!("bytes 0-{}/{}", total.saturating_sub(1), total),
            &body[..],
        ),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\nConnection: close\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    match opts.chunk_delay {
        None => {
            let _ = stream.write_all(slice);
        }
        Some(delay) => {
            for chunk in slice.chunks(1024) {
                if stream.write_all(chunk).is_err() {
                    return;
                }
                thread::sleep(delay);
            }
        }
    }
}

/// Returns (method, path, raw Range header value).
fn parse_request(request: &str) -> (&str, &str, Option<&str>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value.trim());
            }
        }
    }
    (method, path, range)
}

/// Start offset of `bytes=X-` (open-ended ranges only).
fn range_start(value: &str) -> Option<u64> {
    let rest = value.strip_prefix("bytes=")?;
    let (start, end) = rest.split_once('-')?;
    if !end.trim().is_empty() {
        return None;
    }
    start.trim().parse().ok()
}
