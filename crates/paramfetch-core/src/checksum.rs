//! Digest prefix used to check parameter files: BLAKE2b-512 over the full
//! content, truncated to the first 16 bytes and hex encoded.

use blake2::{Blake2b512, Digest};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Number of digest bytes kept before hex encoding.
pub const DIGEST_PREFIX_BYTES: usize = 16;

/// Compute the digest prefix of a file as lowercase hex.
/// Reads in chunks to keep memory use bounded; parameter files can be tens of GiB.
pub fn digest_prefix_path(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Blake2b512::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match f.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(encode_prefix(&hasher.finalize()))
}

/// Digest prefix of an in-memory buffer.
pub fn digest_prefix(data: &[u8]) -> String {
    encode_prefix(&Blake2b512::digest(data))
}

fn encode_prefix(sum: &[u8]) -> String {
    hex::encode(&sum[..DIGEST_PREFIX_BYTES])
}
