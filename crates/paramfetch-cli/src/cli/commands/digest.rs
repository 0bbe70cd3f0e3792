//! Digest command: compute the BLAKE2b-512 digest prefix of a file.

use anyhow::{Context, Result};
use paramfetch_core::checksum;
use std::path::Path;

/// Compute and print the digest prefix of the given file.
pub async fn run_digest(path: &Path) -> Result<()> {
    let owned = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || checksum::digest_prefix_path(&owned))
        .await?
        .with_context(|| format!("hashing {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
