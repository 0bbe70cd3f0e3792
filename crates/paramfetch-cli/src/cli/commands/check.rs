//! `paramfetch check` – show the local state of every manifest entry.

use anyhow::{Context, Result};
use paramfetch_core::config::FetchConfig;
use paramfetch_core::fetch::EntryState;
use paramfetch_core::ParamFetcher;
use std::path::Path;

pub async fn run_check(cfg: &FetchConfig, manifest_path: &Path, sector_size: u64) -> Result<()> {
    let manifest = std::fs::read(manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;
    let fetcher = ParamFetcher::new(cfg);
    let statuses = fetcher.check_params(&manifest, sector_size).await?;

    if statuses.is_empty() {
        println!("Manifest has no entries.");
        return Ok(());
    }

    let mut bad = 0usize;
    println!("{:<10} {}", "STATE", "FILE");
    for s in &statuses {
        let state = match &s.state {
            EntryState::Verified => "ok".to_string(),
            EntryState::Skipped => "skipped".to_string(),
            EntryState::Missing => {
                bad += 1;
                "missing".to_string()
            }
            EntryState::Corrupt { actual } => {
                bad += 1;
                format!("corrupt ({})", actual)
            }
            EntryState::Unreadable { reason } => {
                bad += 1;
                format!("unreadable ({})", reason)
            }
        };
        println!("{:<10} {}", state, s.path.display());
    }

    if bad > 0 {
        anyhow::bail!("{} of {} parameter file(s) need fetching", bad, statuses.len());
    }
    Ok(())
}
