//! `paramfetch fetch` – reconcile the parameter directory against a manifest.

use anyhow::{Context, Result};
use paramfetch_core::config::FetchConfig;
use paramfetch_core::progress::ProgressStats;
use paramfetch_core::{CancelSignal, FetchOutcome, ParamFetcher};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const PROGRESS_INTERVAL_MS: u64 = 500;

pub async fn run_fetch(cfg: &FetchConfig, manifest_path: &Path, sector_size: u64) -> Result<()> {
    let manifest = std::fs::read(manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;

    let cancel = CancelSignal::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(64);
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        let mut printed = false;
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.is_done()
            {
                print!("{}", progress_line(&stats));
                // A finished file keeps its line; the next one starts below it.
                if stats.is_done() {
                    println!();
                    printed = false;
                } else {
                    let _ = std::io::stdout().flush();
                    printed = true;
                }
                last_print = now;
            }
        }
        if printed {
            println!();
        }
    });

    let fetcher = ParamFetcher::new(cfg).with_progress(Arc::new(progress_tx));
    println!("Parameter directory: {}", fetcher.param_dir().display());
    let result = fetcher.get_params(&cancel, &manifest, sector_size).await;
    drop(fetcher);

    if cancel.is_cancelled() {
        // Detached tasks may still hold a progress sender.
        progress_handle.abort();
    } else {
        let _ = progress_handle.await;
    }

    match result? {
        FetchOutcome::Complete => {
            println!("All parameter files verified.");
            Ok(())
        }
        FetchOutcome::Cancelled => anyhow::bail!("cancelled before all parameter files were verified"),
    }
}

/// One redrawable status line: starts with `\r`, never contains a newline.
fn progress_line(stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let total = stats
        .total_bytes
        .map(|t| format!("{:.1}", t as f64 / 1_048_576.0))
        .unwrap_or_else(|| "?".to_string());
    let pct = stats
        .fraction()
        .map(|f| format!("{:.1}%", f * 100.0))
        .unwrap_or_else(|| "?".to_string());
    let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "\r  {}  {:.1} / {} MiB ({})  {:.2} MiB/s  ETA {}  ",
        stats.name, done_mib, total, pct, rate_mib, eta
    )
}
