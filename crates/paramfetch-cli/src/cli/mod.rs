//! CLI for fetching and verifying proof parameter files.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use paramfetch_core::config::{self, FetchConfig};
use std::path::PathBuf;

use commands::{run_check, run_digest, run_fetch};

/// Top-level CLI for paramfetch.
#[derive(Debug, Parser)]
#[command(name = "paramfetch")]
#[command(about = "Fetch and verify content-addressed proof parameter files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Make sure every file in a manifest is present and verified, downloading what is missing.
    Fetch {
        /// Path to the JSON parameter manifest.
        manifest: PathBuf,
        /// Sector size whose `.params` files are needed; other sizes are skipped.
        #[arg(long, value_name = "BYTES")]
        sector_size: u64,
        /// Parameter directory (overrides config and FIL_PROOFS_PARAMETER_CACHE).
        #[arg(long, value_name = "DIR")]
        param_dir: Option<PathBuf>,
        /// Gateway URL prefix (overrides config and IPFS_GATEWAY).
        #[arg(long, value_name = "URL")]
        gateway: Option<String>,
    },

    /// Report the local state of every manifest entry without downloading anything.
    Check {
        /// Path to the JSON parameter manifest.
        manifest: PathBuf,
        /// Sector size whose `.params` files are needed; other sizes are reported as skipped.
        #[arg(long, value_name = "BYTES")]
        sector_size: u64,
        /// Parameter directory (overrides config and FIL_PROOFS_PARAMETER_CACHE).
        #[arg(long, value_name = "DIR")]
        param_dir: Option<PathBuf>,
    },

    /// Print the digest prefix of a file, in manifest format.
    Digest {
        /// Path to the file.
        path: PathBuf,
    },
}

/// Config file, then environment, then command-line flags.
fn resolve_config(param_dir: Option<PathBuf>, gateway: Option<String>) -> FetchConfig {
    let base = config::load_or_init().unwrap_or_else(|e| {
        tracing::warn!("using default config: {:#}", e);
        FetchConfig::default()
    });
    let mut cfg = base.apply_env(|k| std::env::var(k).ok());
    if let Some(dir) = param_dir {
        cfg.param_dir = dir;
    }
    if let Some(gw) = gateway {
        cfg.gateway = gw;
    }
    tracing::debug!("resolved config: {:?}", cfg);
    cfg
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Fetch {
                manifest,
                sector_size,
                param_dir,
                gateway,
            } => {
                let cfg = resolve_config(param_dir, gateway);
                run_fetch(&cfg, &manifest, sector_size).await?;
            }
            CliCommand::Check {
                manifest,
                sector_size,
                param_dir,
            } => {
                let cfg = resolve_config(param_dir, None);
                run_check(&cfg, &manifest, sector_size).await?;
            }
            CliCommand::Digest { path } => run_digest(&path).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
