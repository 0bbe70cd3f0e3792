use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::control::CancelMode;

/// Default local directory holding parameter files.
pub const DEFAULT_PARAM_DIR: &str = "/data/lotus/folder/filecoin-proof-parameters";
/// Default gateway prefix; the content id is appended to it.
pub const DEFAULT_GATEWAY: &str = "https://proofs.filecoin.io/ipfs/";

/// Overrides `param_dir` when set and non-empty.
pub const PARAM_DIR_ENV: &str = "FIL_PROOFS_PARAMETER_CACHE";
/// Overrides `gateway` when set and non-empty.
pub const GATEWAY_ENV: &str = "IPFS_GATEWAY";
/// Set to exactly `1` to skip all digest checks.
pub const TRUST_PARAMS_ENV: &str = "TRUST_PARAMS";

/// Fetch configuration loaded from `~/.config/paramfetch/config.toml`,
/// then overridden by environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Directory the parameter files live in (one file per manifest entry, no subdirectories).
    pub param_dir: PathBuf,
    /// Gateway URL prefix.
    pub gateway: String,
    /// Skip digest verification entirely. Unsafe; for test setups only.
    #[serde(default)]
    pub trust_params: bool,
    /// Behavior on cancellation: "detach" (default) or "drain".
    #[serde(default)]
    pub cancel_mode: CancelMode,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            param_dir: PathBuf::from(DEFAULT_PARAM_DIR),
            gateway: DEFAULT_GATEWAY.to_string(),
            trust_params: false,
            cancel_mode: CancelMode::Detach,
        }
    }
}

impl FetchConfig {
    /// Apply environment overrides using `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(PARAM_DIR_ENV).filter(|v| !v.is_empty()) {
            self.param_dir = PathBuf::from(dir);
        }
        if let Some(gw) = lookup(GATEWAY_ENV).filter(|v| !v.is_empty()) {
            self.gateway = gw;
        }
        if lookup(TRUST_PARAMS_ENV).as_deref() == Some("1") {
            self.trust_params = true;
        }
        self
    }

    /// Defaults plus process environment, without touching the config file.
    pub fn from_env() -> Self {
        Self::default().apply_env(|k| std::env::var(k).ok())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("paramfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// Environment overrides are not applied here.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
