#![allow(dead_code)]

pub mod range_server;
pub mod source;

use std::path::Path;

use paramfetch_core::checksum;
use paramfetch_core::config::FetchConfig;
use paramfetch_core::control::CancelMode;

/// Deterministic test body of `len` bytes.
pub fn body(seed: u8, len: usize) -> Vec<u8> {
    (0u8..=250).cycle().map(|b| b ^ seed).take(len).collect()
}

/// Manifest JSON from `(name, cid, digest, sector_size)` rows.
pub fn manifest(rows: &[(&str, &str, &str, u64)]) -> Vec<u8> {
    let map: serde_json::Map<String, serde_json::Value> = rows
        .iter()
        .map(|(name, cid, digest, size)| {
            (
                name.to_string(),
                serde_json::json!({ "cid": cid, "digest": digest, "sector_size": size }),
            )
        })
        .collect();
    serde_json::to_vec(&serde_json::Value::Object(map)).unwrap()
}

pub fn digest(body: &[u8]) -> String {
    checksum::digest_prefix(body)
}

pub fn config(param_dir: &Path, gateway: &str) -> FetchConfig {
    FetchConfig {
        param_dir: param_dir.to_path_buf(),
        gateway: gateway.to_string(),
        trust_params: false,
        cancel_mode: CancelMode::Detach,
    }
}
