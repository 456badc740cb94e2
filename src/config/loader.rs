//! YAML config file round-trip
//!
//! Reads and writes the `Config` document described in the configuration
//! file contract. Parsing never validates; callers run
//! [`super::validator::validate`] afterward.

use std::path::Path;

use tokio::fs;

use super::defaults::DEFAULT_INIT_LISTEN;
use super::error::{ConfigError, Result};
use super::types::{ApiConfig, Config};

/// Loads and autofills a config file from disk.
pub async fn load(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ConfigError::FilePermissionDenied(path.to_path_buf()),
            _ => ConfigError::FileReadError(path.to_path_buf(), e.to_string()),
        })?;
    let mut cfg: Config = serde_yaml::from_str(&raw)?;
    cfg.autofill();
    Ok(cfg)
}

/// Serializes and writes a config file to disk, autofilling first so the
/// on-disk form round-trips stably.
pub async fn save(path: &Path, cfg: &Config) -> Result<()> {
    let mut cfg = cfg.clone();
    cfg.autofill();
    let raw = serde_yaml::to_string(&cfg)?;
    fs::write(path, raw)
        .await
        .map_err(|e| ConfigError::FileReadError(path.to_path_buf(), e.to_string()))
}

/// Creates a minimal `{api:{listen:[":80"]}}` file if none exists yet,
/// matching the `-i` CLI flag's contract.
pub async fn init_if_missing(path: &Path) -> Result<()> {
    if fs::metadata(path).await.is_ok() {
        return Ok(());
    }
    let cfg = Config {
        api: Some(ApiConfig { listen: vec![DEFAULT_INIT_LISTEN.to_string()], ..Default::default() }),
        ..Default::default()
    };
    save(path, &cfg).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn round_trips_a_minimal_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vhostd.yaml");

        init_if_missing(&path).await.unwrap();
        let cfg = load(&path).await.unwrap();

        assert_eq!(cfg.api.unwrap().listen, vec![":80".to_string()]);
    }

    #[tokio::test]
    async fn init_if_missing_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vhostd.yaml");

        init_if_missing(&path).await.unwrap();
        let mut cfg = load(&path).await.unwrap();
        cfg.http = Some(super::super::types::HttpSectionConfig {
            listen: vec![":8080".into()],
            vhost: vec![],
        });
        save(&path, &cfg).await.unwrap();

        init_if_missing(&path).await.unwrap();
        let reloaded = load(&path).await.unwrap();
        assert!(reloaded.http.is_some());
    }

    #[tokio::test]
    async fn missing_file_is_a_file_not_found_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        match load(&path).await {
            Err(ConfigError::FileNotFound(_)) => {}
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }
}
