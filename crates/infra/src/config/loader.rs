//! Configuration loader.
//!
//! Loads [`AppConfig`] from a TOML file, then applies environment-variable
//! overrides on top. Every field has a default, so a missing file yields a
//! usable local-only configuration.
//!
//! ## Environment Variables
//! - `HARBOR_DB_PATH`: database file path
//! - `HARBOR_DB_POOL_SIZE`: connection pool size
//! - `HARBOR_REMOTE_URL`: remote store base URL
//! - `HARBOR_SYNC_INTERVAL`: sync interval in seconds
//!
//! ## File Locations
//! The loader probes `./harbor.toml` and `./config.toml` in the working
//! directory when no explicit path is given.

use std::path::{Path, PathBuf};

use harbor_domain::{HarborError, Result};

use super::AppConfig;

/// Load configuration: file (if present) plus environment overrides.
pub fn load() -> Result<AppConfig> {
    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("no config file found, using defaults");
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a specific TOML file.
pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| HarborError::Config(format!("Failed to read config file: {e}")))?;

    toml::from_str(&contents)
        .map_err(|e| HarborError::Config(format!("Invalid TOML format: {e}")))
}

/// Probe the working directory for a config file.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    [cwd.join("harbor.toml"), cwd.join("config.toml")].into_iter().find(|p| p.exists())
}

fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(path) = std::env::var("HARBOR_DB_PATH") {
        config.database.path = path;
    }
    if let Ok(size) = std::env::var("HARBOR_DB_POOL_SIZE") {
        config.database.pool_size = size
            .parse()
            .map_err(|e| HarborError::Config(format!("Invalid pool size: {e}")))?;
    }
    if let Ok(url) = std::env::var("HARBOR_REMOTE_URL") {
        config.remote.base_url = url;
    }
    if let Ok(interval) = std::env::var("HARBOR_SYNC_INTERVAL") {
        config.sync.interval_secs = interval
            .parse()
            .map_err(|e| HarborError::Config(format!("Invalid sync interval: {e}")))?;
    }
    Ok(())
}
