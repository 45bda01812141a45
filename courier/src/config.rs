//! Locating and loading the service configuration

use std::path::{Path, PathBuf};

use crate::controller::Courier;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "COURIER_CONFIG";

const DEFAULT_PATHS: [&str; 2] = ["./courier.config.ron", "/etc/courier/courier.config.ron"];

/// Find the configuration file using the following precedence:
/// 1. `explicit` (the `--config` argument)
/// 2. `COURIER_CONFIG` environment variable
/// 3. ./courier.config.ron (current working directory)
/// 4. /etc/courier/courier.config.ron (system-wide config)
///
/// Returns `None` when nothing was named and no default file exists.
///
/// # Errors
///
/// Returns an error if an explicitly named file does not exist.
pub fn find_config_file(explicit: Option<PathBuf>) -> anyhow::Result<Option<PathBuf>> {
    let named = explicit
        .map(|path| (path, "--config"))
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(|p| (PathBuf::from(p), CONFIG_ENV)));

    if let Some((path, source)) = named {
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!("{source} points to non-existent file: {}", path.display());
    }

    Ok(DEFAULT_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists()))
}

/// Parse a configuration file
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid RON.
pub fn load(path: &Path) -> anyhow::Result<Courier> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
    })?;

    ron::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid config in {}: {}", path.display(), e))
}
