//! Layout configuration persistence
//!
//! Loads and saves `LayoutConfig` as JSON in the platform configuration
//! directory, falling back to defaults when the file is missing or corrupt.

use crate::config::LayoutConfig;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "markview";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Temporary file name used during atomic writes
const CONFIG_BACKUP_NAME: &str = "config.json.bak";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory.
///
/// - **Windows**: `%APPDATA%\markview\`
/// - **macOS**: `~/Library/Application Support/markview/`
/// - **Linux**: `~/.config/markview/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the configuration file.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Load configuration from the default location, or defaults on any failure.
pub fn load_config() -> LayoutConfig {
    get_config_file_path()
        .and_then(|path| try_load_config_from(&path))
        .unwrap_or_warn_default(LayoutConfig::default(), "Failed to load configuration")
}

/// Load configuration from an explicit path, or defaults on any failure.
pub fn load_config_from(path: &Path) -> LayoutConfig {
    try_load_config_from(path)
        .unwrap_or_warn_default(LayoutConfig::default(), "Failed to load configuration")
}

/// Load configuration from a path, reporting failures.
///
/// A missing or empty file is not an error; it yields defaults.
pub fn try_load_config_from(path: &Path) -> Result<LayoutConfig> {
    if !path.exists() {
        debug!("Config file not found at {}, using defaults", path.display());
        return Ok(LayoutConfig::default());
    }

    debug!("Loading config from: {}", path.display());

    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Config file is empty, using defaults");
        return Ok(LayoutConfig::default());
    }

    let config = LayoutConfig::from_json_sanitized(&contents).map_err(|e| {
        warn!(
            "Config file at {} contains invalid JSON: {}",
            path.display(),
            e
        );
        Error::ConfigParse {
            message: format!("Failed to parse config file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Save configuration to the default location.
pub fn save_config(config: &LayoutConfig) -> Result<()> {
    let config_dir = get_config_dir()?;
    save_config_to(config, &config_dir.join(CONFIG_FILE_NAME))
}

/// Save configuration to an explicit path.
///
/// Writes a sibling temporary file first and renames it over the target,
/// creating the parent directory when needed.
pub fn save_config_to(config: &LayoutConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating config directory: {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| Error::ConfigSave {
                path: parent.to_path_buf(),
                source: Box::new(e),
            })?;
        }
    }

    let backup_path = path.with_file_name(CONFIG_BACKUP_NAME);

    let json = serde_json::to_string_pretty(config).map_err(|e| Error::ConfigSave {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    fs::write(&backup_path, &json).map_err(|e| Error::ConfigSave {
        path: backup_path.clone(),
        source: Box::new(e),
    })?;

    fs::rename(&backup_path, path).map_err(|e| Error::ConfigSave {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    info!("Configuration saved to {}", path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
