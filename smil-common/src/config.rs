//! Configuration file resolution and loading
//!
//! Config file lookup follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config dir>/<app>/config.toml`)
//! 4. System-wide file (`/etc/<app>/config.toml`, Linux only)
//!
//! A missing file is not an error: callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Locates the configuration file for an application
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    app_name: String,
    env_var_name: String,
}

impl ConfigFileResolver {
    /// Create a resolver for `app_name`, honouring `env_var_name` as override
    pub fn new(app_name: &str, env_var_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            env_var_name: env_var_name.to_string(),
        }
    }

    /// Resolve the config file path, returning `None` when nothing exists
    ///
    /// An explicit CLI path or environment variable is returned even if the
    /// file does not exist, so the caller can report it.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config directory
        if let Some(path) = self.user_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        // Priority 4: System-wide config (Linux)
        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc").join(&self.app_name).join("config.toml");
            if system.exists() {
                return Some(system);
            }
        }

        None
    }

    /// Per-user config path (`~/.config/<app>/config.toml` on Linux)
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(&self.app_name).join("config.toml"))
    }
}

/// Parse a TOML config file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Load `T` from the resolved config file, or `T::default()` when none exists
///
/// An explicitly named file that is missing is an error, as is any resolved
/// file that fails to parse.
pub fn load_or_default<T>(resolver: &ConfigFileResolver, cli_arg: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match resolver.resolve(cli_arg) {
        Some(path) if path.exists() => load_toml(&path),
        Some(path) => Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        ))),
        None => {
            warn!(
                "No config file found for {}, using built-in defaults",
                resolver.app_name
            );
            Ok(T::default())
        }
    }
}
