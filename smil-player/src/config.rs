//! Configuration for the smil-player host
//!
//! Loaded from a TOML file found through
//! [`ConfigFileResolver`](smil_common::config::ConfigFileResolver):
//! 1. `--config <path>` on the command line
//! 2. `SMIL_PLAYER_CONFIG` environment variable
//! 3. `~/.config/smil-player/config.toml`
//! 4. `/etc/smil-player/config.toml` (Linux)
//!
//! Every field has a built-in default, so a missing file or a partial file
//! both work.
//!
//! ```toml
//! [logging]
//! level = "smil_player=debug"
//!
//! [bitrate]
//! preferred = 300000
//! max = 1000000
//!
//! [media]
//! default_length = "5s"
//! lengths = { "intro.mp4" = "12.5s" }
//!
//! [playback]
//! simulate = false
//! speed = 1.0
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use smil_common::config::{load_or_default, ConfigFileResolver};
use smil_common::human_time::parse_time;
use tracing::warn;

use crate::error::Result;
use crate::host::BitRates;

/// Application name used for config directory lookup
pub const APP_NAME: &str = "smil-player";

/// Environment variable overriding the config file path
pub const CONFIG_ENV_VAR: &str = "SMIL_PLAYER_CONFIG";

/// Top-level player configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub logging: LoggingConfig,
    pub bitrate: BitrateConfig,
    pub media: MediaConfig,
    pub playback: PlaybackConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "smil_player=info".to_string(),
        }
    }
}

/// Bitrate window for `switch` selection (bits/s)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BitrateConfig {
    pub preferred: u32,
    pub max: u32,
}

impl Default for BitrateConfig {
    fn default() -> Self {
        let rates = BitRates::default();
        Self {
            preferred: rates.preferred,
            max: rates.max,
        }
    }
}

/// Media length answers for continuous media
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Length assumed when `src` has no entry in `lengths`; unset means the
    /// media plays until stopped some other way
    pub default_length: Option<String>,

    /// `src` → time value
    pub lengths: HashMap<String, String>,
}

impl MediaConfig {
    /// Intrinsic length of `src` in deci-seconds, if known
    pub fn length_for(&self, src: Option<&str>) -> Option<i64> {
        let value = src
            .and_then(|s| self.lengths.get(s))
            .or(self.default_length.as_ref())?;
        let parsed = parse_time(value);
        if parsed.is_none() {
            warn!("Ignoring unparseable media length {:?}", value);
        }
        parsed.filter(|ds| *ds >= 0)
    }
}

/// Clock driving the presentation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Jump straight to each deadline instead of sleeping
    pub simulate: bool,

    /// Real-time multiplier; 2.0 plays twice as fast
    pub speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            simulate: false,
            speed: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Load from the resolved config file, or defaults when none exists
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let resolver = ConfigFileResolver::new(APP_NAME, CONFIG_ENV_VAR);
        let config: PlayerConfig = load_or_default(&resolver, cli_path)?;
        config.validate()
    }

    /// Parse a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(content)
            .map_err(|e| crate::error::Error::Config(e.to_string()))?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self> {
        if !(self.playback.speed.is_finite() && self.playback.speed > 0.0) {
            warn!(
                "Invalid playback speed {}, using 1.0",
                self.playback.speed
            );
            self.playback.speed = 1.0;
        }
        if self.bitrate.preferred > self.bitrate.max {
            warn!(
                "Preferred bitrate {} exceeds max {}, clamping",
                self.bitrate.preferred, self.bitrate.max
            );
            self.bitrate.preferred = self.bitrate.max;
        }
        Ok(self)
    }

    pub fn bit_rates(&self) -> BitRates {
        BitRates {
            preferred: self.bitrate.preferred,
            max: self.bitrate.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.logging.level, "smil_player=info");
        assert_eq!(config.bit_rates(), BitRates::default());
        assert!(!config.playback.simulate);
        assert_eq!(config.playback.speed, 1.0);
        assert_eq!(config.media.length_for(Some("a.mp4")), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = PlayerConfig::from_toml(
            r#"
[bitrate]
preferred = 300000

[media]
default_length = "5s"
lengths = { "intro.mp4" = "1:02" }
"#,
        )
        .unwrap();
        assert_eq!(config.bitrate.preferred, 300_000);
        assert_eq!(config.bitrate.max, u32::MAX);
        assert_eq!(config.logging.level, "smil_player=info");
        assert_eq!(config.media.length_for(Some("intro.mp4")), Some(620));
        assert_eq!(config.media.length_for(Some("other.mp4")), Some(50));
        assert_eq!(config.media.length_for(None), Some(50));
    }

    #[test]
    fn test_invalid_values_are_repaired() {
        let config = PlayerConfig::from_toml(
            "[playback]\nspeed = -2.0\n[bitrate]\npreferred = 10\nmax = 5\n",
        )
        .unwrap();
        assert_eq!(config.playback.speed, 1.0);
        assert_eq!(config.bitrate.preferred, 5);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = PlayerConfig::from_toml("[playback\nspeed = 1").unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[test]
    #[serial]
    fn test_load_from_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[playback]\nsimulate = true\nspeed = 4.0").unwrap();

        let config = PlayerConfig::load(Some(file.path())).unwrap();
        assert!(config.playback.simulate);
        assert_eq!(config.playback.speed, 4.0);
    }

    #[test]
    #[serial]
    fn test_load_from_env_var() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"smil_player=trace\"").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, file.path());
        let config = PlayerConfig::load(None);
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(config.unwrap().logging.level, "smil_player=trace");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        let result = PlayerConfig::load(Some(Path::new("/nonexistent/smil-player.toml")));
        assert!(matches!(result, Err(crate::error::Error::Common(_))));
    }
}
