//! TOML configuration file loading
//!
//! Supports `~/.config/throttle-bot/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BotConfigFile {
    /// Admission control tuning
    #[serde(default)]
    pub throttle: ThrottleFileConfig,

    /// User-facing feedback texts
    #[serde(default)]
    pub texts: TextsFileConfig,

    /// Telegram connection settings
    #[serde(default)]
    pub telegram: TelegramFileConfig,
}

/// Admission control tuning, all durations in (fractional) seconds
#[derive(Debug, Default, Deserialize)]
pub struct ThrottleFileConfig {
    /// Cooldown between admitted text messages
    pub message_rate_limit: Option<f64>,

    /// Cooldown between admitted button presses
    pub button_rate_limit: Option<f64>,

    /// Longest sleep between countdown edits
    pub tick_ceiling: Option<f64>,

    /// Remaining cooldown at which the countdown is closed
    pub finish_threshold: Option<f64>,

    /// Interval of the expired-window reaper
    pub reap_interval: Option<f64>,
}

/// Feedback texts; `{secs}` is replaced with the remaining time
#[derive(Debug, Default, Deserialize)]
pub struct TextsFileConfig {
    pub wait: Option<String>,
    pub proceed: Option<String>,
    pub button_wait: Option<String>,
    pub error_notice: Option<String>,
    pub greeting: Option<String>,
}

/// Telegram connection settings
#[derive(Debug, Default, Deserialize)]
pub struct TelegramFileConfig {
    /// Bot token
    pub token: Option<String>,

    /// Pause between getUpdates calls in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Discard updates queued while the bot was offline
    pub drop_pending_updates: Option<bool>,

    /// Ignore updates from groups and channels
    pub private_only: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `BotConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> BotConfigFile {
    config_file_path().map_or_else(BotConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `BotConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_from(path: &Path) -> BotConfigFile {
    if !path.exists() {
        return BotConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                BotConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            BotConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/throttle-bot/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("throttle-bot").join("config.toml"))
}
