//! Configuration management for the throttle bot

pub mod file;

use std::time::Duration;

use crate::channels::Category;
use crate::{Error, Result};

use file::BotConfigFile;

/// Default cooldown between text messages (seconds)
pub const DEFAULT_MESSAGE_RATE_LIMIT: f64 = 1.0;

/// Default cooldown between button presses (seconds)
pub const DEFAULT_BUTTON_RATE_LIMIT: f64 = 0.4;

/// Default ceiling for the countdown tick (seconds)
pub const DEFAULT_TICK_CEILING: f64 = 5.0;

/// Default remaining time at which a countdown is closed (seconds)
pub const DEFAULT_FINISH_THRESHOLD: f64 = 1.5;

/// Default interval of the expired-window reaper (seconds)
pub const DEFAULT_REAP_INTERVAL: f64 = 60.0;

/// Default pause between getUpdates calls
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Bot configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Admission control tuning
    pub throttle: ThrottleConfig,

    /// User-facing texts
    pub texts: FeedbackTexts,

    /// Telegram connection settings
    pub telegram: TelegramConfig,
}

/// Admission control tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Cooldown between admitted text messages
    pub message_rate_limit: Duration,

    /// Cooldown between admitted button presses
    pub button_rate_limit: Duration,

    /// Longest sleep between two countdown edits
    pub tick_ceiling: Duration,

    /// Remaining cooldown at or below which the countdown is closed
    pub finish_threshold: Duration,

    /// Interval of the expired-window reaper
    pub reap_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            message_rate_limit: Duration::from_secs_f64(DEFAULT_MESSAGE_RATE_LIMIT),
            button_rate_limit: Duration::from_secs_f64(DEFAULT_BUTTON_RATE_LIMIT),
            tick_ceiling: Duration::from_secs_f64(DEFAULT_TICK_CEILING),
            finish_threshold: Duration::from_secs_f64(DEFAULT_FINISH_THRESHOLD),
            reap_interval: Duration::from_secs_f64(DEFAULT_REAP_INTERVAL),
        }
    }
}

impl ThrottleConfig {
    /// Cooldown configured for a category
    #[must_use]
    pub const fn rate_limit(&self, category: Category) -> Duration {
        match category {
            Category::Message => self.message_rate_limit,
            Category::Button => self.button_rate_limit,
        }
    }
}

/// User-facing feedback texts
///
/// `{secs}` in a template is replaced with the remaining cooldown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTexts {
    /// Countdown shown to a throttled sender
    pub wait: String,

    /// One-shot notice once the countdown is over
    pub proceed: String,

    /// Alert for a throttled button press
    pub button_wait: String,

    /// Notice when a handler fails
    pub error_notice: String,

    /// Reply to `/start`
    pub greeting: String,
}

impl Default for FeedbackTexts {
    fn default() -> Self {
        Self {
            wait: "<b><i>Please wait about {secs} s before sending the next message</i></b>"
                .to_string(),
            proceed: "✅ You can send messages again".to_string(),
            button_wait: "Please wait {secs} s before the next action".to_string(),
            error_notice: "⚠️ Something went wrong while handling your request.\n\
                           Debug information has been written to the log!"
                .to_string(),
            greeting: "Hi! Use the buttons below to continue.".to_string(),
        }
    }
}

impl FeedbackTexts {
    /// Countdown text rounded up to whole seconds
    #[must_use]
    pub fn wait_text(&self, remaining: Duration) -> String {
        self.wait.replace("{secs}", &whole_secs(remaining).to_string())
    }

    /// Button alert text with one decimal
    #[must_use]
    pub fn button_wait_text(&self, remaining: Duration) -> String {
        self.button_wait
            .replace("{secs}", &format!("{:.1}", remaining.as_secs_f64()))
    }
}

/// Round a duration up to whole seconds (never below one)
#[must_use]
pub fn whole_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    let rounded = if remaining.subsec_nanos() > 0 { secs + 1 } else { secs };
    rounded.max(1)
}

/// Telegram connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token
    pub token: Option<String>,

    /// Pause between getUpdates calls
    pub poll_interval: Duration,

    /// Discard updates queued while the bot was offline
    pub drop_pending_updates: bool,

    /// Ignore updates from groups and channels
    pub private_only: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            drop_pending_updates: true,
            private_only: true,
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a configured duration is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        let mut config = Self::from_file(fc)?;

        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            config.telegram.token = Some(token);
        }

        Ok(config)
    }

    /// Build configuration from a parsed file overlay
    ///
    /// # Errors
    ///
    /// Returns error if a configured duration is invalid
    pub fn from_file(fc: BotConfigFile) -> Result<Self> {
        let defaults = Self::default();

        let throttle = ThrottleConfig {
            message_rate_limit: positive_secs(
                "message_rate_limit",
                fc.throttle.message_rate_limit,
                defaults.throttle.message_rate_limit,
            )?,
            button_rate_limit: positive_secs(
                "button_rate_limit",
                fc.throttle.button_rate_limit,
                defaults.throttle.button_rate_limit,
            )?,
            tick_ceiling: positive_secs(
                "tick_ceiling",
                fc.throttle.tick_ceiling,
                defaults.throttle.tick_ceiling,
            )?,
            finish_threshold: non_negative_secs(
                "finish_threshold",
                fc.throttle.finish_threshold,
                defaults.throttle.finish_threshold,
            )?,
            reap_interval: positive_secs(
                "reap_interval",
                fc.throttle.reap_interval,
                defaults.throttle.reap_interval,
            )?,
        };

        let texts = FeedbackTexts {
            wait: fc.texts.wait.unwrap_or(defaults.texts.wait),
            proceed: fc.texts.proceed.unwrap_or(defaults.texts.proceed),
            button_wait: fc.texts.button_wait.unwrap_or(defaults.texts.button_wait),
            error_notice: fc.texts.error_notice.unwrap_or(defaults.texts.error_notice),
            greeting: fc.texts.greeting.unwrap_or(defaults.texts.greeting),
        };

        let telegram = TelegramConfig {
            token: fc.telegram.token,
            poll_interval: fc
                .telegram
                .poll_interval_ms
                .map_or(defaults.telegram.poll_interval, Duration::from_millis),
            drop_pending_updates: fc
                .telegram
                .drop_pending_updates
                .unwrap_or(defaults.telegram.drop_pending_updates),
            private_only: fc
                .telegram
                .private_only
                .unwrap_or(defaults.telegram.private_only),
        };

        Ok(Self {
            throttle,
            texts,
            telegram,
        })
    }
}

/// Parse an optional strictly positive seconds value
fn positive_secs(name: &str, value: Option<f64>, default: Duration) -> Result<Duration> {
    let duration = non_negative_secs(name, value, default)?;
    if duration.is_zero() {
        return Err(Error::Config(format!("{name} must be greater than zero")));
    }
    Ok(duration)
}

/// Parse an optional non-negative, finite seconds value
fn non_negative_secs(name: &str, value: Option<f64>, default: Duration) -> Result<Duration> {
    value.map_or(Ok(default), |secs| {
        Duration::try_from_secs_f64(secs)
            .map_err(|e| Error::Config(format!("{name} = {secs} is not a valid duration: {e}")))
    })
}
