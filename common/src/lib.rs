/*!
common/src/lib.rs

Shared configuration types for newsbrief.

This file provides:
- Config data structures (deserialized from TOML, every field defaulted)
- An async loader that merges a default file with an optional override file
- Mail credentials and the run-now switch read from the environment
- `ConfigError`, the only error class allowed to stop the process at startup
*/

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Startup configuration failures. Any of these prevents the scheduler loop from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("invalid source url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid extraction selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid setting {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// How the source page is turned into HTML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Headless Chromium, scripts executed
    #[default]
    Headless,
    /// Plain HTTP GET of the raw markup
    Static,
}

/// The news page to summarize
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub render: RenderMode,
    /// CSS selector that must appear before the DOM is captured (headless only)
    pub ready_selector: String,
    pub navigation_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub user_agent: String,
    /// Explicit Chromium/Chrome binary; auto-detected when absent
    pub chrome_executable: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://www.bbc.com/news".to_string(),
            render: RenderMode::Headless,
            ready_selector: "article, .gs-c-promo-body".to_string(),
            navigation_timeout_ms: 120_000,
            ready_timeout_ms: 20_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            chrome_executable: None,
        }
    }
}

/// Declarative rules for turning rendered HTML into article text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    /// CSS selectors; matches are visited in document order
    pub selectors: Vec<String>,
    /// Trimmed text of this many characters or fewer is dropped
    pub min_length: usize,
    /// Case-insensitive phrases that mark a node as boilerplate
    pub boilerplate_phrases: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            selectors: vec![
                "article p".to_string(),
                ".gs-c-promo-body p:not(.gs-c-promo-summary)".to_string(),
            ],
            min_length: 20,
            boilerplate_phrases: vec!["read more".to_string()],
        }
    }
}

/// LSA summarizer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    pub sentence_count: usize,
    /// Fraction of singular dimensions kept when ranking sentences
    pub reduction_ratio: f64,
    pub min_dimensions: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            sentence_count: 5,
            reduction_ratio: 1.0,
            min_dimensions: 3,
        }
    }
}

/// SMTP delivery settings. Credentials come from the environment, see [`MailCredentials`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject: String,
    pub max_attempts: u32,
    pub backoff_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            subject: "Daily News Summary".to_string(),
            max_attempts: 3,
            backoff_seconds: 2,
            timeout_seconds: 30,
        }
    }
}

/// Scheduler configuration. At most one of `daily_at` / `every_minutes` may be set;
/// with neither, the job runs daily at [`DEFAULT_DAILY_AT`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock time in "HH:MM" 24h format
    pub daily_at: Option<String>,
    /// Short interval, mostly useful for testing a deployment
    pub every_minutes: Option<u32>,
    /// Seconds between due-checks
    pub tick_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_at: None,
            every_minutes: None,
            tick_seconds: 60,
        }
    }
}

pub const DEFAULT_DAILY_AT: &str = "09:00";

/// When the job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    DailyAt(NaiveTime),
    EveryMinutes(u32),
}

impl SchedulerConfig {
    /// Resolve the configured cadence, rejecting ambiguous or zero-length schedules.
    pub fn cadence(&self) -> std::result::Result<Cadence, ConfigError> {
        match (&self.daily_at, self.every_minutes) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidSchedule(
                "daily_at and every_minutes are mutually exclusive".to_string(),
            )),
            (None, None) => parse_time_of_day(DEFAULT_DAILY_AT).map(Cadence::DailyAt),
            (Some(at), None) => parse_time_of_day(at).map(Cadence::DailyAt),
            (None, Some(0)) => Err(ConfigError::InvalidSchedule(
                "every_minutes must be at least 1".to_string(),
            )),
            (None, Some(k)) => Ok(Cadence::EveryMinutes(k)),
        }
    }
}

/// Parse an "HH:MM" wall-clock time
pub fn parse_time_of_day(s: &str) -> std::result::Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime(s.to_string()))
}

/// Log sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only log file; stdout when absent
    pub file: Option<String>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub extraction: ExtractionConfig,
    pub summary: SummaryConfig,
    pub mail: MailConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so with neither present the built-in defaults apply.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        url::Url::parse(&self.source.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.source.url.clone(),
            reason: e.to_string(),
        })?;
        self.scheduler.cadence()?;
        if self.scheduler.tick_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.tick_seconds",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.mail.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "mail.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.summary.sentence_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "summary.sentence_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.summary.reduction_ratio > 0.0 && self.summary.reduction_ratio <= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "summary.reduction_ratio",
                reason: "must be in (0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Sender/recipient addresses and the SMTP password.
#[derive(Clone)]
pub struct MailCredentials {
    pub from: String,
    pub password: String,
    pub to: String,
}

impl std::fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailCredentials")
            .field("from", &self.from)
            .field("password", &"<redacted>")
            .field("to", &self.to)
            .finish()
    }
}

impl MailCredentials {
    /// Read `EMAIL_FROM`, `EMAIL_PASSWORD` and `EMAIL_TO` from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MailCredentials::from_env`] with an injectable lookup.
    /// Unset and empty values are both treated as missing.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingEnv(key))
        };
        Ok(Self {
            from: require("EMAIL_FROM")?,
            password: require("EMAIL_PASSWORD")?,
            to: require("EMAIL_TO")?,
        })
    }
}

/// Whether a `RUN_NOW`-style switch value asks for an immediate run
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// `RUN_NOW` from the process environment
pub fn run_now_from_env() -> bool {
    std::env::var("RUN_NOW").map(|v| is_truthy(&v)).unwrap_or(false)
}
