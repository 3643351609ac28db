//! # Sync Configuration Module
//!
//! Provides configuration management for the playlist sync core.
//!
//! ## Overview
//!
//! Settings are assembled either through [`SyncSettingsBuilder`] (hosts that
//! own their configuration) or through [`SyncSettings::from_env`] (scheduled
//! jobs driven by environment variables). Both paths end in the same
//! fail-fast validation.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SyncSettings;
//!
//! let settings = SyncSettings::builder()
//!     .playlist_name("Recents (auto)")
//!     .chunk_size(50)
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! Unparsable values fall back to their defaults with a warning; values that
//! parse but violate a bound are rejected by validation, except the chunk
//! size which is clamped into `1..=100`.

use crate::error::{Error, Result};
use crate::logging::LogFormat;
use bridge_traits::playlist::PrivacyStatus;
use bridge_traits::time::LogLevel;
use chrono::Weekday;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PLAYLIST_NAME: &str = "Last.fm Recents (auto)";
pub const DEFAULT_AUTH_PATH: &str = "browser.json";
pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const MAX_CHUNK_SIZE: usize = 100;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const DEFAULT_SUBSTITUTION_ATTEMPTS: u32 = 2;
pub const DEFAULT_KEEP_WEEKS: usize = 2;

/// How the engine converges a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileStrategy {
    /// Minimal diff, LIS reorder, verify, substitute, fall back to replace
    #[default]
    Incremental,
    /// Always replace every item, then verify or accept set equality
    FullReplace,
}

impl ReconcileStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStrategy::Incremental => "incremental",
            ReconcileStrategy::FullReplace => "full_replace",
        }
    }
}

impl FromStr for ReconcileStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "incremental" | "diff" => Ok(ReconcileStrategy::Incremental),
            "full_replace" | "replace" => Ok(ReconcileStrategy::FullReplace),
            other => Err(Error::InvalidSetting {
                key: "RECONCILE_STRATEGY".to_string(),
                message: format!("unknown strategy '{}'", other),
            }),
        }
    }
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weekly snapshot playlist settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySettings {
    pub enabled: bool,
    /// Title prefix; derived from the main playlist name when absent
    pub prefix: Option<String>,
    pub week_start: Weekday,
    /// Offset from UTC used to decide which calendar week "now" falls in
    pub utc_offset_minutes: i32,
    /// Number of weekly playlists to keep, newest first; 0 disables pruning
    pub keep_weeks: usize,
    /// Falls back to the main playlist privacy when absent
    pub privacy: Option<PrivacyStatus>,
}

impl Default for WeeklySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: None,
            week_start: Weekday::Mon,
            utc_offset_minutes: 0,
            keep_weeks: DEFAULT_KEEP_WEEKS,
            privacy: None,
        }
    }
}

/// Settings for one sync run.
///
/// Use [`SyncSettingsBuilder`] or [`SyncSettings::from_env`] to construct
/// instances; both validate before returning.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Human-readable name of the target playlist
    pub playlist_name: String,
    pub make_public: bool,
    /// Items per mutating remote call, always within `1..=100`
    pub chunk_size: usize,
    /// Attempts per remote call, including the first
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Substitution rounds before the full-replace fallback
    pub substitution_attempts: u32,
    pub strategy: ReconcileStrategy,
    /// Run substitution detection when verification finds a set mismatch
    pub accept_substitutions: bool,
    /// Template cache file; defaults to `templates.json` in the data directory
    pub template_cache_path: Option<PathBuf>,
    pub template_cache_ttl: Option<Duration>,
    pub weekly: WeeklySettings,
    /// Captured browser request headers used to authenticate
    pub auth_path: PathBuf,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
            make_public: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_secs(30),
            substitution_attempts: DEFAULT_SUBSTITUTION_ATTEMPTS,
            strategy: ReconcileStrategy::default(),
            accept_substitutions: true,
            template_cache_path: None,
            template_cache_ttl: None,
            weekly: WeeklySettings::default(),
            auth_path: PathBuf::from(DEFAULT_AUTH_PATH),
            log_level: LogLevel::Info,
            log_format: LogFormat::default(),
        }
    }
}

impl SyncSettings {
    pub fn builder() -> SyncSettingsBuilder {
        SyncSettingsBuilder::default()
    }

    pub fn privacy_status(&self) -> PrivacyStatus {
        if self.make_public {
            PrivacyStatus::Public
        } else {
            PrivacyStatus::Private
        }
    }

    pub fn weekly_privacy_status(&self) -> PrivacyStatus {
        self.weekly.privacy.unwrap_or_else(|| self.privacy_status())
    }

    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = SyncSettings::default();
        let default_weekly = &defaults.weekly;

        let mut builder = SyncSettings::builder()
            .playlist_name(env.string("PLAYLIST_NAME").unwrap_or(defaults.playlist_name))
            .make_public(env.bool_or("MAKE_PUBLIC", defaults.make_public))
            .chunk_size(env.parsed_or("CHUNK_SIZE", defaults.chunk_size))
            .max_retries(env.parsed_or("MAX_RETRIES", defaults.max_retries))
            .retry_base_delay(Duration::from_millis(
                env.parsed_or("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS),
            ))
            .substitution_attempts(
                env.parsed_or("SUBSTITUTION_ATTEMPTS", defaults.substitution_attempts),
            )
            .strategy(env.parsed_or("RECONCILE_STRATEGY", defaults.strategy))
            .accept_substitutions(
                env.bool_or("ACCEPT_SUBSTITUTIONS", defaults.accept_substitutions),
            )
            .auth_path(env.string("YTM_AUTH_PATH").unwrap_or_else(|| DEFAULT_AUTH_PATH.into()))
            .log_level(env.parsed_or("LOG_LEVEL", defaults.log_level))
            .log_format(env.parsed_or("LOG_FORMAT", defaults.log_format));

        if let Some(path) = env.string("TEMPLATE_CACHE_PATH") {
            builder = builder.template_cache_path(path);
        }
        if let Some(hours) = env.parsed::<u64>("TEMPLATE_CACHE_TTL_HOURS") {
            if hours > 0 {
                builder = builder.template_cache_ttl(Duration::from_secs(hours * 3600));
            }
        }

        let weekly = WeeklySettings {
            enabled: env.bool_or("WEEKLY_ENABLED", default_weekly.enabled),
            prefix: env.string("WEEKLY_PLAYLIST_PREFIX"),
            week_start: env.parsed_or("WEEKLY_WEEK_START", default_weekly.week_start),
            utc_offset_minutes: env.parsed_or(
                "WEEKLY_UTC_OFFSET_MINUTES",
                default_weekly.utc_offset_minutes,
            ),
            keep_weeks: env.parsed_or("WEEKLY_KEEP_WEEKS", default_weekly.keep_weeks),
            privacy: env.parsed("WEEKLY_PRIVACY_STATUS"),
        };

        builder.weekly(weekly).build()
    }

    /// Validates the settings and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.playlist_name.trim().is_empty() {
            return Err(Error::Config("Playlist name cannot be empty".to_string()));
        }

        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidSetting {
                key: "chunk_size".to_string(),
                message: format!("must be within 1..={}", MAX_CHUNK_SIZE),
            });
        }

        if self.max_retries == 0 {
            return Err(Error::InvalidSetting {
                key: "max_retries".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        }

        if self.retry_base_delay > self.retry_max_delay {
            return Err(Error::InvalidSetting {
                key: "retry_base_delay".to_string(),
                message: "base delay exceeds maximum delay".to_string(),
            });
        }

        if self.weekly.utc_offset_minutes.abs() > 14 * 60 {
            return Err(Error::InvalidSetting {
                key: "weekly.utc_offset_minutes".to_string(),
                message: "offset must be within +/-14 hours".to_string(),
            });
        }

        if self.auth_path.as_os_str().is_empty() {
            return Err(Error::Config("Auth header path cannot be empty".to_string()));
        }

        Ok(())
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.string(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparsable setting");
                None
            }
        }
    }

    fn parsed_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.parsed(key).unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.string(key) {
            Some(raw) => matches!(
                raw.to_lowercase().as_str(),
                "1" | "true" | "t" | "yes" | "y" | "on"
            ),
            None => default,
        }
    }
}

/// Builder for constructing [`SyncSettings`] instances.
#[derive(Debug, Default)]
pub struct SyncSettingsBuilder {
    settings: SyncSettings,
}

impl SyncSettingsBuilder {
    pub fn playlist_name(mut self, name: impl Into<String>) -> Self {
        self.settings.playlist_name = name.into();
        self
    }

    pub fn make_public(mut self, public: bool) -> Self {
        self.settings.make_public = public;
        self
    }

    /// Sets the chunk size, clamped into `1..=100`.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.settings.chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.settings.max_retries = attempts;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.settings.retry_base_delay = delay;
        self
    }

    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.settings.retry_max_delay = delay;
        self
    }

    pub fn substitution_attempts(mut self, attempts: u32) -> Self {
        self.settings.substitution_attempts = attempts;
        self
    }

    pub fn strategy(mut self, strategy: ReconcileStrategy) -> Self {
        self.settings.strategy = strategy;
        self
    }

    pub fn accept_substitutions(mut self, accept: bool) -> Self {
        self.settings.accept_substitutions = accept;
        self
    }

    pub fn template_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.template_cache_path = Some(path.into());
        self
    }

    pub fn template_cache_ttl(mut self, ttl: Duration) -> Self {
        self.settings.template_cache_ttl = Some(ttl);
        self
    }

    pub fn weekly(mut self, weekly: WeeklySettings) -> Self {
        self.settings.weekly = weekly;
        self
    }

    pub fn auth_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.settings.log_level = level;
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.settings.log_format = format;
        self
    }

    /// Validates and returns the settings.
    pub fn build(self) -> Result<SyncSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
