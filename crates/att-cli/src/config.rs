//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use att_core::{PresenceThresholds, UnknownTimezone, parse_zone};
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// IANA name of the reference timezone.
    pub timezone: String,
    /// Seconds between live monitor passes.
    pub refresh_interval_secs: u64,
    /// Minimum monthly percentage for the `high` bucket.
    pub presence_high: u32,
    /// Minimum monthly percentage for the `medium` bucket.
    pub presence_medium: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timezone", &self.timezone)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("presence_high", &self.presence_high)
            .field("presence_medium", &self.presence_medium)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let thresholds = PresenceThresholds::default();
        Self {
            database_path: data_dir.join("att.db"),
            timezone: host_timezone(),
            refresh_interval_secs: 10,
            presence_high: thresholds.high,
            presence_medium: thresholds.medium,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ATT_*)
        figment = figment.merge(Env::prefixed("ATT_"));

        figment.extract()
    }

    /// The reference timezone.
    pub fn zone(&self) -> Result<Tz, UnknownTimezone> {
        parse_zone(&self.timezone)
    }

    pub const fn thresholds(&self) -> PresenceThresholds {
        PresenceThresholds {
            high: self.presence_high,
            medium: self.presence_medium,
        }
    }

    /// Live refresh period, never shorter than one second.
    pub const fn refresh_interval(&self) -> Duration {
        let secs = if self.refresh_interval_secs == 0 {
            1
        } else {
            self.refresh_interval_secs
        };
        Duration::from_secs(secs)
    }
}

/// The host's zone if it is a known IANA name, else UTC.
fn host_timezone() -> String {
    iana_time_zone::get_timezone()
        .ok()
        .filter(|name| parse_zone(name).is_ok())
        .unwrap_or_else(|| "UTC".to_string())
}

/// Returns the platform-specific config directory for att.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("att"))
}

/// Returns the platform-specific data directory for att.
///
/// On Linux: `~/.local/share/att`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("att"))
}
