//! Configuration file support for dosetrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/dosetrack/config.toml`.

use crate::analytics::DEFAULT_HORIZON_DAYS;
use crate::{Era, Error, Result, Rule, SchedulePolicy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Schedule applied to regimens whose state file carries none
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_eras")]
    pub eras: Vec<Era>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            eras: default_eras(),
        }
    }
}

impl ScheduleConfig {
    /// Validate the configured eras into a policy
    pub fn policy(&self) -> Result<SchedulePolicy> {
        SchedulePolicy::new(self.eras.clone())
            .map_err(|e| Error::Config(format!("Invalid [schedule] section: {}", e)))
    }
}

/// Scan lengths used by the analytics and calendar
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    #[serde(default = "default_days_before_start")]
    pub days_before_start: u32,

    #[serde(default = "default_days_after_today")]
    pub days_after_today: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            days_before_start: default_days_before_start(),
            days_after_today: default_days_after_today(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("dosetrack")
}

fn default_eras() -> Vec<Era> {
    vec![Era {
        effective_from: NaiveDate::default(),
        rule: Rule::Daily,
    }]
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

fn default_days_before_start() -> u32 {
    90
}

fn default_days_after_today() -> u32 {
    180
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.schedule.policy()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("dosetrack").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analytics.horizon_days, 730);
        assert_eq!(config.analytics.days_before_start, 90);
        assert_eq!(config.analytics.days_after_today, 180);

        let policy = config.schedule.policy().unwrap();
        assert_eq!(policy.eras()[0].rule, Rule::Daily);
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config::default();
        config.save_to(&path).unwrap();
        let parsed = Config::load_from(&path).unwrap();

        assert_eq!(config.analytics.horizon_days, parsed.analytics.horizon_days);
        assert_eq!(config.schedule.eras, parsed.schedule.eras);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[analytics]
horizon_days = 365
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.analytics.horizon_days, 365);
        assert_eq!(config.analytics.days_after_today, 180); // default
        assert_eq!(config.schedule.eras.len(), 1);
    }

    #[test]
    fn test_schedule_config() {
        let toml_str = r#"
[[schedule.eras]]
effective_from = "2025-03-28"
rule = { type = "daily" }

[[schedule.eras]]
effective_from = "2025-05-13"
rule = { type = "every_n_days", n = 2, anchor = "2025-05-13" }
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let policy = config.schedule.policy().unwrap();

        assert_eq!(policy.eras().len(), 2);
        assert_eq!(
            policy.eras()[1].rule,
            Rule::EveryNDays {
                n: 2,
                anchor: "2025-05-13".parse().unwrap(),
            }
        );
    }

    #[test]
    fn test_invalid_schedule_config_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[schedule]
eras = []
"#,
        )
        .unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
