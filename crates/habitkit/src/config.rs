//! Configuration management for habitkit.
//!
//! Loads settings from `$XDG_CONFIG_HOME/habitkit/config.toml` or uses defaults.
//! Every field has a serde default so partial files are valid.

use anyhow::Result;
use habitkit_shared::{RolloverPolicy, StreakRule, BASE_TASK_XP};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Timers used by the aggregator, watcher and queues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Non-forced refreshes within this window of the last success are skipped
    #[serde(default = "default_refresh_debounce")]
    pub refresh_debounce_ms: u64,

    /// Pause between dismissing a celebration and showing the next
    #[serde(default = "default_celebration_settle")]
    pub celebration_settle_ms: u64,

    /// Level watcher ignores changes this long after its baseline
    #[serde(default = "default_watcher_grace")]
    pub watcher_grace_ms: u64,

    /// How long a quest toast stays visible
    #[serde(default = "default_toast_display")]
    pub toast_display_ms: u64,

    /// Toast hide animation
    #[serde(default = "default_toast_hide")]
    pub toast_hide_ms: u64,

    /// Gap before the next toast
    #[serde(default = "default_toast_gap")]
    pub toast_gap_ms: u64,
}

fn default_refresh_debounce() -> u64 {
    1_000
}

fn default_celebration_settle() -> u64 {
    100
}

fn default_watcher_grace() -> u64 {
    500
}

fn default_toast_display() -> u64 {
    5_000
}

fn default_toast_hide() -> u64 {
    300
}

fn default_toast_gap() -> u64 {
    150
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: default_refresh_debounce(),
            celebration_settle_ms: default_celebration_settle(),
            watcher_grace_ms: default_watcher_grace(),
            toast_display_ms: default_toast_display(),
            toast_hide_ms: default_toast_hide(),
            toast_gap_ms: default_toast_gap(),
        }
    }
}

impl TimingConfig {
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn celebration_settle(&self) -> Duration {
        Duration::from_millis(self.celebration_settle_ms)
    }

    pub fn watcher_grace(&self) -> Duration {
        Duration::from_millis(self.watcher_grace_ms)
    }

    pub fn toast_timings(&self) -> ToastTimings {
        ToastTimings {
            display: Duration::from_millis(self.toast_display_ms),
            hide: Duration::from_millis(self.toast_hide_ms),
            gap: Duration::from_millis(self.toast_gap_ms),
        }
    }
}

/// Toast timers as durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastTimings {
    pub display: Duration,
    pub hide: Duration,
    pub gap: Duration,
}

impl Default for ToastTimings {
    fn default() -> Self {
        TimingConfig::default().toast_timings()
    }
}

/// Progression rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default)]
    pub streak_rule: StreakRule,

    /// How optimistic XP updates cross level boundaries
    #[serde(default)]
    pub rollover: RolloverPolicy,

    /// XP per completed task before the tier multiplier
    #[serde(default = "default_base_task_xp")]
    pub base_task_xp: u64,
}

fn default_base_task_xp() -> u64 {
    BASE_TASK_XP
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            streak_rule: StreakRule::default(),
            rollover: RolloverPolicy::default(),
            base_task_xp: default_base_task_xp(),
        }
    }
}

/// Full habitkit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("habitkit").join("config.toml"))
    }

    /// Load config from the default location, or return defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Config::default();
        };
        if !path.exists() {
            return Config::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            warn!("Invalid config at {}, using defaults: {}", path.display(), e);
            Config::default()
        })
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the default config (for `habitkit init`-style setups)
    pub fn save_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timing.refresh_debounce_ms, 1_000);
        assert_eq!(config.timing.celebration_settle_ms, 100);
        assert_eq!(config.timing.watcher_grace_ms, 500);
        assert_eq!(config.timing.toast_display_ms, 5_000);
        assert_eq!(config.progression.streak_rule, StreakRule::AnyProgress);
        assert_eq!(config.progression.rollover, RolloverPolicy::Loop);
    }

    #[test]
    fn test_parse_toml_partial() {
        let toml_str = r#"
[timing]
toast_display_ms = 3000

[progression]
streak_rule = "full_completion"
rollover = "single"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timing.toast_display_ms, 3_000);
        // Defaults for missing fields
        assert_eq!(config.timing.toast_hide_ms, 300);
        assert_eq!(config.progression.streak_rule, StreakRule::FullCompletion);
        assert_eq!(config.progression.rollover, RolloverPolicy::Single);
        assert_eq!(config.progression.base_task_xp, BASE_TASK_XP);
    }

    #[test]
    fn test_toast_timings() {
        let t = TimingConfig::default().toast_timings();
        assert_eq!(t.display, Duration::from_secs(5));
        assert_eq!(t.hide + t.gap, Duration::from_millis(450));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::save_default(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timing.toast_gap_ms, 150);
    }

    #[test]
    fn test_load_from_invalid_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timing = 7").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
