//! Configuration parsing and validation.
//!
//! tvgrid is configured via a TOML file (default: `config/tvgrid.toml`).
//! Only `[db]` is required; every other section falls back to defaults
//! that match the epguides prime-time grid.
//!
//! # Example
//!
//! ```toml
//! [db]
//! path = "./data/tvgrid.sqlite"
//!
//! [source]
//! grid_url = "http://epguides.com/grid/"
//! base_url = "http://www.epguides.com"
//!
//! [schedule]
//! start = "20:00"
//! last_day_start = "19:00"
//! slot_minutes = 30
//!
//! [time]
//! source_zone = "est"
//! target_zone = "kst"
//!
//! [sync]
//! concurrency = 4
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use tvgrid_core::grid::GridLayout;
use tvgrid_core::temporal::{
    resolve_zone, TemporalNormalizer, DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT,
};
use tvgrid_core::timeslot::ClockTime;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Where the grid lives and how relative show links resolve.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_grid_url")]
    pub grid_url: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            grid_url: default_grid_url(),
            base_url: default_base_url(),
        }
    }
}

fn default_grid_url() -> String {
    "http://epguides.com/grid/".to_string()
}
fn default_base_url() -> String {
    "http://www.epguides.com".to_string()
}

/// Grid clock: first slot of the day and slot width.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_last_day_start")]
    pub last_day_start: String,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            last_day_start: default_last_day_start(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

fn default_start() -> String {
    "20:00".to_string()
}
fn default_last_day_start() -> String {
    "19:00".to_string()
}
const MINUTES_PER_DAY: u32 = 24 * 60;

fn default_slot_minutes() -> u32 {
    30
}

/// Zones and formats for air-date normalization.
#[derive(Debug, Deserialize, Clone)]
pub struct TimeConfig {
    /// Zone the grid and listings are published in.
    #[serde(default = "default_source_zone")]
    pub source_zone: String,
    /// Zone air times are stored and classified in.
    #[serde(default = "default_target_zone")]
    pub target_zone: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            source_zone: default_source_zone(),
            target_zone: default_target_zone(),
            date_format: default_date_format(),
            time_format: default_time_format(),
        }
    }
}

fn default_source_zone() -> String {
    "est".to_string()
}
fn default_target_zone() -> String {
    "kst".to_string()
}
fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}
fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Shows fetched and parsed at once after the grid pass.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Grid layout derived from `[source]` and `[schedule]`.
    pub fn grid_layout(&self) -> Result<GridLayout> {
        Ok(GridLayout {
            base_url: self.source.base_url.clone(),
            start: parse_clock("schedule.start", &self.schedule.start)?,
            last_day_start: parse_clock("schedule.last_day_start", &self.schedule.last_day_start)?,
            slot_minutes: self.schedule.slot_minutes,
        })
    }

    /// Normalizer for the configured source zone and formats.
    pub fn normalizer(&self) -> Result<TemporalNormalizer> {
        Ok(TemporalNormalizer::new(&self.time.source_zone)?
            .with_formats(&self.time.date_format, &self.time.time_format))
    }
}

fn parse_clock(key: &str, value: &str) -> Result<ClockTime> {
    value
        .parse::<ClockTime>()
        .map_err(|e| anyhow::anyhow!("{} is not a valid HH:MM time: {}", key, e))
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.schedule.slot_minutes == 0 || config.schedule.slot_minutes > MINUTES_PER_DAY {
        anyhow::bail!("schedule.slot_minutes must be between 1 and {}", MINUTES_PER_DAY);
    }

    if config.sync.concurrency == 0 {
        anyhow::bail!("sync.concurrency must be > 0");
    }

    config.grid_layout()?;

    resolve_zone(&config.time.source_zone)
        .with_context(|| format!("time.source_zone '{}'", config.time.source_zone))?;
    resolve_zone(&config.time.target_zone)
        .with_context(|| format!("time.target_zone '{}'", config.time.target_zone))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("tvgrid.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "[db]\npath = \"./data/tvgrid.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.schedule.slot_minutes, 30);
        assert_eq!(config.time.target_zone, "kst");
        let layout = config.grid_layout().unwrap();
        assert_eq!(layout.start, ClockTime::new(20, 0));
        assert_eq!(layout.last_day_start, ClockTime::new(19, 0));
    }

    #[test]
    fn test_rejects_unknown_zone() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "[db]\npath = \"x.sqlite\"\n[time]\ntarget_zone = \"Nowhere/Land\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown timezone"));
    }

    #[test]
    fn test_rejects_zero_slot_and_bad_start() {
        let dir = TempDir::new().unwrap();
        let zero = write(&dir, "[db]\npath = \"x.sqlite\"\n[schedule]\nslot_minutes = 0\n");
        assert!(load_config(&zero).is_err());

        let huge = write(&dir, "[db]\npath = \"x.sqlite\"\n[schedule]\nslot_minutes = 100000\n");
        assert!(load_config(&huge).is_err());

        let bad = write(&dir, "[db]\npath = \"x.sqlite\"\n[schedule]\nstart = \"8pm\"\n");
        assert!(load_config(&bad).is_err());
    }
}
