use anyhow::{anyhow, bail, Result};
use chrono::FixedOffset;
use std::path::PathBuf;

use crate::database::KeyValueStore;
use crate::models::{reference_offset, REFERENCE_UTC_OFFSET_HOURS};

pub const SCHEDULE_SOURCE_KEY: &str = "schedule_source";
pub const REPAIR_SOURCE_KEY: &str = "repair_source";
pub const UTC_OFFSET_KEY: &str = "utc_offset_hours";

pub const SETTING_KEYS: [&str; 3] = [SCHEDULE_SOURCE_KEY, REPAIR_SOURCE_KEY, UTC_OFFSET_KEY];

const ENV_VARS: [(&str, &str); 3] = [
    ("UPKEEP_SCHEDULE_SOURCE", SCHEDULE_SOURCE_KEY),
    ("UPKEEP_REPAIR_SOURCE", REPAIR_SOURCE_KEY),
    ("UPKEEP_UTC_OFFSET", UTC_OFFSET_KEY),
];

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

/// `UPKEEP_DB` if set, otherwise `~/.upkeep.db`.
pub fn default_db_path() -> PathBuf {
    std::env::var("UPKEEP_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".upkeep.db"))
}

pub fn log_file_path() -> PathBuf {
    home_dir().join(".upkeep").join("upkeep.log")
}

/// Rejects unknown keys and out-of-range offsets before they reach the store.
pub fn validate_setting(key: &str, value: &str) -> Result<()> {
    match key {
        SCHEDULE_SOURCE_KEY | REPAIR_SOURCE_KEY => {
            if value.trim().is_empty() {
                bail!("'{}' cannot be empty", key);
            }
            Ok(())
        }
        UTC_OFFSET_KEY => parse_offset(value).map(|_| ()),
        _ => Err(anyhow!(
            "Unknown setting '{}'. Valid settings: {}",
            key,
            SETTING_KEYS.join(", ")
        )),
    }
}

fn parse_offset(value: &str) -> Result<i32> {
    let hours: i32 = value
        .trim()
        .parse()
        .map_err(|_| anyhow!("'{}' is not a whole number of hours", value))?;
    if !(-12..=14).contains(&hours) {
        bail!("UTC offset {} is outside -12..=14", hours);
    }
    Ok(hours)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub schedule_source: String,
    pub repair_source: String,
    pub utc_offset_hours: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            schedule_source: "maintenance.json".to_string(),
            repair_source: "repairs.json".to_string(),
            utc_offset_hours: REFERENCE_UTC_OFFSET_HOURS,
        }
    }
}

impl Settings {
    /// Defaults, then the settings table, then the environment.
    pub fn resolve(store: &dyn KeyValueStore) -> Result<Self> {
        let mut settings = Settings::default();
        settings.apply_store(store)?;
        settings.apply_env(|name| std::env::var(name).ok())?;
        log::debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }

    pub fn apply_store(&mut self, store: &dyn KeyValueStore) -> Result<()> {
        for key in SETTING_KEYS {
            if let Some(value) = store.get(key)? {
                self.apply(key, &value)?;
            }
        }
        Ok(())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        for (name, key) in ENV_VARS {
            if let Some(value) = lookup(name) {
                self.apply(key, &value)
                    .map_err(|e| anyhow!("{} is invalid: {}", name, e))?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        validate_setting(key, value)?;
        match key {
            SCHEDULE_SOURCE_KEY => self.schedule_source = value.trim().to_string(),
            REPAIR_SOURCE_KEY => self.repair_source = value.trim().to_string(),
            UTC_OFFSET_KEY => self.utc_offset_hours = parse_offset(value)?,
            _ => {}
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        reference_offset(self.utc_offset_hours)
    }
}
