/*
 * This file is part of Chairman.
 *
 * Copyright (C) 2025 Chairman contributors
 *
 * Chairman is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Chairman is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Chairman. If not, see <https://www.gnu.org/licenses/>.
 */


use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actuator::default_templates;
use crate::constants::{ipmi, paths, sensors, timing};
use crate::curve::DutyRange;
use crate::error::{ChairmanError, Result};

/// What the forever loop does when the sensor command cannot be started
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorFailurePolicy {
    /// Log, skip the cycle and retry after the interval
    #[default]
    Skip,
    /// Stop the loop and exit with an error
    Abort,
}

fn default_capacity() -> usize { sensors::DEFAULT_CAPACITY }
fn default_sensor_command() -> Vec<String> { vec![paths::DEFAULT_SENSOR_COMMAND.to_string()] }
fn default_command_timeout_ms() -> u64 { timing::DEFAULT_COMMAND_TIMEOUT_MS }

/// Contents of `/etc/chairman/config.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum number of sensor readings per cycle
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Sensor enumeration command (argv)
    #[serde(default = "default_sensor_command")]
    pub sensor_command: Vec<String>,
    /// Actuation command templates, exactly one per fan zone; `{duty}` is replaced by the hex code
    #[serde(default = "default_templates")]
    pub actuation_commands: Vec<Vec<String>>,
    /// Deadline for every external command
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Handling of duty codes outside 0-255
    #[serde(default)]
    pub duty_range: DutyRange,
    #[serde(default)]
    pub on_sensor_failure: SensorFailurePolicy,
    /// Optional JSON-lines event log
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            sensor_command: default_sensor_command(),
            actuation_commands: default_templates(),
            command_timeout_ms: default_command_timeout_ms(),
            duty_range: DutyRange::default(),
            on_sensor_failure: SensorFailurePolicy::default(),
            event_log: None,
        }
    }
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Load from `config_path()`. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| ChairmanError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Config = serde_json::from_str(&data)?;
        validate_config(&cfg).map_err(ChairmanError::config)?;
        Ok(cfg)
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(p) = env::var(paths::CONFIG_ENV) {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    Path::new(paths::CONFIG_DIR).join(paths::CONFIG_FILE)
}

fn validate_argv(argv: &[String], what: &str) -> std::result::Result<(), String> {
    if argv.is_empty() || argv[0].trim().is_empty() {
        return Err(format!("{} must name a program", what));
    }
    if argv.len() > 64 {
        return Err(format!("{} has too many arguments (max 64)", what));
    }
    Ok(())
}

pub fn validate_config(cfg: &Config) -> std::result::Result<(), String> {
    if cfg.capacity == 0 || cfg.capacity > sensors::MAX_CAPACITY {
        return Err(format!("capacity must be 1-{}", sensors::MAX_CAPACITY));
    }
    validate_argv(&cfg.sensor_command, "sensor_command")?;
    // One command per fan zone: the CPU zone and the peripheral zone.
    if cfg.actuation_commands.len() != 2 {
        return Err(format!(
            "actuation_commands must hold exactly 2 templates (one per fan zone), got {}",
            cfg.actuation_commands.len()
        ));
    }
    if cfg.actuation_commands[0] == cfg.actuation_commands[1] {
        return Err("actuation_commands must address two distinct fan zones".into());
    }
    for template in &cfg.actuation_commands {
        validate_argv(template, "actuation command")?;
        if !template.iter().any(|part| part.contains(ipmi::DUTY_PLACEHOLDER)) {
            return Err(format!("actuation command missing {} placeholder", ipmi::DUTY_PLACEHOLDER));
        }
    }
    if cfg.command_timeout_ms == 0 || cfg.command_timeout_ms > timing::MAX_COMMAND_TIMEOUT_MS {
        return Err(format!("command_timeout_ms must be 1-{}", timing::MAX_COMMAND_TIMEOUT_MS));
    }
    Ok(())
}

/// Runtime options taken from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Pause between cycles; `None` runs a single cycle
    pub interval: Option<Duration>,
    /// Print the selected reading and duty code each cycle
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.capacity, 24);
        assert_eq!(cfg.actuation_commands.len(), 2);
        assert_eq!(cfg.duty_range, DutyRange::Clamp);
        assert_eq!(cfg.on_sensor_failure, SensorFailurePolicy::Skip);
        assert_eq!(cfg.command_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let f = write_config(r#"{ "capacity": 8, "duty_range": "reject", "on_sensor_failure": "abort" }"#);
        let cfg = Config::load_from(f.path()).unwrap();
        assert_eq!(cfg.capacity, 8);
        assert_eq!(cfg.duty_range, DutyRange::Reject);
        assert_eq!(cfg.on_sensor_failure, SensorFailurePolicy::Abort);
        assert_eq!(cfg.sensor_command, default_sensor_command());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let f = write_config(r#"{ "interval": 5 }"#);
        assert!(matches!(Config::load_from(f.path()), Err(ChairmanError::JsonParse(_))));
    }

    #[test]
    fn test_validation_errors() {
        let mut cfg = Config::default();
        cfg.capacity = 0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.actuation_commands[1] = vec!["ipmitool".into(), "raw".into(), "0x30".into()];
        assert!(validate_config(&cfg).unwrap_err().contains("placeholder"));

        let mut cfg = Config::default();
        cfg.sensor_command = Vec::new();
        assert!(validate_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.command_timeout_ms = 0;
        assert!(validate_config(&cfg).is_err());

        let f = write_config(r#"{ "capacity": 1000 }"#);
        assert!(matches!(Config::load_from(f.path()), Err(ChairmanError::Config(_))));
    }

    #[test]
    fn test_actuation_commands_must_be_one_pair() {
        let mut cfg = Config::default();
        cfg.actuation_commands.push(cfg.actuation_commands[0].clone());
        assert!(validate_config(&cfg).unwrap_err().contains("exactly 2"));

        let mut cfg = Config::default();
        cfg.actuation_commands.truncate(1);
        assert!(validate_config(&cfg).unwrap_err().contains("exactly 2"));

        let mut cfg = Config::default();
        cfg.actuation_commands[1] = cfg.actuation_commands[0].clone();
        assert!(validate_config(&cfg).unwrap_err().contains("distinct"));

        let f = write_config(
            r#"{ "actuation_commands": [["a", "{duty}"], ["b", "{duty}"], ["c", "{duty}"]] }"#,
        );
        assert!(matches!(Config::load_from(f.path()), Err(ChairmanError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load_from(Path::new("/nonexistent/chairman.json")).unwrap_err();
        assert!(matches!(err, ChairmanError::FileRead { .. }));
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        let f = write_config(r#"{ "capacity": 4 }"#);
        env::set_var(paths::CONFIG_ENV, f.path());
        assert_eq!(config_path(), f.path());
        let cfg = Config::load().unwrap();
        assert_eq!(cfg.capacity, 4);

        env::set_var(paths::CONFIG_ENV, "/nonexistent/dir/config.json");
        assert_eq!(Config::load().unwrap(), Config::default());

        env::remove_var(paths::CONFIG_ENV);
        assert_eq!(config_path(), PathBuf::from("/etc/chairman/config.json"));
    }
}
