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

//! Unified error handling for Chairman
//!
//! One error type covers the control loop, its external commands, the
//! configuration layer and argument parsing.

use std::io;
use std::path::PathBuf;

/// Result type alias using ChairmanError
pub type Result<T> = std::result::Result<T, ChairmanError>;

/// Unified error type for all Chairman operations
#[derive(thiserror::Error, Debug)]
pub enum ChairmanError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // External Command Errors
    // ============================================================================
    #[error("Sensor source unavailable: failed to run `{command}`: {source}")]
    SensorSourceUnavailable {
        command: String,
        source: io::Error,
    },

    #[error("Command `{command}` timed out after {timeout_ms} ms")]
    CommandTimeout {
        command: String,
        timeout_ms: u64,
    },

    #[error("Failed to launch actuation command `{command}`: {source}")]
    ActuationLaunch {
        command: String,
        source: io::Error,
    },

    #[error("Actuation command `{command}` failed (exit code {code:?}): {stderr}")]
    ActuationFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Empty command line")]
    EmptyCommand,

    // ============================================================================
    // Control Errors
    // ============================================================================
    #[error("Duty code {code} outside 0-255")]
    DutyOutOfRange {
        code: i32,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Command Line Errors
    // ============================================================================
    #[error("Invalid interval: {0:?} (expected an integer >= 1)")]
    InvalidInterval(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

impl ChairmanError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors caused by a hung collaborator. The loop always skips these.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::CommandTimeout { .. })
    }

    /// Whether this error came from the sensor side of a cycle
    pub fn is_sensor_failure(&self) -> bool {
        matches!(self, Self::SensorSourceUnavailable { .. })
    }
}
