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

//! Fan actuation through the BMC
//!
//! Each cycle renders the configured command templates with the duty code and
//! hands them to an `Actuator`. The stock templates are the X9 raw commands
//! for the CPU and peripheral fan zones.

use std::time::Duration;

use tracing::debug;

use crate::constants::ipmi;
use crate::curve::DutyCode;
use crate::error::{ChairmanError, Result};
use crate::process::{self, display_command};

/// One rendered management command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationCommand {
    /// Position of the template in the configuration (fan zone)
    pub channel: usize,
    pub argv: Vec<String>,
}

impl ActuationCommand {
    pub fn display(&self) -> String {
        display_command(&self.argv)
    }
}

/// Substitute the hex duty code into every `{duty}` placeholder
pub fn render_command(channel: usize, template: &[String], duty: DutyCode) -> ActuationCommand {
    let hex = duty.to_hex();
    ActuationCommand {
        channel,
        argv: template
            .iter()
            .map(|part| part.replace(ipmi::DUTY_PLACEHOLDER, &hex))
            .collect(),
    }
}

pub fn render_commands(templates: &[Vec<String>], duty: DutyCode) -> Vec<ActuationCommand> {
    templates
        .iter()
        .enumerate()
        .map(|(channel, template)| render_command(channel, template, duty))
        .collect()
}

/// The stock two-zone templates
pub fn default_templates() -> Vec<Vec<String>> {
    [ipmi::CPU_ZONE_COMMAND, ipmi::PERIPHERAL_ZONE_COMMAND]
        .iter()
        .map(|cmd| cmd.iter().map(|s| s.to_string()).collect())
        .collect()
}

/// Applies a rendered command to the hardware
#[cfg_attr(test, mockall::automock)]
pub trait Actuator {
    fn apply(&mut self, command: &ActuationCommand) -> Result<()>;
}

/// Executes actuation commands as child processes
#[derive(Debug, Clone)]
pub struct CommandActuator {
    timeout: Duration,
}

impl CommandActuator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Actuator for CommandActuator {
    fn apply(&mut self, command: &ActuationCommand) -> Result<()> {
        let shown = command.display();
        if command.argv.is_empty() {
            return Err(ChairmanError::EmptyCommand);
        }
        let child = process::spawn(&command.argv).map_err(|source| ChairmanError::ActuationLaunch {
            command: shown.clone(),
            source,
        })?;
        let output = process::wait_with_timeout(child, &shown, self.timeout)?;

        if !output.success() {
            return Err(ChairmanError::ActuationFailed {
                command: shown,
                code: output.status.code(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        debug!("Actuation channel {} ok: {}", command.channel, shown);
        Ok(())
    }
}
