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

//! Temperature response curve
//!
//! `calculate_fan_speed` maps a temperature to a continuous speed value using
//! `g(x) = e^((x - 17.33793493) / 15) + 7.65`, fitted to the PWM/RPM behaviour
//! of the stock X9 chassis fan. `interpolate_fan_speed` rounds that value to
//! the duty code sent to the BMC.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{curve as curve_const, fan};
use crate::error::{ChairmanError, Result};

/// Continuous fan speed for a temperature. Monotonically increasing.
pub fn calculate_fan_speed(temp: f64) -> f64 {
    ((temp - curve_const::INFLECTION_OFFSET) / curve_const::SLOPE_DIVISOR).exp() + curve_const::SPEED_FLOOR
}

/// Round half away from zero, truncating after the 0.5 shift.
pub fn interpolate_fan_speed(speed: f64) -> DutyCode {
    let shifted = if speed < 0.0 { speed - 0.5 } else { speed + 0.5 };
    // `as` truncates toward zero and saturates on overflow or infinity.
    DutyCode(shifted as i32)
}

/// What to do with duty codes outside 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DutyRange {
    /// Send the code unchanged
    Passthrough,
    /// Saturate into 0-255
    #[default]
    Clamp,
    /// Skip actuation for this cycle
    Reject,
}

/// Quantized duty cycle code
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DutyCode(i32);

impl DutyCode {
    pub fn new(code: i32) -> Self {
        Self(code)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn in_range(self) -> bool {
        (0..=fan::MAX_DUTY_CODE).contains(&self.0)
    }

    /// Lowercase hex with a `0x` prefix and no padding, e.g. `0x9`, `0xff`.
    /// Codes leaving `apply_range` are never negative, so no two's complement
    /// rendering reaches a command line.
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }

    /// Approximate fan speed in RPM ("1/60s") for diagnostics
    pub fn estimated_rpm(self) -> f64 {
        f64::from(self.0) * f64::from(fan::RPM_PER_DUTY_STEP)
    }

    /// Apply the configured out-of-range policy
    pub fn apply_range(self, policy: DutyRange) -> Result<DutyCode> {
        if self.in_range() {
            return Ok(self);
        }
        match policy {
            // Only the upper bound passes through; a negative code has no byte form.
            DutyRange::Passthrough => Ok(Self(self.0.max(0))),
            DutyRange::Clamp => Ok(Self(self.0.clamp(0, fan::MAX_DUTY_CODE))),
            DutyRange::Reject => Err(ChairmanError::DutyOutOfRange { code: self.0 }),
        }
    }
}

impl fmt::Display for DutyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One row of the `--table` sweep
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableRow {
    pub temp: i32,
    pub speed: f64,
    pub rpm: f64,
}

/// Evaluate the curve for every integer temperature from 0 to 100
pub fn sweep_table() -> Vec<TableRow> {
    (curve_const::TABLE_MIN_TEMP..=curve_const::TABLE_MAX_TEMP)
        .map(|temp| {
            let speed = calculate_fan_speed(f64::from(temp));
            TableRow {
                temp,
                speed,
                rpm: speed * f64::from(fan::RPM_PER_DUTY_STEP),
            }
        })
        .collect()
}

pub fn format_table_row(row: &TableRow) -> String {
    format!("{:>3} °C: {:.6} = {:.6} 1/60s", row.temp, row.speed, row.rpm)
}
