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

//! Constants and defaults for Chairman
//!
//! Centralizes the curve coefficients, fan geometry, buffer bounds and timing
//! values. Other modules refer to these instead of repeating literals.

/// Temperature response curve `g(x) = e^((x - 17.33793493) / 15) + 7.65`
pub mod curve {
    /// Temperature at which the exponential term equals 1
    pub const INFLECTION_OFFSET: f64 = 17.33793493;

    /// Divisor applied to the temperature offset inside the exponent
    pub const SLOPE_DIVISOR: f64 = 15.0;

    /// Additive floor the curve approaches at low temperatures
    pub const SPEED_FLOOR: f64 = 7.65;

    /// First temperature printed by `--table`
    pub const TABLE_MIN_TEMP: i32 = 0;

    /// Last temperature printed by `--table` (inclusive)
    pub const TABLE_MAX_TEMP: i32 = 100;
}

/// Fan geometry, assuming the stock Supermicro chassis fan
pub mod fan {
    /// Fan speed at full duty cycle, in RPM
    pub const MAX_FAN_RPM: u32 = 12_000;

    /// Largest duty code the BMC accepts
    pub const MAX_DUTY_CODE: i32 = 255;

    /// RPM per duty step. Integer division, used for diagnostics only.
    pub const RPM_PER_DUTY_STEP: u32 = MAX_FAN_RPM / MAX_DUTY_CODE as u32;
}

/// Sensor buffer bounds
pub mod sensors {
    /// Default number of readings taken per cycle
    pub const DEFAULT_CAPACITY: usize = 24;

    /// Upper bound accepted from configuration
    pub const MAX_CAPACITY: usize = 256;
}

/// Intervals and timeouts
pub mod timing {
    /// Shortest accepted control interval in seconds
    pub const MIN_INTERVAL_SECS: u64 = 1;

    /// Default bound for every external command
    pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5_000;

    /// Upper bound accepted from configuration
    pub const MAX_COMMAND_TIMEOUT_MS: u64 = 60_000;

    /// Poll period while waiting for a child process
    pub const PROCESS_POLL_MS: u64 = 10;

    /// Granularity of the interruptible interval sleep
    pub const SLEEP_SLICE_MS: u64 = 100;

    /// Consecutive cycle errors between repeated error logs
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;
}

/// Filesystem locations and environment variables
pub mod paths {
    /// System configuration directory
    pub const CONFIG_DIR: &str = "/etc/chairman";

    /// Configuration file name inside `CONFIG_DIR`
    pub const CONFIG_FILE: &str = "config.json";

    /// Overrides the configuration file location
    pub const CONFIG_ENV: &str = "CHAIRMAN_CONFIG";

    /// Log filter for the tracing subscriber
    pub const LOG_ENV: &str = "CHAIRMAN_LOG";

    /// Sensor enumeration command used when none is configured
    pub const DEFAULT_SENSOR_COMMAND: &str = "/usr/lib/chairman/sensors.sh";

    /// systemd journal socket, probed to pick the log sink
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// IPMI actuation defaults
pub mod ipmi {
    /// Placeholder replaced by the hex duty code in command templates
    pub const DUTY_PLACEHOLDER: &str = "{duty}";

    /// X9 raw command prefix for the CPU zone
    pub const CPU_ZONE_COMMAND: &[&str] =
        &["ipmitool", "raw", "0x30", "0x91", "0x5a", "0x03", "0x10", DUTY_PLACEHOLDER];

    /// X9 raw command prefix for the peripheral zone
    pub const PERIPHERAL_ZONE_COMMAND: &[&str] =
        &["ipmitool", "raw", "0x30", "0x91", "0x5a", "0x03", "0x11", DUTY_PLACEHOLDER];
}
