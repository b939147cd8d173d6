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

//! Sensor acquisition
//!
//! Temperatures come from an external enumeration command whose output has
//! one `<label> <integer>` entry per line. Each line fills the next buffer
//! slot; a line whose value does not parse leaves its slot absent.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ChairmanError, Result};
use crate::process::{self, display_command};
use crate::readings::ReadingBuffer;

/// Source of one cycle's raw temperature readings
#[cfg_attr(test, mockall::automock)]
pub trait SensorSource {
    /// Produce a fresh buffer with at most `capacity` slots filled
    fn acquire(&mut self, capacity: usize) -> Result<ReadingBuffer>;
}

/// Runs the configured sensor command and parses its output
#[derive(Debug, Clone)]
pub struct CommandSensorSource {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandSensorSource {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

impl SensorSource for CommandSensorSource {
    fn acquire(&mut self, capacity: usize) -> Result<ReadingBuffer> {
        let shown = display_command(&self.command);
        let child = process::spawn(&self.command).map_err(|source| ChairmanError::SensorSourceUnavailable {
            command: shown.clone(),
            source,
        })?;
        let output = process::wait_with_timeout(child, &shown, self.timeout)?;

        if !output.success() {
            // The listing is still usable; a partial one is better than none.
            warn!(
                "Sensor command `{}` exited with {}: {}",
                shown,
                output.status,
                output.stderr.trim()
            );
        }

        Ok(parse_sensor_output(&output.stdout, capacity))
    }
}

/// Fill a buffer from sensor listing text. Blank lines are skipped.
pub fn parse_sensor_output(text: &str, capacity: usize) -> ReadingBuffer {
    let mut buf = ReadingBuffer::with_capacity(capacity);
    let mut dropped = 0usize;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let value = parse_sensor_line(line);
        if value.is_none() {
            debug!("Malformed sensor line treated as absent: {:?}", line);
        }
        if !buf.push(value) {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!("Ignored {} sensor line(s) beyond capacity {}", dropped, capacity);
    }
    buf
}

/// Value of a `<label> <integer>` line. The label may contain spaces; the
/// value is the trailing token.
pub fn parse_sensor_line(line: &str) -> Option<i32> {
    let mut tokens = line.split_whitespace();
    let value = tokens.next_back()?;
    // A lone token has no label.
    tokens.next()?;
    parse_c_integer(value).and_then(|v| i32::try_from(v).ok())
}

/// Parse the leading integer of `s` the way `scanf("%i")` does: optional
/// sign, then `0x` hex, leading-zero octal, or decimal. Trailing garbage
/// after the digits is ignored.
pub fn parse_c_integer(s: &str) -> Option<i64> {
    let (negative, rest) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        if hex.starts_with(|c: char| c.is_ascii_hexdigit()) {
            (16, hex)
        } else {
            // "0x" with no hex digits reads as the zero before the x.
            (8, "0")
        }
    } else if rest.starts_with('0') {
        (8, rest)
    } else {
        (10, rest)
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = i64::from_str_radix(&digits[..end], radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
