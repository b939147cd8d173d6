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

//! Per-cycle sensor readings
//!
//! A `ReadingBuffer` is allocated fresh for every control cycle with all slots
//! absent, so nothing read in an earlier cycle can win a later selection.

use std::fmt;

use crate::ranker;

/// A strictly positive temperature reading, in the unit the sensor source reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reading(i32);

impl Reading {
    /// Returns `None` for zero and negative values, which mark absent sensors
    pub fn new(raw: i32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity reading slots for one cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadingBuffer {
    slots: Vec<Option<Reading>>,
    filled: usize,
}

impl ReadingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            filled: 0,
        }
    }

    /// Build a buffer from raw values, dropping anything past `capacity`
    pub fn from_raw(capacity: usize, raw: &[i32]) -> Self {
        let mut buf = Self::with_capacity(capacity);
        for &value in raw {
            if !buf.push(Some(value)) {
                break;
            }
        }
        buf
    }

    /// Store the next slot. `None` (malformed input) and non-positive values
    /// occupy the slot as absent. Returns `false` when the buffer is full.
    pub fn push(&mut self, raw: Option<i32>) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.filled] = raw.and_then(Reading::new);
        self.filled += 1;
        true
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots written this cycle, valid or not
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_full(&self) -> bool {
        self.filled >= self.slots.len()
    }

    pub fn slots(&self) -> &[Option<Reading>] {
        &self.slots
    }

    /// Number of present readings
    pub fn valid_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Rank the whole buffer and return the hottest present reading
    pub fn highest(mut self) -> Option<Reading> {
        ranker::select_highest(&mut self.slots)
    }
}
