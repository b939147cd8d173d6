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

//! Chairman - fan control loop for X9 based Supermicro boards
//!
//! Reads chassis temperatures from an external sensor command, maps the
//! hottest one through a fixed response curve to a duty code, and applies it
//! to the BMC fan zones with IPMI raw commands. Runs once or at a fixed
//! interval.

pub mod actuator;
pub mod cli;
pub mod config;
pub mod constants;
pub mod curve;
pub mod cycle;
pub mod error;
pub mod logger;
pub mod process;
pub mod ranker;
pub mod readings;
pub mod scheduler;
pub mod sensors;

#[cfg(test)]
pub mod test_utils;

pub use error::{ChairmanError, Result};
