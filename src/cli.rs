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

//! Command line parsing
//!
//! Accepted shapes:
//!
//! ```text
//! chairman                    one cycle
//! chairman --help             usage
//! chairman --table            curve sweep 0-100 °C
//! chairman --debug            one cycle with diagnostics
//! chairman INTERVAL [--debug] cycle every INTERVAL seconds
//! ```

use std::time::Duration;

use crate::constants::{curve, paths, timing};
use crate::error::{ChairmanError, Result};
use crate::scheduler::Mode;

/// Parse the arguments after the program name
pub fn parse_args(args: &[String]) -> Result<Mode> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] => Ok(Mode::Once { debug: false }),
        ["--help"] => Ok(Mode::Help),
        ["--table"] => Ok(Mode::Table),
        ["--debug"] => Ok(Mode::Once { debug: true }),
        [flag] if flag.starts_with("--") => Err(ChairmanError::InvalidArguments(format!("unknown option {}", flag))),
        [interval] => Ok(Mode::Forever { interval: parse_interval(interval)?, debug: false }),
        [interval, "--debug"] if !interval.starts_with("--") => Ok(Mode::Forever { interval: parse_interval(interval)?, debug: true }),
        _ => Err(ChairmanError::InvalidArguments(args.join(" "))),
    }
}

/// Whole-string decimal seconds, at least 1
pub fn parse_interval(s: &str) -> Result<Duration> {
    match s.parse::<i64>() {
        Ok(secs) if secs >= timing::MIN_INTERVAL_SECS as i64 => Ok(Duration::from_secs(secs as u64)),
        _ => Err(ChairmanError::InvalidInterval(s.to_string())),
    }
}

pub fn usage(program: &str) -> String {
    format!(
        "Execute: {program} [--help | --table | --debug | INTERVAL [--debug]]

Temperature control for X9 based Supermicro boards.
Bang-bang control: the hottest sensor sets one duty code per interval.

Options:
  (none)              run one control cycle and exit
  --help              show this help and exit
  --table             print the curve for {min}-{max} °C and exit
  --debug             run one control cycle and print the selected
                      temperature and duty code
  INTERVAL [--debug]  run a control cycle every INTERVAL seconds (>= {min_interval})

Relational approach g(x) = e^((x - {offset}) / {divisor}) + {floor}

Configuration: {dir}/{file} (override with {config_env})
Log filter:    {log_env} (default: info)
",
        program = program,
        min = curve::TABLE_MIN_TEMP,
        max = curve::TABLE_MAX_TEMP,
        min_interval = timing::MIN_INTERVAL_SECS,
        offset = curve::INFLECTION_OFFSET,
        divisor = curve::SLOPE_DIVISOR,
        floor = curve::SPEED_FLOOR,
        dir = paths::CONFIG_DIR,
        file = paths::CONFIG_FILE,
        config_env = paths::CONFIG_ENV,
        log_env = paths::LOG_ENV,
    )
}
