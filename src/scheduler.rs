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

//! Cycle scheduling
//!
//! Runs the control cycle once, or forever with a fixed pause between cycles.
//! Cycles never overlap: a cycle, including its external commands, finishes
//! before the pause starts. The forever loop ends only when the shared
//! shutdown flag is raised (Ctrl-C / SIGTERM).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::actuator::Actuator;
use crate::config::{SensorFailurePolicy, Settings};
use crate::constants::timing;
use crate::cycle::{ControlCycle, CycleOutcome};
use crate::error::Result;
use crate::logger;
use crate::sensors::SensorSource;

/// Raise `shutdown` on SIGINT or SIGTERM so the forever loop stops between cycles
pub fn install_shutdown_handler(shutdown: Arc<AtomicBool>) -> std::result::Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("SIGNAL: Received interrupt or termination - stopping after the current cycle");
        shutdown.store(true, Ordering::SeqCst);
    })
}

/// What the process was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Help,
    Table,
    Once { debug: bool },
    Forever { interval: Duration, debug: bool },
}

impl Mode {
    /// Runtime settings for the cycle modes
    pub fn settings(&self) -> Settings {
        match *self {
            Mode::Once { debug } => Settings { interval: None, debug },
            Mode::Forever { interval, debug } => Settings { interval: Some(interval), debug },
            Mode::Help | Mode::Table => Settings::default(),
        }
    }

    /// Whether this mode touches sensors and actuators
    pub fn runs_cycles(&self) -> bool {
        matches!(self, Mode::Once { .. } | Mode::Forever { .. })
    }
}

/// Pause between cycles
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps on the current thread, waking early once shutdown is requested
#[derive(Debug, Clone)]
pub struct ThreadSleeper {
    shutdown: Arc<AtomicBool>,
}

impl ThreadSleeper {
    pub fn new(shutdown: Arc<AtomicBool>) -> Self {
        Self { shutdown }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let slice = Duration::from_millis(timing::SLEEP_SLICE_MS);
        while !self.shutdown.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}

/// Counters kept by the forever loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub actuated: u64,
    pub idle: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub actuation_failures: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Idle => self.idle += 1,
            CycleOutcome::Rejected { .. } => self.rejected += 1,
            CycleOutcome::Actuated(report) => {
                self.actuated += 1;
                self.actuation_failures += report.failures.len() as u64;
            }
        }
    }
}

pub struct Scheduler<S, A, Z> {
    cycle: ControlCycle<S, A>,
    sleeper: Z,
    on_sensor_failure: SensorFailurePolicy,
    shutdown: Arc<AtomicBool>,
}

impl<S: SensorSource, A: Actuator, Z: Sleeper> Scheduler<S, A, Z> {
    pub fn new(
        cycle: ControlCycle<S, A>,
        sleeper: Z,
        on_sensor_failure: SensorFailurePolicy,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cycle,
            sleeper,
            on_sensor_failure,
            shutdown,
        }
    }

    pub fn cycle(&self) -> &ControlCycle<S, A> {
        &self.cycle
    }

    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    /// Run a single cycle. Any error is returned to the caller.
    pub fn run_once(&mut self) -> Result<CycleOutcome> {
        self.cycle.run()
    }

    /// Cycle, pause `interval`, repeat until shutdown.
    ///
    /// Returns `Err` only when the sensor source cannot be started and the
    /// policy is `abort`. Every other failure skips the cycle.
    pub fn run_forever(&mut self, interval: Duration) -> Result<LoopStats> {
        info!("Control loop starting, interval {:?}", interval);
        let mut stats = LoopStats::default();
        let mut consecutive_errors: u32 = 0;

        while !self.shutdown.load(Ordering::SeqCst) {
            stats.cycles += 1;

            match self.cycle.run() {
                Ok(outcome) => {
                    if consecutive_errors > 0 {
                        info!("Control loop recovered after {} skipped cycle(s)", consecutive_errors);
                        consecutive_errors = 0;
                    }
                    stats.record(&outcome);
                }
                Err(e) if e.is_sensor_failure() && self.on_sensor_failure == SensorFailurePolicy::Abort => {
                    error!("Sensor source unavailable, aborting: {}", e);
                    logger::log_event("loop_aborted", json!({ "error": e.to_string() }));
                    return Err(e);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    stats.skipped += 1;
                    if consecutive_errors == 1 || consecutive_errors % timing::MAX_CONSECUTIVE_ERRORS == 0 {
                        if e.is_timeout() {
                            warn!("Cycle skipped (count: {}): {}", consecutive_errors, e);
                        } else {
                            error!("Cycle skipped (count: {}): {}", consecutive_errors, e);
                        }
                    } else {
                        debug!("Cycle skipped (count: {}): {}", consecutive_errors, e);
                    }
                    logger::log_event(
                        "cycle_skipped",
                        json!({ "error": e.to_string(), "consecutive": consecutive_errors }),
                    );
                }
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.sleeper.sleep(interval);
        }

        info!("Control loop stopped after {} cycle(s)", stats.cycles);
        Ok(stats)
    }
}
