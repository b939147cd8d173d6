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

//! One control iteration
//!
//! acquire readings -> select the hottest -> curve -> duty code -> actuate.
//! Every zone command is attempted even if an earlier one fails; failures are
//! reported in the outcome rather than aborting the cycle.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::actuator::{render_commands, Actuator};
use crate::config::{Config, Settings};
use crate::curve::{calculate_fan_speed, interpolate_fan_speed, DutyCode, DutyRange};
use crate::error::Result;
use crate::logger;
use crate::readings::Reading;
use crate::sensors::SensorSource;

/// A zone command that did not apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationFailure {
    pub channel: usize,
    pub command: String,
    pub error: String,
}

/// Result of an actuated cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub highest: Reading,
    pub speed: f64,
    pub duty: DutyCode,
    /// Number of commands issued, successful or not
    pub issued: usize,
    pub failures: Vec<ActuationFailure>,
}

impl CycleReport {
    pub fn all_applied(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No strictly positive reading; nothing was sent
    Idle,
    /// The duty code fell outside 0-255 under the `reject` policy
    Rejected { highest: Reading, duty: DutyCode },
    Actuated(CycleReport),
}

pub struct ControlCycle<S, A> {
    source: S,
    actuator: A,
    capacity: usize,
    templates: Vec<Vec<String>>,
    duty_range: DutyRange,
    debug: bool,
}

impl<S: SensorSource, A: Actuator> ControlCycle<S, A> {
    pub fn new(config: &Config, settings: Settings, source: S, actuator: A) -> Self {
        Self {
            source,
            actuator,
            capacity: config.capacity,
            // At most one command per fan zone, even for an unvalidated config.
            templates: config.actuation_commands.iter().take(2).cloned().collect(),
            duty_range: config.duty_range,
            debug: settings.debug,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn run(&mut self) -> Result<CycleOutcome> {
        let readings = self.source.acquire(self.capacity)?;
        debug!(
            "READ: {} slot(s) filled, {} valid, capacity {}",
            readings.filled(),
            readings.valid_count(),
            readings.capacity()
        );

        let filled = readings.filled();
        let Some(highest) = readings.highest() else {
            debug!("No valid temperature reading, skipping actuation");
            logger::log_event("cycle_idle", json!({ "filled": filled }));
            return Ok(CycleOutcome::Idle);
        };

        let speed = calculate_fan_speed(f64::from(highest.value()));
        let raw = interpolate_fan_speed(speed);
        let duty = match raw.apply_range(self.duty_range) {
            Ok(duty) => duty,
            Err(e) => {
                warn!("CONTROL: {} (highest {}), not actuating", e, highest);
                logger::log_event("duty_rejected", json!({ "highest": highest.value(), "duty": raw.value() }));
                return Ok(CycleOutcome::Rejected { highest, duty: raw });
            }
        };
        if duty != raw {
            info!("CONTROL: duty code {} clamped to {}", raw.value(), duty.value());
        }

        if self.debug {
            println!("Highest temp: {}", highest);
            println!("Target fan speed: {} = {:.6} 1/60s\n", duty, duty.estimated_rpm());
        }

        let commands = render_commands(&self.templates, duty);
        let mut failures = Vec::new();
        for command in &commands {
            if let Err(e) = self.actuator.apply(command) {
                warn!("ACTION: zone {} command failed: {}", command.channel, e);
                logger::log_event(
                    "actuation_failed",
                    json!({ "channel": command.channel, "command": command.display(), "error": e.to_string() }),
                );
                failures.push(ActuationFailure {
                    channel: command.channel,
                    command: command.display(),
                    error: e.to_string(),
                });
            }
        }

        debug!(
            "CONTROL: highest={} speed={:.3} duty={} ({} of {} command(s) applied)",
            highest,
            speed,
            duty,
            commands.len() - failures.len(),
            commands.len()
        );
        logger::log_event(
            "cycle",
            json!({
                "highest": highest.value(),
                "speed": speed,
                "duty": duty.to_hex(),
                "failures": failures.len(),
            }),
        );

        Ok(CycleOutcome::Actuated(CycleReport {
            highest,
            speed,
            duty,
            issued: commands.len(),
            failures,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockActuator;
    use crate::error::ChairmanError;
    use crate::readings::ReadingBuffer;
    use crate::sensors::MockSensorSource;
    use crate::test_utils::test_utils::{readings_source, RecordingActuator};
    use mockall::predicate::*;
    use mockall::Sequence;

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn test_cycle_selects_max_and_sends_both_zones() {
        let config = Config::default();
        let mut seq = Sequence::new();
        let mut actuator = MockActuator::new();
        let expected_hex = interpolate_fan_speed(calculate_fan_speed(42.0)).to_hex();
        assert_eq!(expected_hex, "0xd");

        for channel in 0..2usize {
            let hex = expected_hex.clone();
            actuator
                .expect_apply()
                .withf(move |cmd| cmd.channel == channel && cmd.argv.last() == Some(&hex))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[0, 0, 35, 0, 42, 0]), actuator);
        match cycle.run().unwrap() {
            CycleOutcome::Actuated(report) => {
                assert_eq!(report.highest.value(), 42);
                assert_eq!(report.duty.value(), 13);
                assert_eq!(report.issued, 2);
                assert!(report.all_applied());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_cycle_never_issues_more_than_one_pair() {
        let mut config = Config::default();
        let cpu_zone = config.actuation_commands[0].clone();
        config.actuation_commands.extend(std::iter::repeat(cpu_zone).take(3));

        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[50]), RecordingActuator::default());
        let CycleOutcome::Actuated(report) = cycle.run().unwrap() else {
            panic!("expected actuation");
        };
        assert_eq!(report.issued, 2);
        let channels: Vec<usize> = cycle.actuator().commands.iter().map(|c| c.channel).collect();
        assert_eq!(channels, vec![0, 1]);
    }

    #[test]
    fn test_cycle_idle_without_positive_reading() {
        let config = Config::default();
        let mut actuator = MockActuator::new();
        actuator.expect_apply().never();

        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[0, -3, 0]), actuator);
        assert_eq!(cycle.run().unwrap(), CycleOutcome::Idle);
    }

    #[test]
    fn test_cycle_requests_configured_capacity() {
        let mut config = Config::default();
        config.capacity = 7;
        let mut source = MockSensorSource::new();
        source
            .expect_acquire()
            .with(eq(7usize))
            .times(1)
            .returning(|cap| Ok(ReadingBuffer::with_capacity(cap)));

        let mut cycle = ControlCycle::new(&config, settings(), source, RecordingActuator::default());
        assert_eq!(cycle.run().unwrap(), CycleOutcome::Idle);
        assert!(cycle.actuator().commands.is_empty());
    }

    #[test]
    fn test_sensor_failure_propagates() {
        let config = Config::default();
        let mut source = MockSensorSource::new();
        source.expect_acquire().returning(|_| {
            Err(ChairmanError::SensorSourceUnavailable {
                command: "sensors".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        });
        let mut actuator = MockActuator::new();
        actuator.expect_apply().never();

        let mut cycle = ControlCycle::new(&config, settings(), source, actuator);
        assert!(cycle.run().unwrap_err().is_sensor_failure());
    }

    #[test]
    fn test_one_failed_zone_does_not_stop_the_other() {
        let config = Config::default();
        let mut actuator = MockActuator::new();
        actuator
            .expect_apply()
            .withf(|cmd| cmd.channel == 0)
            .times(1)
            .returning(|cmd| {
                Err(ChairmanError::ActuationFailed {
                    command: cmd.display(),
                    code: Some(1),
                    stderr: "Unable to send RAW command".into(),
                })
            });
        actuator
            .expect_apply()
            .withf(|cmd| cmd.channel == 1)
            .times(1)
            .returning(|_| Ok(()));

        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[50]), actuator);
        let CycleOutcome::Actuated(report) = cycle.run().unwrap() else {
            panic!("expected actuation");
        };
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].channel, 0);
        assert!(report.failures[0].error.contains("Unable to send RAW command"));
        assert_eq!(report.duty.value(), 16);
    }

    #[test]
    fn test_out_of_range_duty_policies() {
        // 101 degrees maps to duty code 272.
        let mut config = Config::default();
        config.duty_range = DutyRange::Reject;
        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[101]), RecordingActuator::default());
        match cycle.run().unwrap() {
            CycleOutcome::Rejected { highest, duty } => {
                assert_eq!(highest.value(), 101);
                assert_eq!(duty.value(), 272);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(cycle.actuator().commands.is_empty());

        config.duty_range = DutyRange::Clamp;
        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[101]), RecordingActuator::default());
        cycle.run().unwrap();
        assert!(cycle.actuator().commands.iter().all(|c| c.argv.last().map(String::as_str) == Some("0xff")));

        config.duty_range = DutyRange::Passthrough;
        let mut cycle = ControlCycle::new(&config, settings(), readings_source(&[101]), RecordingActuator::default());
        cycle.run().unwrap();
        assert!(cycle.actuator().commands.iter().all(|c| c.argv.last().map(String::as_str) == Some("0x110")));
    }

    #[test]
    fn test_fresh_buffer_each_cycle() {
        let config = Config::default();
        let mut source = MockSensorSource::new();
        let mut seq = Sequence::new();
        source
            .expect_acquire()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|cap| Ok(ReadingBuffer::from_raw(cap, &[80])));
        source
            .expect_acquire()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|cap| Ok(ReadingBuffer::from_raw(cap, &[30])));

        let mut cycle = ControlCycle::new(&config, settings(), source, RecordingActuator::default());
        let first = cycle.run().unwrap();
        let second = cycle.run().unwrap();
        let (CycleOutcome::Actuated(a), CycleOutcome::Actuated(b)) = (first, second) else {
            panic!("expected two actuations");
        };
        assert_eq!(a.highest.value(), 80);
        assert_eq!(b.highest.value(), 30);
    }
}
