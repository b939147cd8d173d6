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

use std::io::IsTerminal;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tracing::{debug, error, info, warn};

use chairman::actuator::CommandActuator;
use chairman::cli;
use chairman::config::{config_path, Config};
use chairman::constants::paths;
use chairman::curve;
use chairman::cycle::{ControlCycle, CycleOutcome};
use chairman::logger;
use chairman::scheduler::{install_shutdown_handler, Mode, Scheduler, ThreadSleeper};
use chairman::sensors::CommandSensorSource;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_tracing(debug: bool) {
    let log_level = std::env::var(paths::LOG_ENV)
        .unwrap_or_else(|_| if debug { "debug" } else { "info" }.to_string());

    // Journal when running as a service, stderr otherwise. Stdout is reserved
    // for the table and --debug diagnostics.
    let use_journald = Path::new(paths::JOURNALD_SOCKET).exists() && !std::io::stderr().is_terminal();
    if use_journald {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(&log_level))
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stderr", e);
            }
        }
    }
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(&log_level)
        .init();
}

/// IPMI raw access normally needs root; a custom actuation command might not.
fn check_privileges() {
    // SAFETY: geteuid is always safe - it just returns the effective user ID of the process.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        warn!("Not running as root (euid={}); ipmitool raw commands will likely fail", euid);
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "chairman".to_string());

    let mode = match cli::parse_args(args.get(1..).unwrap_or_default()) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}: {}", program, e);
            eprintln!("Try '{} --help' for more information.", program);
            return Ok(());
        }
    };

    // Neither of these touches sensors or actuators.
    match mode {
        Mode::Help => {
            print!("{}", cli::usage(&program));
            return Ok(());
        }
        Mode::Table => {
            for row in curve::sweep_table() {
                println!("{}", curve::format_table_row(&row));
            }
            return Ok(());
        }
        Mode::Once { .. } | Mode::Forever { .. } => {}
    }

    let settings = mode.settings();
    init_tracing(settings.debug);
    info!("STARTUP: chairman {} ({:?})", VERSION, mode);

    let config = Config::load().with_context(|| format!("loading {}", config_path().display()))?;
    debug!("STARTUP: {:?}", config);

    if let Some(path) = &config.event_log {
        if let Err(e) = logger::init_logging(path) {
            warn!("Event log {} unavailable: {}", path.display(), e);
        }
    }
    logger::log_event("startup", json!({ "version": VERSION, "args": args, "mode": format!("{:?}", mode) }));

    check_privileges();

    let shutdown = Arc::new(AtomicBool::new(false));
    let source = CommandSensorSource::new(config.sensor_command.clone(), config.command_timeout());
    let actuator = CommandActuator::new(config.command_timeout());
    let cycle = ControlCycle::new(&config, settings, source, actuator);
    let mut scheduler = Scheduler::new(
        cycle,
        ThreadSleeper::new(shutdown.clone()),
        config.on_sensor_failure,
        shutdown.clone(),
    );

    let Some(interval) = settings.interval else {
        match scheduler.run_once() {
            Ok(CycleOutcome::Actuated(report)) if !report.all_applied() => {
                warn!("{} of {} actuation command(s) failed", report.failures.len(), report.issued);
            }
            Ok(outcome) => debug!("Cycle finished: {:?}", outcome),
            Err(e) => {
                error!("{}", e);
                logger::log_event("fatal_error", json!({ "error": e.to_string() }));
                std::process::exit(1);
            }
        }
        return Ok(());
    };

    if let Err(e) = install_shutdown_handler(shutdown.clone()) {
        warn!("Failed to set signal handler: {}", e);
    }

    println!("Hysteresis: {} seconds", interval.as_secs());
    let result = scheduler.run_forever(interval);
    match result {
        Ok(stats) => {
            info!("SHUTDOWN: {:?}", stats);
            logger::log_event("shutdown", json!({ "cycles": stats.cycles, "skipped": stats.skipped }));
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            logger::log_event("fatal_error", json!({ "error": e.to_string() }));
            std::process::exit(1);
        }
    }
}
