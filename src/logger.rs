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

//! Optional JSON-lines event log
//!
//! Diagnostics go through `tracing`. This log is a separate, append-only
//! record of control decisions (one JSON object per line) for later analysis.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Open `path` for appending, creating parent directories as needed
pub fn init_logging(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let f = OpenOptions::new().create(true).append(true).open(path)?;
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(f);
    }
    Ok(())
}

/// Close the event log. Later `log_event` calls are dropped.
pub fn shutdown_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = None;
    }
}

pub fn is_enabled() -> bool {
    LOG_FILE.lock().map(|g| g.is_some()).unwrap_or(false)
}

/// Append one event. No-op until `init_logging` succeeds.
pub fn log_event(event: &str, data: Value) {
    let Ok(mut guard) = LOG_FILE.lock() else { return };
    let Some(f) = guard.as_mut() else { return };

    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    })
    .to_string();
    let _ = writeln!(f, "{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_events_written_as_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("events.json");

        init_logging(&path).unwrap();
        assert!(is_enabled());
        log_event("logger_test_cycle", json!({ "highest": 42, "duty": "0xd" }));
        log_event("logger_test_idle", json!({}));
        shutdown_logging();

        // Other tests may log concurrently; only look at our own events.
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap())
            .filter(|v| v["event"].as_str().map_or(false, |e| e.starts_with("logger_test_")))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "logger_test_cycle");
        assert_eq!(lines[0]["data"]["highest"], 42);
        assert!(lines[0]["ts_ms"].as_u64().unwrap() > 0);
        assert_eq!(lines[1]["event"], "logger_test_idle");
    }

    #[test]
    #[serial]
    fn test_disabled_logger_drops_events() {
        shutdown_logging();
        assert!(!is_enabled());
        log_event("ignored", json!({}));
    }
}
