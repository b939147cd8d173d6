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

//! External command execution with a deadline
//!
//! Sensor enumeration and IPMI actuation both shell out. A hung `ipmitool`
//! must not stall the control loop, so every child gets a deadline after
//! which it is killed and reaped.

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::constants::timing;
use crate::error::{ChairmanError, Result};

/// Captured result of a finished command
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Render an argv for log and error messages
pub fn display_command(argv: &[String]) -> String {
    argv.join(" ")
}

/// Start `argv` with piped output in a process group of its own, so that a
/// timeout can take down anything the command forked. The `io::Error` of a
/// failed launch is returned as-is so callers can map it to their own error kind.
pub fn spawn(argv: &[String]) -> std::result::Result<Child, std::io::Error> {
    let (program, args) = argv.split_first().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
    })?;
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Wait for a drained pipe to reach EOF. `None` means the deadline passed
/// while something still held the write end open.
fn collect(pipe: Option<&Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = pipe else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

/// SIGKILL the whole process group led by `pid`
fn kill_group(pid: u32, command: &str) {
    // SAFETY: kill(2) takes no pointers; a negative pid addresses the group
    // created by `spawn`.
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "kill of process group {} for `{}` failed: {}",
            pid,
            command,
            std::io::Error::last_os_error()
        );
    }
}

fn timed_out(command: &str, timeout: Duration) -> ChairmanError {
    ChairmanError::CommandTimeout {
        command: command.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}

/// Wait for an already spawned child and for its output pipes to close.
/// Once `timeout` elapses the child's process group is killed and reaped.
pub fn wait_with_timeout(mut child: Child, command: &str, timeout: Duration) -> Result<CommandOutput> {
    // Pipes are drained concurrently so a chatty child cannot block on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let pid = child.id();
    let deadline = Instant::now() + timeout;
    let poll = Duration::from_millis(timing::PROCESS_POLL_MS);

    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                warn!("Command `{}` exceeded {:?}, killing process group {}", command, timeout, pid);
                kill_group(pid, command);
                if let Err(e) = child.kill() {
                    debug!("kill failed for `{}`: {}", command, e);
                }
                let _ = child.wait();
                return Err(timed_out(command, timeout));
            }
            None => thread::sleep(poll),
        }
    };

    // A background process that inherited stdout or stderr keeps the pipe
    // open after the command itself has exited.
    let stdout = collect(stdout.as_ref(), deadline);
    let stderr = collect(stderr.as_ref(), deadline);
    match (stdout, stderr) {
        (Some(stdout), Some(stderr)) => Ok(CommandOutput { status, stdout, stderr }),
        _ => {
            warn!(
                "Command `{}` exited but its output stayed open past {:?}, killing process group {}",
                command, timeout, pid
            );
            kill_group(pid, command);
            Err(timed_out(command, timeout))
        }
    }
}
