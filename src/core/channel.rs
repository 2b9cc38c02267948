//! Execution channel abstraction.
//!
//! A channel runs opaque commands against a target (local shell, SSH
//! host). Every channel supports blocking execution; channels that can
//! also stream live output expose the optional [`StreamingChannel`]
//! capability, which the pipeline queries once per run.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Options for a single command invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Idle timeout while waiting for the next sub-event of a streamed
    /// command. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

/// One event produced while a streamed command runs.
#[derive(Debug)]
pub enum SubEvent {
    Stdout(String),
    Stderr(String),
    Done(CommandOutput),
    Error(String),
}

/// Cooperative cancellation flag shared between a caller and in-flight
/// commands. Cancelling kills the running command; the channel reports
/// it as an `Error` sub-event and the pipeline treats that as an
/// ordinary step failure.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub trait ExecutionChannel: Send + Sync {
    /// Execute a command and block until it completes.
    ///
    /// `Err` means the channel could not start the command at all;
    /// a command that ran and failed comes back as `Ok` with
    /// `success == false`.
    fn execute(&self, command: &str, options: &ExecOptions) -> Result<CommandOutput>;

    /// The streaming capability of this channel, if it has one.
    fn streaming(&self) -> Option<&dyn StreamingChannel> {
        None
    }
}

pub trait StreamingChannel: Send + Sync {
    /// Start a command and return its live sub-event sequence.
    ///
    /// The sequence ends with exactly one `Done` or `Error` event.
    fn execute_stream(
        &self,
        command: &str,
        options: &ExecOptions,
        cancel: &CancelToken,
    ) -> Result<Receiver<SubEvent>>;
}

/// Map a finished `std::process` output into a [`CommandOutput`].
pub(crate) fn output_from_process(out: std::process::Output) -> CommandOutput {
    CommandOutput {
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        success: out.status.success(),
        exit_code: out.status.code().unwrap_or(-1),
    }
}

/// Spawn `cmd` with piped stdio and stream its output line by line.
///
/// Two reader threads forward stdout/stderr lines as they arrive; a
/// waiter thread polls the child so the cancel token is honored, then
/// emits the terminal `Done` (or `Error`) event.
pub(crate) fn stream_command(
    mut cmd: Command,
    display: &str,
    cancel: &CancelToken,
) -> Result<Receiver<SubEvent>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::channel_rejected(display, e.to_string()))?;

    let (tx, rx) = mpsc::channel();

    let out_handle = spawn_line_reader(child.stdout.take(), tx.clone(), SubEvent::Stdout);
    let err_handle = spawn_line_reader(child.stderr.take(), tx.clone(), SubEvent::Stderr);

    let cancel = cancel.clone();
    thread::spawn(move || {
        let status = match wait_with_cancel(&mut child, &cancel) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = tx.send(SubEvent::Error("command cancelled".to_string()));
                return;
            }
            Err(e) => {
                let _ = tx.send(SubEvent::Error(format!("wait failed: {}", e)));
                return;
            }
        };

        let stdout = out_handle.join().unwrap_or_default();
        let stderr = err_handle.join().unwrap_or_default();
        let _ = tx.send(SubEvent::Done(CommandOutput {
            stdout,
            stderr,
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
        }));
    });

    Ok(rx)
}

/// Poll the child until it exits or the token is cancelled.
/// Returns `Ok(None)` when the command was killed by cancellation.
fn wait_with_cancel(
    child: &mut Child,
    cancel: &CancelToken,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        match child.try_wait()? {
            Some(status) => return Ok(Some(status)),
            None => thread::sleep(Duration::from_millis(50)),
        }
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    reader: Option<R>,
    tx: Sender<SubEvent>,
    wrap: fn(String) -> SubEvent,
) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut collected = String::new();
        let Some(reader) = reader else {
            return collected;
        };
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            collected.push_str(&line);
            collected.push('\n');
            // Receiver may be gone (consumer stopped listening); keep
            // draining so the child does not block on a full pipe.
            let _ = tx.send(wrap(line));
        }
        collected
    })
}
