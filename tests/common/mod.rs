#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;

use shipmate::{
    CancelToken, CommandOutput, Error, ExecOptions, ExecutionChannel, Result, StreamingChannel,
    SubEvent,
};

/// Scripted outcome for one streamed command, consumed in catalog
/// order. Steps beyond the script succeed silently.
pub enum MockOutcome {
    /// Command runs and succeeds, emitting the given stdout lines.
    Success(Vec<&'static str>),
    /// Command runs and fails with the given exit code and stderr.
    Failure(i32, &'static str),
    /// Channel refuses to start the command.
    Reject(&'static str),
    /// Stream ends with an Error sub-event (e.g. cancellation).
    ErrorEvent(&'static str),
}

/// Streaming channel driven by a script. Blocking `execute` calls
/// (rollback actions, fallback commands) are recorded and always
/// succeed.
#[derive(Default)]
pub struct MockChannel {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    stream_calls: Mutex<Vec<String>>,
    exec_calls: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            stream_calls: Mutex::new(Vec::new()),
            exec_calls: Mutex::new(Vec::new()),
        }
    }

    /// Commands started through the streaming capability, in order.
    pub fn streamed(&self) -> Vec<String> {
        self.stream_calls.lock().unwrap().clone()
    }

    /// Commands run through blocking execute, in order.
    pub fn executed(&self) -> Vec<String> {
        self.exec_calls.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> MockOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(MockOutcome::Success(Vec::new()))
    }
}

impl ExecutionChannel for MockChannel {
    fn execute(&self, command: &str, _options: &ExecOptions) -> Result<CommandOutput> {
        self.exec_calls.lock().unwrap().push(command.to_string());
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        })
    }

    fn streaming(&self) -> Option<&dyn StreamingChannel> {
        Some(self)
    }
}

impl StreamingChannel for MockChannel {
    fn execute_stream(
        &self,
        command: &str,
        _options: &ExecOptions,
        _cancel: &CancelToken,
    ) -> Result<Receiver<SubEvent>> {
        self.stream_calls.lock().unwrap().push(command.to_string());

        let (tx, rx) = mpsc::channel();
        match self.next_outcome() {
            MockOutcome::Success(lines) => {
                let mut stdout = String::new();
                for line in lines {
                    stdout.push_str(line);
                    stdout.push('\n');
                    tx.send(SubEvent::Stdout(line.to_string())).unwrap();
                }
                tx.send(SubEvent::Done(CommandOutput {
                    stdout,
                    stderr: String::new(),
                    success: true,
                    exit_code: 0,
                }))
                .unwrap();
            }
            MockOutcome::Failure(exit_code, stderr) => {
                tx.send(SubEvent::Stderr(stderr.to_string())).unwrap();
                tx.send(SubEvent::Done(CommandOutput {
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    success: false,
                    exit_code,
                }))
                .unwrap();
            }
            MockOutcome::Reject(reason) => {
                return Err(Error::channel_rejected(command, reason));
            }
            MockOutcome::ErrorEvent(message) => {
                tx.send(SubEvent::Error(message.to_string())).unwrap();
            }
        }

        Ok(rx)
    }
}

/// Channel without the streaming capability; forces the fallback path.
#[derive(Default)]
pub struct BasicChannel {
    calls: Mutex<Vec<String>>,
    pub fail: bool,
}

impl BasicChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExecutionChannel for BasicChannel {
    fn execute(&self, command: &str, _options: &ExecOptions) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.fail {
            return Ok(CommandOutput {
                stdout: String::new(),
                stderr: "mkdir: cannot create directory".to_string(),
                success: false,
                exit_code: 1,
            });
        }
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        })
    }
}
