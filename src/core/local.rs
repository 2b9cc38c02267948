//! Local execution channel.
//!
//! Runs commands through `sh -c` on the control host. Used when no
//! remote host is configured; also the channel deployments exercise in
//! tests.

use std::process::Command;
use std::sync::mpsc::Receiver;

use crate::channel::{
    output_from_process, stream_command, CancelToken, CommandOutput, ExecOptions,
    ExecutionChannel, StreamingChannel, SubEvent,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct LocalChannel;

impl LocalChannel {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

impl ExecutionChannel for LocalChannel {
    fn execute(&self, command: &str, _options: &ExecOptions) -> Result<CommandOutput> {
        let output = Self::shell_command(command)
            .output()
            .map_err(|e| Error::channel_rejected(command, e.to_string()))?;
        Ok(output_from_process(output))
    }

    fn streaming(&self) -> Option<&dyn StreamingChannel> {
        Some(self)
    }
}

impl StreamingChannel for LocalChannel {
    fn execute_stream(
        &self,
        command: &str,
        _options: &ExecOptions,
        cancel: &CancelToken,
    ) -> Result<Receiver<SubEvent>> {
        stream_command(Self::shell_command(command), command, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn execute_captures_stdout() {
        let channel = LocalChannel::new();
        let output = channel
            .execute("echo deployed", &ExecOptions::default())
            .unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "deployed\n");
    }

    #[test]
    fn execute_reports_command_failure() {
        let channel = LocalChannel::new();
        let output = channel
            .execute("exit 3", &ExecOptions::default())
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, 3);
    }

    #[test]
    fn execute_reads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "app=webapp").unwrap();

        let channel = LocalChannel::new();
        let command = format!("cat {}", crate::shell::quote_path(&file.path().to_string_lossy()));
        let output = channel.execute(&command, &ExecOptions::default()).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "app=webapp\n");
    }

    #[test]
    fn stream_emits_lines_then_done() {
        let channel = LocalChannel::new();
        let cancel = CancelToken::new();
        let rx = channel
            .execute_stream("printf 'one\\ntwo\\n'", &ExecOptions::default(), &cancel)
            .unwrap();

        let events: Vec<SubEvent> = rx.iter().collect();
        let lines: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                SubEvent::Stdout(line) => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["one", "two"]);

        match events.last() {
            Some(SubEvent::Done(output)) => {
                assert!(output.success);
                assert_eq!(output.stdout, "one\ntwo\n");
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }

    #[test]
    fn stream_done_reports_failure_exit() {
        let channel = LocalChannel::new();
        let cancel = CancelToken::new();
        let rx = channel
            .execute_stream("echo oops >&2; exit 7", &ExecOptions::default(), &cancel)
            .unwrap();

        let events: Vec<SubEvent> = rx.iter().collect();
        match events.last() {
            Some(SubEvent::Done(output)) => {
                assert!(!output.success);
                assert_eq!(output.exit_code, 7);
                assert_eq!(output.stderr, "oops\n");
            }
            other => panic!("expected Done, got {:?}", other),
        }
    }
}
