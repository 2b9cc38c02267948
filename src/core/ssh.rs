//! SSH execution channel.
//!
//! Wraps the system `ssh` binary. Connection establishment, host keys,
//! and auth negotiation stay with ssh itself; this channel only builds
//! the invocation and maps its output.

use std::process::Command;
use std::sync::mpsc::Receiver;

use crate::channel::{
    output_from_process, stream_command, CancelToken, CommandOutput, ExecOptions,
    ExecutionChannel, StreamingChannel, SubEvent,
};
use crate::error::{Error, Result};

const DEFAULT_SSH_PORT: u16 = 22;

pub struct SshChannel {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
}

impl SshChannel {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        port: u16,
        identity_file: Option<String>,
    ) -> Result<Self> {
        let identity_file = match identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(&path).to_string();
                if !std::path::Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(expanded));
                }
                Some(expanded)
            }
            _ => None,
        };

        Ok(Self {
            host: host.into(),
            user: user.into(),
            port,
            identity_file,
        })
    }

    fn ssh_command(&self, command: &str) -> Command {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != DEFAULT_SSH_PORT {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        let mut cmd = Command::new("ssh");
        cmd.args(&args);
        cmd
    }
}

impl ExecutionChannel for SshChannel {
    fn execute(&self, command: &str, _options: &ExecOptions) -> Result<CommandOutput> {
        let output = self
            .ssh_command(command)
            .output()
            .map_err(|e| Error::channel_rejected(command, format!("ssh error: {}", e)))?;
        Ok(output_from_process(output))
    }

    fn streaming(&self) -> Option<&dyn StreamingChannel> {
        Some(self)
    }
}

impl StreamingChannel for SshChannel {
    fn execute_stream(
        &self,
        command: &str,
        _options: &ExecOptions,
        cancel: &CancelToken,
    ) -> Result<Receiver<SubEvent>> {
        stream_command(self.ssh_command(command), command, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_identity_file() {
        let result = SshChannel::new("app1.internal", "deploy", 22, Some("/nonexistent/id_ed25519".to_string()));
        assert!(result.is_err());
        assert_eq!(
            result.err().map(|e| e.code),
            Some(crate::ErrorCode::SshIdentityFileNotFound)
        );
    }

    #[test]
    fn empty_identity_file_is_ignored() {
        let channel = SshChannel::new("app1.internal", "deploy", 2222, Some(String::new())).unwrap();
        assert!(channel.identity_file.is_none());
        assert_eq!(channel.port, 2222);
    }
}
