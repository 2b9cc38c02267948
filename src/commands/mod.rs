use serde_json::Value;

use shipmate::output;
use shipmate::Result;

pub mod deploy;
pub mod plan;
pub mod rollback;

pub type CmdResult<T> = shipmate::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub fn run_json(command: crate::Commands, global: &GlobalArgs) -> (Result<Value>, i32) {
    match command {
        crate::Commands::Deploy(args) => output::map_cmd_result_to_json(deploy::run(args, global)),
        crate::Commands::Plan(args) => output::map_cmd_result_to_json(plan::run(args, global)),
        crate::Commands::Rollback(args) => {
            output::map_cmd_result_to_json(rollback::run(args, global))
        }
    }
}

/// Build the execution channel shared by deploy and rollback commands:
/// SSH when a host is configured, the local shell otherwise.
pub(crate) fn build_channel(
    host: Option<&str>,
    user: &str,
    port: u16,
    identity: Option<String>,
) -> shipmate::Result<Box<dyn shipmate::ExecutionChannel>> {
    match host {
        Some(host) => Ok(Box::new(shipmate::SshChannel::new(
            host, user, port, identity,
        )?)),
        None => Ok(Box::new(shipmate::LocalChannel::new())),
    }
}
