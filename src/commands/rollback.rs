use clap::Args;
use serde::Serialize;

use shipmate::{rollback, validation, RollbackReport};

use super::CmdResult;

#[derive(Args)]
pub struct RollbackArgs {
    /// Application name
    pub app_name: String,

    /// Target deployment directory
    #[arg(long = "path", default_value = shipmate::defaults::DEFAULT_DEPLOY_PATH)]
    pub deploy_path: String,

    /// Remote host (rolls back through the local shell when omitted)
    #[arg(long)]
    pub host: Option<String>,

    /// Remote SSH user
    #[arg(long, default_value = "deploy")]
    pub user: String,

    /// Remote SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SSH identity file
    #[arg(long)]
    pub identity: Option<String>,
}

#[derive(Serialize)]
pub struct RollbackOutput {
    pub command: String,
    pub app_name: String,
    pub deploy_path: String,
    pub report: RollbackReport,
}

pub fn run(args: RollbackArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RollbackOutput> {
    validation::require_non_empty(&args.app_name, "app_name", "App name cannot be empty")?;
    if !args.deploy_path.starts_with('/') {
        return Err(shipmate::Error::validation_invalid_argument(
            "path",
            format!("Deploy path must be absolute: {}", args.deploy_path),
            None,
            None,
        ));
    }

    let channel = super::build_channel(
        args.host.as_deref(),
        &args.user,
        args.port,
        args.identity.clone(),
    )?;

    let report = rollback::run(&args.app_name, &args.deploy_path, channel.as_ref());
    let exit_code = if report.all_succeeded() { 0 } else { 1 };

    Ok((
        RollbackOutput {
            command: "deploy.rollback".to_string(),
            app_name: args.app_name,
            deploy_path: args.deploy_path,
            report,
        },
        exit_code,
    ))
}
