use clap::Args;
use serde::Serialize;

use shipmate::{json, validation, CancelToken, DeployParams, EventSink, LogSink, NullSink, RunReport};

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// Application name
    pub app_name: Option<String>,

    /// JSON parameter spec (inline, @file, or - for stdin)
    #[arg(long)]
    pub json: Option<String>,

    /// Version to deploy
    #[arg(long)]
    pub version: Option<String>,

    /// Target deployment directory
    #[arg(long = "path")]
    pub deploy_path: Option<String>,

    /// Skip the final health check step
    #[arg(long)]
    pub no_health_check: bool,

    /// Do not roll back when a critical step fails
    #[arg(long)]
    pub no_rollback: bool,

    /// Remote host (deploys through the local shell when omitted)
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

    /// Suppress progress logging on stderr
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Serialize)]
pub struct DeployOutput {
    pub command: String,
    pub app_name: String,
    pub version: String,
    pub deploy_path: String,
    pub report: RunReport,
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let mut params = match &args.json {
        Some(spec) => json::parse_deploy_params(spec)?,
        None => {
            let app_name = validation::require(
                args.app_name.clone(),
                "app_name",
                "App name is required (positional argument or --json spec)",
            )?;
            DeployParams::new(app_name)
        }
    };

    // Explicit flags override the JSON spec.
    if let Some(app_name) = args.app_name {
        params.app_name = app_name;
    }
    if let Some(version) = args.version {
        params.version = version;
    }
    if let Some(deploy_path) = args.deploy_path {
        params.deploy_path = deploy_path;
    }
    if args.no_health_check {
        params.health_check = false;
    }
    if args.no_rollback {
        params.rollback_on_failure = false;
    }

    let channel = super::build_channel(
        args.host.as_deref(),
        &args.user,
        args.port,
        args.identity.clone(),
    )?;

    let sink: Box<dyn EventSink> = if args.quiet {
        Box::new(NullSink)
    } else {
        Box::new(LogSink)
    };
    let cancel = CancelToken::new();

    let report = shipmate::deploy::run(&params, channel.as_ref(), sink.as_ref(), &cancel)
        .map_err(|e| {
            if e.message.contains("Deploy path must be absolute") {
                e.with_hint("Pass an absolute directory, e.g. --path /opt/apps")
            } else {
                e
            }
        })?;

    Ok((
        DeployOutput {
            command: "deploy.run".to_string(),
            app_name: params.app_name,
            version: params.version,
            deploy_path: params.deploy_path,
            report,
        },
        0,
    ))
}
