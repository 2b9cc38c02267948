use clap::Args;
use serde::Serialize;

use shipmate::{build_catalog, json, validation, DeployParams, Step};

use super::CmdResult;

#[derive(Args)]
pub struct PlanArgs {
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
}

#[derive(Serialize)]
pub struct PlanOutput {
    pub command: String,
    pub app_name: String,
    pub version: String,
    pub deploy_path: String,
    pub total_steps: usize,
    pub steps: Vec<Step>,
}

pub fn run(args: PlanArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<PlanOutput> {
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

    params.validate()?;
    let steps = build_catalog(&params);

    Ok((
        PlanOutput {
            command: "deploy.plan".to_string(),
            app_name: params.app_name,
            version: params.version,
            deploy_path: params.deploy_path,
            total_steps: steps.len(),
            steps,
        },
        0,
    ))
}
