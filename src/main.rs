use clap::{Parser, Subcommand};

mod commands;

use commands::{deploy, plan, rollback, GlobalArgs};
use shipmate::output;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "shipmate")]
#[command(version = VERSION)]
#[command(about = "CLI for application deployment pipelines over local or SSH targets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the deployment pipeline for an application
    Deploy(deploy::DeployArgs),
    /// Show the deployment plan without executing it
    Plan(plan::PlanArgs),
    /// Run the compensating rollback sequence for an application
    Rollback(rollback::RollbackArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
