//! Cloud Run deployer - Entry Point

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::{error, info};

use cloudrun_deployer::app::options::Options;
use cloudrun_deployer::app::run::run;
use cloudrun_deployer::logs::init_logging;
use cloudrun_deployer::utils::version_info;

#[tokio::main]
async fn main() -> ExitCode {
    let options = Options::parse();

    if let Err(e) = init_logging(options.log_options()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let version = version_info();
    info!(
        version = %version.version,
        git_hash = %version.git_hash,
        "Running Cloud Run deployer"
    );

    match run(options).await {
        Ok(summary) if summary.success => {
            info!("{}", summary.message);
            println!("{}", summary.message.green());
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            error!("{}", summary.message);
            println!("{}", summary.message.red());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Deployment failed: {e}");
            println!("{}", format!("Deployment failed: {e}").red());
            ExitCode::FAILURE
        }
    }
}
