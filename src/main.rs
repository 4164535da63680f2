//! Binary entry point: parse flags, build credentials and config once,
//! run the workflow, translate the outcome into an exit status.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use caughtup::{logging, workflow, Credentials, MarkerSet, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "caughtup", version, about = "Bulk-schedule pending GaggleAmp activities")]
struct Cli {
    /// Run with a visible browser window instead of headless
    #[arg(long)]
    visible: bool,

    /// Log probe-level detail
    #[arg(long)]
    debug: bool,

    /// JSON file overriding the built-in marker set
    #[arg(long, value_name = "FILE")]
    markers: Option<PathBuf>,

    /// Chrome binary to use instead of autodiscovery
    #[arg(long, value_name = "PATH", env = "CAUGHTUP_CHROME")]
    chrome: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = RunConfig {
        headless: !cli.visible,
        debug_logging: cli.debug,
        chrome_path: cli.chrome,
        ..RunConfig::default()
    };
    logging::init(config.debug_logging);

    // The only place the environment is read for secrets
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &cli.markers {
        match MarkerSet::from_file(path) {
            Ok(markers) => {
                info!("Loaded marker set from {}", path.display());
                config.markers = markers;
            }
            Err(e) => {
                error!("Could not load marker set from {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    let report = workflow::run(&config, &credentials).await;
    info!("Outcome: {}", report.outcome);

    report.outcome.exit_code()
}
