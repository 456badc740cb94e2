//! vhostd command line interface

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use vhostd::cert::ocsp;
use vhostd::common::{init_logger, Result};
use vhostd::config;
use vhostd::state::App;

#[derive(Parser, Debug)]
#[command(name = "vhostd", version = vhostd::VERSION, about = "Multi-protocol virtual-host reverse proxy")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Create a minimal config file at `--config` if it doesn't exist yet.
    #[arg(short = 'i', long = "init")]
    init: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger("info");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if cli.init {
        config::loader::init_if_missing(&cli.config).await?;
    }
    let cfg = config::loader::load(&cli.config).await?;
    let app = App::new(cli.config.clone(), cfg).await?;

    let ocsp_cancel = app.cancel.child_token();
    tokio::spawn(ocsp::run(app.clone(), ocsp_cancel));

    wait_for_shutdown_signal().await;
    log::info!("shutdown signal received, stopping");
    app.cancel.cancel();

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
