// ABOUTME: Entry point for the relaunch CLI application.
// ABOUTME: Parses arguments, wires the runtime to the update engine, and runs passes.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use relaunch::config::{self, Config};
use relaunch::container::{ClientOptions, DockerClient};
use relaunch::error::Result;
use relaunch::output::Output;
use relaunch::runtime::{BollardRuntime, RuntimeError, RuntimeInfo, detect_local};
use relaunch::schedule::run_scheduled;
use relaunch::update::update;
use std::env;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            let path = config::init_config(&cwd, force)?;
            println!("Created {}", path.display());
            Ok(())
        }
        Commands::Run(args) => {
            let cwd = env::current_dir()?;
            let mut config = Config::discover_or_default(&cwd)?;
            args.apply(&mut config);
            watch_containers(config, &args).await
        }
    }
}

/// Connect to the local runtime and run one pass or the schedule.
async fn watch_containers(config: Config, args: &RunArgs) -> Result<()> {
    let endpoint = detect_local(&config.runtime).map_err(RuntimeError::from)?;
    let runtime = BollardRuntime::connect(&endpoint).map_err(RuntimeError::from)?;
    let metadata = runtime.info().await.map_err(RuntimeError::from)?;
    info!(
        runtime = %endpoint.runtime_type,
        socket = %endpoint.socket_path,
        version = %metadata.version,
        "connected to container runtime"
    );

    let client = DockerClient::new(runtime, ClientOptions::detect(config.no_pull));
    let params = config.update_params();
    let mut output = Output::new(args.output_mode());

    if args.run_once {
        output.start_timer();
        let report = update(&client, &params).await?;
        output.report(&report);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested, stopping after the current pass");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(interval = ?config.interval, "starting scheduled updates");
    run_scheduled(&client, &params, config.interval, shutdown_rx, |result| {
        match result {
            Ok(report) => output.report(report),
            Err(e) => output.error(&e.to_string()),
        }
    })
    .await;

    Ok(())
}
