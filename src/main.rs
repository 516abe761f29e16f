use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "ecus", version, about = "Bundle, upload and store deployment artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the project config file (remote url, api key, project id)
    Init(commands::init::InitArgs),
    /// Bundle the project and upload it as a new deployment
    Update(commands::update::UpdateArgs),
    /// Run the upload endpoint backed by S3-compatible storage
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            tracing_subscriber::registry()
                .with(EnvFilter::try_from_env("ECUS_LOG").unwrap_or_else(|_| "info".into()))
                .with(fmt::layer().json())
                .init();
            commands::serve::run(shutdown_signal()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Init(args) => {
            init_cli_logging();
            Ok(commands::report(commands::init::run(args).await))
        }
        Command::Update(args) => {
            init_cli_logging();
            tokio::select! {
                result = commands::update::run(args) => Ok(commands::report(result)),
                () = shutdown_signal() => {
                    eprintln!("cancelled");
                    Ok(ExitCode::from(130))
                }
            }
        }
    }
}

/// CLI logs go to stderr so stdout carries only progress lines.
fn init_cli_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("ECUS_LOG").unwrap_or_else(|_| "warn".into()))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
