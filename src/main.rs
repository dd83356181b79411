use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use flagsync::config::{Overrides, RuntimeConfig};
use flagsync::runtime::{Runtime, shutdown_signal};

#[derive(Parser)]
#[command(name = "flagsync", version, about = "Sync and serve feature flags")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start syncing and serving flags
    Start(StartArgs),
}

#[derive(Args)]
struct StartArgs {
    /// Port to listen on
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Service provider (http)
    #[arg(short = 's', long)]
    service_provider: Option<String>,

    /// Sync provider (filepath or remote)
    #[arg(short = 'y', long)]
    sync_provider: Option<String>,

    /// Evaluator (json)
    #[arg(short = 'e', long)]
    evaluator: Option<String>,

    /// File path or URL to sync flags from
    #[arg(short = 'f', long)]
    uri: Option<String>,

    /// Bearer token for the remote sync provider
    #[arg(short = 'b', long)]
    bearer_token: Option<String>,

    /// Config file (toml, yaml or json) read before FLAGSYNC_* variables and flags
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

impl StartArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            sync_provider: self.sync_provider.clone(),
            evaluator: self.evaluator.clone(),
            service_provider: self.service_provider.clone(),
            uri: self.uri.clone(),
            bearer_token: self.bearer_token.clone(),
            port: self.port,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Start(args) => start(args).await,
    }
}

async fn start(args: StartArgs) -> ExitCode {
    let config = match RuntimeConfig::load(args.config.as_deref(), &args.overrides()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match Runtime::from_config(&config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();

    let run = async {
        let result = runtime.run(cancel.clone()).await;
        cancel.cancel();
        result
    };

    let signals = async {
        tokio::select! {
            _ = shutdown_signal() => tracing::info!("shutdown signal received"),
            _ = cancel.cancelled() => {}
        }
        cancel.cancel();
    };

    let (result, ()) = tokio::join!(run, signals);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
