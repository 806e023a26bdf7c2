use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use top_server::{logging, ServiceConfig};

#[derive(Parser)]
#[command(name = "top", version, about = "Test OpenID Connect provider")]
struct Cli {
    /// YAML config file (default: $TOP_CONFIG_YAML, ./.top.yaml or ~/.top.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to listen on, overriding the config
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on, overriding the config
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ServiceConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    logging::init_tracing(&config.log_level, config.log_format);
    tracing::info!(service = %config.service_name, "Starting service");

    match top_server::serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service failed");
            ExitCode::FAILURE
        }
    }
}
