use anyhow::Result;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tracing::{error, info};

use duration_predictor::api::{router, AppState};
use duration_predictor::config::{Config, DEFAULT_CONFIG_FILE};
use duration_predictor::telemetry::init_telemetry;
use duration_predictor::{exit_err, load_predictor};

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match Config::load(&args.config_file, args.opt_config) {
        Ok(config) => config,
        Err(err) => {
            // Telemetry depends on the configuration, report through a plain console subscriber
            let _console = tracing::subscriber::set_default(
                tracing_subscriber::fmt().with_writer(std::io::stderr).finish(),
            );
            exit_err!(1, "{:#}", err)
        }
    };

    let telemetry = init_telemetry(config.otlp_endpoint())?;

    // The model has to be in memory before the listener accepts anything
    let predictor = match load_predictor(&config).await {
        Ok(predictor) => predictor,
        Err(err) => exit_err!(1, "Failed to load model: {:#}", err),
    };
    info!("Serving model version {}", predictor.model_version());

    let router = router(AppState { predictor });
    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
