use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use clap_serde_derive::ClapSerde;

use duration_predictor::config::{Config, DEFAULT_CONFIG_FILE};
use duration_predictor::inference::features::{LocationId, Ride};
use duration_predictor::inference::task::predict::PredictHandler;
use duration_predictor::load_predictor;
use duration_predictor::registry::artifact::ArtifactUri;
use duration_predictor::registry::Registry;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loads the configured model and predicts a single ride
    Predict {
        /// Pickup zone
        #[clap(long)]
        pu_location_id: String,

        /// Dropoff zone
        #[clap(long)]
        do_location_id: String,

        /// Trip distance in miles
        #[clap(long)]
        trip_distance: f64,
    },
    /// Downloads an artifact and prints where it was stored
    Fetch {
        /// Artifact reference, e.g. runs:/<run_id>/dict_vectorizer.json
        uri: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or(tracing_subscriber::EnvFilter::new("WARN")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config_file, args.opt_config)?;

    match args.cmd {
        Commands::Predict {
            pu_location_id,
            do_location_id,
            trip_distance,
        } => {
            let predictor = load_predictor(&config).await?;
            let ride = Ride {
                pu_location_id: LocationId::Text(pu_location_id),
                do_location_id: LocationId::Text(do_location_id),
                trip_distance,
            };
            let response = predictor.run_predict(&ride)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Fetch { uri } => {
            let registry = Registry::from_config(&config)?;
            let path = registry.download(&ArtifactUri::parse(&uri)?).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
