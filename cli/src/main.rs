//! Medical Insurance Dashboard CLI
//!
//! ```sh
//! # Fit the model on the configured dataset and write the artifact
//! insurance-cli train
//!
//! # Serve the dashboard API
//! insurance-cli serve --port 8080
//!
//! # Validate config, dataset and model without starting
//! insurance-cli check
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use insurance_dashboard::application::prediction::{train, ModelArtifact, TrainingOptions};
use insurance_dashboard::application::Dataset;
use insurance_dashboard::config::AppConfig;
use insurance_dashboard::domain::RegionEncoding;
use insurance_dashboard::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "insurance-cli",
    version,
    about = "Medical insurance cost prediction and dataset dashboard",
    long_about = "Serves the login-gated insurance dashboard API, trains the linear \
                  regression model it serves, and checks deployments.\n\n\
                  Default config: ~/.config/insurance-dashboard/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "INSURANCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the REST API server.
    Serve(ServeArgs),
    /// Fit the regression model and write the artifact.
    Train(TrainArgs),
    /// Validate the configuration, dataset and model, then exit.
    Check,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Do not install the Prometheus recorder or mount `/metrics`.
    #[arg(long)]
    no_metrics: bool,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Dataset to fit on (defaults to `data.dataset_path`).
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Where to write the artifact (defaults to `data.model_path`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed of the train/test shuffle.
    #[arg(long, default_value_t = 2)]
    seed: u64,

    /// Share of rows held out for the test score.
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Fit with the legacy region codes (southeast 0, southwest 1,
    /// northeast 2, northwest 3) instead of the alphabetical ones.
    #[arg(long)]
    legacy_regions: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(insurance_dashboard::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            return Err(e.into());
        }
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    match cli.command {
        Command::Serve(args) => serve(config, args).await,
        Command::Train(args) => run_train(&config, args),
        Command::Check => check(&config, &config_path),
    }
}

async fn serve(mut config: AppConfig, args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = args.host {
        info!("CLI override: host = {}", host);
        config.server.host = host;
    }
    if let Some(port) = args.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        enable_metrics: !args.no_metrics,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;
    Ok(())
}

fn run_train(config: &AppConfig, args: TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset_path = args.dataset.unwrap_or_else(|| config.data.dataset_path.clone());
    let output = args.output.unwrap_or_else(|| config.data.model_path.clone());

    if !(0.0..1.0).contains(&args.test_fraction) {
        return Err(format!("--test-fraction must be in [0, 1), got {}", args.test_fraction).into());
    }
    let options = TrainingOptions {
        test_fraction: args.test_fraction,
        seed: args.seed,
        region_encoding: if args.legacy_regions {
            warn!("Training with legacy region codes");
            RegionEncoding::LegacyTraining
        } else {
            RegionEncoding::Alphabetical
        },
    };

    let dataset = Dataset::load(&dataset_path)?;
    info!(path = %dataset_path.display(), rows = dataset.len(), "Dataset loaded");

    let artifact = train(&dataset, options)?;
    artifact.save(&output)?;

    println!("Model written to {}", output.display());
    println!("   R² (train) : {:.4}", artifact.metrics.r2_train);
    println!("   R² (test)  : {:.4}", artifact.metrics.r2_test);
    println!(
        "   Rows       : {} train / {} test",
        artifact.metrics.train_rows, artifact.metrics.test_rows
    );
    Ok(())
}

fn check(config: &AppConfig, config_path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let dataset = Dataset::load(&config.data.dataset_path).inspect_err(|e| error!("{}", e))?;
    let artifact = ModelArtifact::load(&config.data.model_path).inspect_err(|e| error!("{}", e))?;
    artifact.validate()?;

    println!("Configuration is valid");
    println!("   Config file : {}", config_path.display());
    println!("   Listen      : {}", config.listen_address());
    println!("   User store  : {:?}", config.storage.backend);
    println!("   Dataset     : {} ({} rows)", config.data.dataset_path.display(), dataset.len());
    println!(
        "   Model       : {} (R² test {:.4}, {:?} regions)",
        config.data.model_path.display(),
        artifact.metrics.r2_test,
        artifact.region_encoding
    );
    if artifact.dataset_sha256 != dataset.sha256() {
        println!("   Warning     : model was not trained on this dataset");
    }
    println!("   Log level   : {}", config.logging.level);
    Ok(())
}
