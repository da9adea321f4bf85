//! Data loader entry point: seeds both observation stores with synthetic
//! history for every configured zone.

use chrono::Utc;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use weather_report_service::config::{Config, DEFAULT_CONFIG_PATH};
use weather_report_service::generator::DataLoader;
use weather_report_service::logging::{self, DataSource};

#[derive(Debug, Parser)]
#[command(name = "data_loader", about = "Posts synthetic observations to the observation stores")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Overrides `loader.seed`.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&args.config)?;
    logging::init_logger(
        config.logging.min_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let rng = match args.seed.or(config.loader.seed) {
        Some(seed) => {
            logging::info(DataSource::Loader, None, &format!("seed {}", seed));
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let http = reqwest::blocking::Client::builder()
        .timeout(config.report.request_timeout())
        .build()?;
    let mut loader = DataLoader::new(
        http,
        &config.upstreams.temperature,
        &config.upstreams.precipitation,
        rng,
    )?;

    let summary = loader.run(
        &config.loader.zones,
        config.loader.history_days,
        Utc::now().date_naive(),
    );

    if summary.posted == 0 && summary.failed > 0 {
        return Err(format!("all {} submissions failed", summary.failed).into());
    }
    Ok(())
}
