//! Report service entry point.
//!
//! Startup order: load config, init logging, optionally probe the upstreams
//! and exit (`--verify`), migrate and verify the database on the blocking
//! client, then build the tokio runtime and serve
//! `GET /weather-report/{zone}?days={n}`.

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use weather_report_service::aggregator::Aggregator;
use weather_report_service::config::{Config, DEFAULT_CONFIG_PATH};
use weather_report_service::logging::{self, DataSource};
use weather_report_service::storage::{PgReportStore, postgres};
use weather_report_service::{db, server, verify};

#[derive(Debug, Parser)]
#[command(name = "report_service", about = "Serves weekly weather reports per zone")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Probe both observation stores, print a summary and exit.
    #[arg(long)]
    verify: bool,
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

    if args.verify {
        let report = verify::run_verification(&config)?;
        verify::print_summary(&report);
        if !report.all_working() {
            return Err("observation store verification failed".into());
        }
        return Ok(());
    }

    let database_url = db::database_url()?;
    drop(db::connect_and_verify(&database_url, db::REQUIRED_TABLES)?);
    logging::info(DataSource::Database, None, "schema verified");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let client = postgres::connect(&database_url).await?;
        let store = Arc::new(PgReportStore::new(client));
        let aggregator = Arc::new(Aggregator::from_config(&config, store)?);

        let app = server::report_routes(aggregator).merge(server::health_routes("report"));
        server::serve(app, config.bind_addr()?, "report service").await?;
        Ok::<(), Box<dyn Error>>(())
    })
}
