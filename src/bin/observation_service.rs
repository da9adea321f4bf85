//! Observation store entry point, one process per observation kind.
//!
//! Listens on the port configured for that kind under `[upstreams]` unless
//! `--bind` is given. `--in-memory` skips Postgres entirely.

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use weather_report_service::config::{Config, DEFAULT_CONFIG_PATH};
use weather_report_service::logging::{self, DataSource};
use weather_report_service::model::{Observation, PrecipitationObservation, TemperatureObservation, Upstream};
use weather_report_service::storage::{
    MemoryObservationRepository, ObservationRepository, PgObservationRepository, postgres,
};
use weather_report_service::{db, server};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Temperature,
    Precipitation,
}

impl From<Kind> for Upstream {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Temperature => Upstream::Temperature,
            Kind::Precipitation => Upstream::Precipitation,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "observation_service", about = "Stores and serves one kind of weather observation")]
struct Args {
    /// Which observation store to run.
    #[arg(value_enum)]
    kind: Kind,

    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Listen address; defaults to 0.0.0.0 on the configured upstream port.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Keep records in process memory instead of Postgres.
    #[arg(long)]
    in_memory: bool,
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

    let upstream = Upstream::from(args.kind);
    let addr = args
        .bind
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], config.upstreams.endpoint(upstream).port)));

    let database_url = if args.in_memory {
        logging::warn(DataSource::from(upstream), None, "using in-memory storage; records are lost on exit");
        None
    } else {
        let url = db::database_url()?;
        drop(db::connect_and_verify(&url, db::REQUIRED_TABLES)?);
        Some(url)
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        match upstream {
            Upstream::Temperature => {
                serve_kind::<TemperatureObservation>(database_url.as_deref(), addr).await
            }
            Upstream::Precipitation => {
                serve_kind::<PrecipitationObservation>(database_url.as_deref(), addr).await
            }
        }
    })
}

async fn serve_kind<T>(database_url: Option<&str>, addr: SocketAddr) -> Result<(), Box<dyn Error>>
where
    T: Observation,
    PgObservationRepository<T>: ObservationRepository<T>,
{
    let repository: Arc<dyn ObservationRepository<T>> = match database_url {
        Some(url) => Arc::new(PgObservationRepository::<T>::new(postgres::connect(url).await?)),
        None => Arc::new(MemoryObservationRepository::<T>::new()),
    };

    let name = format!("{} store", T::UPSTREAM);
    let app = server::observation_routes(repository).merge(server::health_routes(T::UPSTREAM.as_str()));
    server::serve(app, addr, &name).await?;
    Ok(())
}
