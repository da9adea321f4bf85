//! Postgres backends on `tokio-postgres`.
//!
//! Tables are created by `db::migrate` (see `sql/001_weather_schema.sql`).
//! Each backend shares one client connection; the connection task is spawned
//! onto the current tokio runtime by [`connect`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use super::{ObservationRepository, ReportStore};
use crate::logging::{self, DataSource};
use crate::model::{
    Observation, PendingReport, PrecipitationObservation, Report, StoreError,
    TemperatureObservation,
};

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        // SQLSTATE class 23 is integrity constraint violation.
        match err.code() {
            Some(code) if code.code().starts_with("23") => StoreError::Rejected(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Opens a connection and drives it on a background task.
pub async fn connect(database_url: &str) -> Result<Arc<Client>, StoreError> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            logging::error(DataSource::Database, None, &format!("connection closed: {}", e));
        }
    });

    Ok(Arc::new(client))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub struct PgReportStore {
    client: Arc<Client>,
}

impl PgReportStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn report_from_row(row: &Row) -> Report {
        Report {
            id: row.get("id"),
            zone: row.get("zone"),
            average_high_f: row.get("average_high_f"),
            average_low_f: row.get("average_low_f"),
            total_rain_inches: row.get("total_rain_inches"),
            total_snow_inches: row.get("total_snow_inches"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn append(&self, report: PendingReport) -> Result<Report, StoreError> {
        let id = Uuid::new_v4();
        self.client
            .execute(
                "INSERT INTO weather_reports
                    (id, zone, average_high_f, average_low_f,
                     total_rain_inches, total_snow_inches, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &id,
                    &report.zone,
                    &report.average_high_f,
                    &report.average_low_f,
                    &report.total_rain_inches,
                    &report.total_snow_inches,
                    &report.created_at,
                ],
            )
            .await?;
        Ok(report.into_report(id))
    }

    async fn reports_for_zone(&self, zone: &str) -> Result<Vec<Report>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT id, zone, average_high_f, average_low_f,
                        total_rain_inches, total_snow_inches, created_at
                 FROM weather_reports
                 WHERE zone = $1
                 ORDER BY created_at",
                &[&zone],
            )
            .await?;
        Ok(rows.iter().map(Self::report_from_row).collect())
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// Postgres repository for one observation type. Implemented for
/// `TemperatureObservation` and `PrecipitationObservation`.
pub struct PgObservationRepository<T> {
    client: Arc<Client>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Observation> PgObservationRepository<T> {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl ObservationRepository<TemperatureObservation> for PgObservationRepository<TemperatureObservation> {
    async fn insert(&self, observation: TemperatureObservation) -> Result<(), StoreError> {
        observation.validate().map_err(StoreError::Rejected)?;
        self.client
            .execute(
                "INSERT INTO temperature_observations (zone, low_f, high_f, observed_on)
                 VALUES ($1, $2, $3, $4)",
                &[&observation.zone, &observation.low, &observation.high, &observation.observed_on],
            )
            .await?;
        Ok(())
    }

    async fn observed_after(
        &self,
        zone: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<TemperatureObservation>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT zone, low_f, high_f, observed_on
                 FROM temperature_observations
                 WHERE zone = $1 AND observed_on > $2
                 ORDER BY observed_on",
                &[&zone, &start],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| TemperatureObservation {
                zone: row.get(0),
                low: row.get(1),
                high: row.get(2),
                observed_on: row.get(3),
            })
            .collect())
    }
}

#[async_trait]
impl ObservationRepository<PrecipitationObservation> for PgObservationRepository<PrecipitationObservation> {
    async fn insert(&self, observation: PrecipitationObservation) -> Result<(), StoreError> {
        observation.validate().map_err(StoreError::Rejected)?;
        self.client
            .execute(
                "INSERT INTO precipitation_observations (zone, amount_inches, kind, observed_on)
                 VALUES ($1, $2, $3, $4)",
                &[
                    &observation.zone,
                    &observation.amount,
                    &observation.kind.as_str(),
                    &observation.observed_on,
                ],
            )
            .await?;
        Ok(())
    }

    async fn observed_after(
        &self,
        zone: &str,
        start: DateTime<Utc>,
    ) -> Result<Vec<PrecipitationObservation>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT zone, amount_inches, kind, observed_on
                 FROM precipitation_observations
                 WHERE zone = $1 AND observed_on > $2
                 ORDER BY observed_on",
                &[&zone, &start],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get(2);
                let amount: Decimal = row.get(1);
                Ok(PrecipitationObservation {
                    zone: row.get(0),
                    amount,
                    kind: kind.parse().map_err(StoreError::Database)?,
                    observed_on: row.get(3),
                })
            })
            .collect()
    }
}
