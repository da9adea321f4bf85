//! Weekly report aggregation.
//!
//! `Aggregator::build_report` fetches the precipitation and temperature sets
//! for a zone concurrently, reduces them to the four report statistics,
//! persists the result through the `ReportStore` and returns it.
//!
//! Every failure aborts the whole build: nothing is persisted unless both
//! fetches succeeded and the statistics were computable. Concurrent identical
//! requests are not coalesced, so overlapping calls may persist duplicate
//! reports.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::statistics::{StatisticsError, average, round_to_1, total_by_kind};
use crate::config::Config;
use crate::ingest::observations::ObservationClient;
use crate::logging::{self, DataSource};
use crate::model::{
    PendingReport, PrecipitationKind, PrecipitationObservation, Report, ReportError,
    TemperatureObservation, Upstream, UpstreamFailure,
};
use crate::storage::ReportStore;
use crate::window::LookbackWindow;

pub struct Aggregator {
    temperature: ObservationClient,
    precipitation: ObservationClient,
    store: Arc<dyn ReportStore>,
    deadline: Duration,
}

impl Aggregator {
    /// `deadline` bounds the concurrent fetch of both observation sets.
    pub fn new(
        temperature: ObservationClient,
        precipitation: ObservationClient,
        store: Arc<dyn ReportStore>,
        deadline: Duration,
    ) -> Self {
        Self {
            temperature,
            precipitation,
            store,
            deadline,
        }
    }

    /// Builds clients for both configured upstreams sharing one connection pool.
    ///
    /// The client itself carries no timeout; the fetch deadline is enforced
    /// only by `with_deadline`, so expiry is always reported as `TimedOut`.
    pub fn from_config(config: &Config, store: Arc<dyn ReportStore>) -> Result<Self, reqwest::Error> {
        let deadline = config.report.request_timeout();
        let http = reqwest::Client::builder().build()?;

        Ok(Self::new(
            ObservationClient::new(http.clone(), config.upstreams.temperature.clone(), Upstream::Temperature),
            ObservationClient::new(http, config.upstreams.precipitation.clone(), Upstream::Precipitation),
            store,
            deadline,
        ))
    }

    pub async fn build_report(&self, zone: &str, days: i64) -> Result<Report, ReportError> {
        self.build_report_at(zone, days, Utc::now()).await
    }

    /// [`Aggregator::build_report`] with an injected clock for `created_at`.
    pub async fn build_report_at(
        &self,
        zone: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Report, ReportError> {
        let window = LookbackWindow::new(days)?;

        let (precipitation, temperatures) = match self.fetch_observations(zone, window).await {
            Ok(sets) => sets,
            Err(e) => {
                let source = match &e {
                    ReportError::UpstreamUnavailable { upstream, .. } => DataSource::from(*upstream),
                    _ => DataSource::Reports,
                };
                logging::log_upstream_failure(source, zone, "fetch observations", &e);
                return Err(e);
            }
        };

        let pending = summarize(zone, &temperatures, &precipitation, now).map_err(|e| {
            logging::log_upstream_failure(DataSource::Reports, zone, "summarize", &e);
            e
        })?;

        logging::info(
            DataSource::Reports,
            Some(zone),
            &format!(
                "over last {} days: rain {} in, snow {} in, low {} F, high {} F",
                window.days(),
                pending.total_rain_inches,
                pending.total_snow_inches,
                pending.average_low_f,
                pending.average_high_f
            ),
        );

        self.store.append(pending).await.map_err(|e| {
            logging::error(DataSource::Database, Some(zone), &format!("report not persisted: {}", e));
            ReportError::PersistenceFailed(e.to_string())
        })
    }

    /// Starts both fetches before awaiting either. The first failure wins and
    /// the other in-flight request is dropped.
    async fn fetch_observations(
        &self,
        zone: &str,
        window: LookbackWindow,
    ) -> Result<(Vec<PrecipitationObservation>, Vec<TemperatureObservation>), ReportError> {
        let days = window.days();
        tokio::try_join!(
            with_deadline(self.deadline, Upstream::Precipitation, self.precipitation.precipitation(zone, days)),
            with_deadline(self.deadline, Upstream::Temperature, self.temperature.temperatures(zone, days)),
        )
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    upstream: Upstream,
    fetch: impl Future<Output = Result<T, ReportError>>,
) -> Result<T, ReportError> {
    match tokio::time::timeout(deadline, fetch).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::UpstreamUnavailable {
            upstream,
            failure: UpstreamFailure::TimedOut(deadline),
        }),
    }
}

/// Reduces both observation sets to an unpersisted report.
///
/// An empty precipitation set yields zero totals. An empty temperature set
/// fails with `InsufficientData`. `low` and `high` are averaged as given, with
/// no attempt to reorder a pair. Values whose sums leave the decimal range
/// make the set that supplied them `Malformed`.
pub fn summarize(
    zone: &str,
    temperatures: &[TemperatureObservation],
    precipitation: &[PrecipitationObservation],
    now: DateTime<Utc>,
) -> Result<PendingReport, ReportError> {
    if temperatures.is_empty() {
        return Err(ReportError::InsufficientData(format!(
            "no temperature observations for zone {}",
            zone
        )));
    }

    let precipitation_error = |e| statistics_failure(zone, Upstream::Precipitation, e);
    let temperature_error = |e| statistics_failure(zone, Upstream::Temperature, e);

    let total_rain_inches =
        round_to_1(total_by_kind(precipitation, PrecipitationKind::Rain).map_err(precipitation_error)?);
    let total_snow_inches =
        round_to_1(total_by_kind(precipitation, PrecipitationKind::Snow).map_err(precipitation_error)?);
    let average_high_f = round_to_1(average(temperatures.iter().map(|t| t.high)).map_err(temperature_error)?);
    let average_low_f = round_to_1(average(temperatures.iter().map(|t| t.low)).map_err(temperature_error)?);

    Ok(PendingReport {
        zone: zone.to_string(),
        average_high_f,
        average_low_f,
        total_rain_inches,
        total_snow_inches,
        created_at: now,
    })
}

fn statistics_failure(zone: &str, upstream: Upstream, err: StatisticsError) -> ReportError {
    match err {
        StatisticsError::EmptySeries => {
            ReportError::InsufficientData(format!("no {} observations for zone {}", upstream, zone))
        }
        StatisticsError::Overflow => ReportError::UpstreamUnavailable {
            upstream,
            failure: UpstreamFailure::Malformed(err.to_string()),
        },
    }
}
