/// Observation Store API Client
///
/// Retrieves time-windowed observation sets from the temperature and
/// precipitation stores for report aggregation.
///
/// Contract: `GET {base}/observation/{zone}?days={n}` returns a JSON array of
/// records observed within the trailing `n` days. The store owns the window
/// boundary; this client passes `zone` and `days` through verbatim.

use crate::config::Endpoint;
use crate::model::{
    Observation, PrecipitationObservation, ReportError, TemperatureObservation, Upstream,
    UpstreamFailure,
};
use crate::wire;

// ============================================================================
// Client
// ============================================================================

/// HTTP client bound to one observation store.
#[derive(Debug, Clone)]
pub struct ObservationClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    upstream: Upstream,
}

impl ObservationClient {
    pub fn new(http: reqwest::Client, endpoint: Endpoint, upstream: Upstream) -> Self {
        Self {
            http,
            endpoint,
            upstream,
        }
    }

    pub fn upstream(&self) -> Upstream {
        self.upstream
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Fetch and decode every record for `zone` within the trailing `days`.
    ///
    /// # Returns
    /// Records in store order; each one has passed `Observation::validate`.
    pub async fn fetch<T: Observation>(&self, zone: &str, days: i64) -> Result<Vec<T>, ReportError> {
        let url = self
            .endpoint
            .observation_url(zone, days)
            .map_err(|e| self.failure(UpstreamFailure::Unreachable(e.to_string())))?;

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.failure(UpstreamFailure::Unreachable(e.to_string())))?;

        if !response.status().is_success() {
            return Err(self.failure(UpstreamFailure::HttpStatus(response.status().as_u16())));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.failure(UpstreamFailure::Malformed(e.to_string())))?;

        decode_records(body).map_err(|msg| self.failure(UpstreamFailure::Malformed(msg)))
    }

    /// Temperature observations for `zone` over the trailing `days`.
    pub async fn temperatures(&self, zone: &str, days: i64) -> Result<Vec<TemperatureObservation>, ReportError> {
        self.fetch(zone, days).await
    }

    /// Precipitation observations for `zone` over the trailing `days`.
    pub async fn precipitation(&self, zone: &str, days: i64) -> Result<Vec<PrecipitationObservation>, ReportError> {
        self.fetch(zone, days).await
    }

    fn failure(&self, failure: UpstreamFailure) -> ReportError {
        ReportError::UpstreamUnavailable {
            upstream: self.upstream,
            failure,
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a store response body into validated records.
///
/// A body that is not an array, a record with unknown shape, or a record that
/// violates its invariants all reject the whole response.
pub fn decode_records<T: Observation>(body: serde_json::Value) -> Result<Vec<T>, String> {
    if !body.is_array() {
        return Err("expected a JSON array of observations".to_string());
    }

    let records: Vec<T> = wire::decode(body).map_err(|e| e.to_string())?;

    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|reason| format!("record {}: {}", index, reason))?;
    }

    Ok(records)
}

// ============================================================================
// Tests
// ============================================================================
