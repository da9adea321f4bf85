/// Core data types for the weather report service.
///
/// This module defines the shared domain model imported by all other modules:
/// the observation records exchanged with the observation stores, the
/// persisted weekly report, and the error types surfaced by the aggregator,
/// the stores and the HTTP boundary. It contains no I/O.
///
/// JSON field naming is camelCase on write. On read, keys go through
/// `wire::decode`, which folds case and separators, so every multi-word field
/// carries an explicit folded deserialize name. Observations also accept the
/// legacy `zipCode` / `createdOn` keys.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Upstreams
// ---------------------------------------------------------------------------

/// The two independent observation stores the aggregator reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Temperature,
    Precipitation,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Temperature => "temperature",
            Upstream::Precipitation => "precipitation",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// Behaviour shared by both observation record types, used by the generic
/// observation store routes and repositories.
pub trait Observation:
    Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Which store holds records of this type.
    const UPSTREAM: Upstream;

    fn zone(&self) -> &str;

    fn observed_on(&self) -> DateTime<Utc>;

    /// Checks record-level invariants. Returns a human-readable reason on
    /// violation.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A daily low/high temperature pair for one zone, in degrees Fahrenheit.
///
/// The generator sorts the pair before sending, but `low <= high` is not
/// enforced anywhere: both fields are used exactly as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "lowercase"))]
pub struct TemperatureObservation {
    #[serde(alias = "zipcode")]
    pub zone: String,
    pub low: Decimal,
    pub high: Decimal,
    #[serde(
        rename(deserialize = "observedon"),
        alias = "createdon",
        deserialize_with = "crate::wire::utc_timestamp"
    )]
    pub observed_on: DateTime<Utc>,
}

impl Observation for TemperatureObservation {
    const UPSTREAM: Upstream = Upstream::Temperature;

    fn zone(&self) -> &str {
        &self.zone
    }

    fn observed_on(&self) -> DateTime<Utc> {
        self.observed_on
    }
}

/// Type of precipitation recorded for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PrecipitationKind {
    None,
    Rain,
    Snow,
}

impl PrecipitationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecipitationKind::None => "none",
            PrecipitationKind::Rain => "rain",
            PrecipitationKind::Snow => "snow",
        }
    }
}

impl fmt::Display for PrecipitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrecipitationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PrecipitationKind::None),
            "rain" => Ok(PrecipitationKind::Rain),
            "snow" => Ok(PrecipitationKind::Snow),
            other => Err(format!("unknown precipitation kind: {:?}", other)),
        }
    }
}

impl TryFrom<String> for PrecipitationKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Daily precipitation for one zone, in inches.
///
/// Invariants: `amount >= 0`, and `kind == none` implies `amount == 0`
/// (equivalently, a positive amount always has a rain or snow kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "lowercase"))]
pub struct PrecipitationObservation {
    #[serde(alias = "zipcode")]
    pub zone: String,
    pub amount: Decimal,
    pub kind: PrecipitationKind,
    #[serde(
        rename(deserialize = "observedon"),
        alias = "createdon",
        deserialize_with = "crate::wire::utc_timestamp"
    )]
    pub observed_on: DateTime<Utc>,
}

impl Observation for PrecipitationObservation {
    const UPSTREAM: Upstream = Upstream::Precipitation;

    fn zone(&self) -> &str {
        &self.zone
    }

    fn observed_on(&self) -> DateTime<Utc> {
        self.observed_on
    }

    fn validate(&self) -> Result<(), String> {
        if self.amount < Decimal::ZERO {
            return Err(format!("negative precipitation amount: {}", self.amount));
        }
        if self.kind == PrecipitationKind::None && !self.amount.is_zero() {
            return Err(format!(
                "precipitation of kind none must have zero amount, got {}",
                self.amount
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Computed summary that has not been persisted yet and so has no id.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReport {
    pub zone: String,
    pub average_high_f: Decimal,
    pub average_low_f: Decimal,
    pub total_rain_inches: Decimal,
    pub total_snow_inches: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PendingReport {
    /// Attaches the store-assigned identifier.
    pub fn into_report(self, id: Uuid) -> Report {
        Report {
            id,
            zone: self.zone,
            average_high_f: self.average_high_f,
            average_low_f: self.average_low_f,
            total_rain_inches: self.total_rain_inches,
            total_snow_inches: self.total_snow_inches,
            created_at: self.created_at,
        }
    }
}

/// Persisted, immutable summary of one zone over a lookback window.
///
/// All four statistics carry one decimal place. Observations are not
/// referenced: the report is a denormalized summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "lowercase"))]
pub struct Report {
    pub id: Uuid,
    pub zone: String,
    #[serde(rename(deserialize = "averagehighf"))]
    pub average_high_f: Decimal,
    #[serde(rename(deserialize = "averagelowf"))]
    pub average_low_f: Decimal,
    #[serde(rename(deserialize = "totalraininches"))]
    pub total_rain_inches: Decimal,
    #[serde(rename(deserialize = "totalsnowinches"))]
    pub total_snow_inches: Decimal,
    #[serde(
        rename(deserialize = "createdat"),
        deserialize_with = "crate::wire::utc_timestamp"
    )]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why an observation store could not supply data.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFailure {
    /// Connection refused, DNS failure, reset, or any transport error.
    Unreachable(String),
    /// Non-2xx HTTP response.
    HttpStatus(u16),
    /// The body was not a JSON array of valid observation records.
    Malformed(String),
    /// The fetch did not complete before the request deadline.
    TimedOut(Duration),
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFailure::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            UpstreamFailure::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            UpstreamFailure::Malformed(msg) => write!(f, "Parse error: {}", msg),
            UpstreamFailure::TimedOut(deadline) => {
                write!(f, "timeout after {} ms", deadline.as_millis())
            }
        }
    }
}

/// Failures of a report build. Every variant aborts the whole operation;
/// no partial report is ever persisted or returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    /// `days` outside `[1, 30]`. Caller error.
    InvalidWindow(i64),
    /// One of the observation stores failed. Safe to retry the whole request.
    UpstreamUnavailable {
        upstream: Upstream,
        failure: UpstreamFailure,
    },
    /// An observation set needed for an average was empty.
    InsufficientData(String),
    /// The computed report could not be written. The report is discarded.
    PersistenceFailed(String),
}

impl ReportError {
    /// Stable name of the failure kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::InvalidWindow(_) => "InvalidWindow",
            ReportError::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            ReportError::InsufficientData(_) => "InsufficientData",
            ReportError::PersistenceFailed(_) => "PersistenceFailed",
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::InvalidWindow(days) => {
                write!(f, "Invalid window: days must be between 1 and 30, got {}", days)
            }
            ReportError::UpstreamUnavailable { upstream, failure } => {
                write!(f, "Upstream {} unavailable: {}", upstream, failure)
            }
            ReportError::InsufficientData(msg) => write!(f, "Insufficient data: {}", msg),
            ReportError::PersistenceFailed(msg) => write!(f, "Persistence failed: {}", msg),
        }
    }
}

impl std::error::Error for ReportError {}

/// Errors raised by report and observation storage backends.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The backend failed (connection lost, statement error).
    Database(String),
    /// The backend refused the record (constraint violation).
    Rejected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Rejected(msg) => write!(f, "Record rejected: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
