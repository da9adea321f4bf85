//! Persistence seams for reports and raw observations.
//!
//! Both traits are object-safe so services hold `Arc<dyn ...>` and tests can
//! swap in the in-memory backends.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{PendingReport, Report, StoreError};

pub use memory::{MemoryObservationRepository, MemoryReportStore};
pub use postgres::{PgObservationRepository, PgReportStore};

/// Append-only table of computed reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persists `report`, assigning its identifier. One durable write per call.
    async fn append(&self, report: PendingReport) -> Result<Report, StoreError>;

    /// All reports for `zone`, oldest first.
    async fn reports_for_zone(&self, zone: &str) -> Result<Vec<Report>, StoreError>;
}

/// Time-windowed record store behind one observation service.
#[async_trait]
pub trait ObservationRepository<T>: Send + Sync {
    async fn insert(&self, observation: T) -> Result<(), StoreError>;

    /// Records for `zone` observed strictly after `start`.
    async fn observed_after(&self, zone: &str, start: DateTime<Utc>) -> Result<Vec<T>, StoreError>;
}
