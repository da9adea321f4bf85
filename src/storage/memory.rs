//! In-process backends, used by tests and local runs without Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use super::{ObservationRepository, ReportStore};
use crate::model::{Observation, PendingReport, Report, StoreError};

fn poisoned() -> StoreError {
    StoreError::Database("in-memory store lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports persisted so far.
    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn append(&self, report: PendingReport) -> Result<Report, StoreError> {
        let report = report.into_report(Uuid::new_v4());
        self.reports.lock().map_err(|_| poisoned())?.push(report.clone());
        Ok(report)
    }

    async fn reports_for_zone(&self, zone: &str) -> Result<Vec<Report>, StoreError> {
        let reports = self.reports.lock().map_err(|_| poisoned())?;
        Ok(reports.iter().filter(|r| r.zone == zone).cloned().collect())
    }
}

#[derive(Debug)]
pub struct MemoryObservationRepository<T> {
    records: Mutex<Vec<T>>,
}

impl<T> MemoryObservationRepository<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Default for MemoryObservationRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Observation> ObservationRepository<T> for MemoryObservationRepository<T> {
    async fn insert(&self, observation: T) -> Result<(), StoreError> {
        observation.validate().map_err(StoreError::Rejected)?;
        self.records.lock().map_err(|_| poisoned())?.push(observation);
        Ok(())
    }

    async fn observed_after(&self, zone: &str, start: DateTime<Utc>) -> Result<Vec<T>, StoreError> {
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .filter(|r| r.zone() == zone && r.observed_on() > start)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PrecipitationKind, PrecipitationObservation, TemperatureObservation};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn pending(zone: &str) -> PendingReport {
        PendingReport {
            zone: zone.to_string(),
            average_high_f: Decimal::new(550, 1),
            average_low_f: Decimal::new(350, 1),
            total_rain_inches: Decimal::new(20, 1),
            total_snow_inches: Decimal::new(30, 1),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_distinct_ids() {
        let store = MemoryReportStore::new();
        let first = store.append(pending("11111")).await.unwrap();
        let second = store.append(pending("11111")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.reports_for_zone("11111").await.unwrap().len(), 2);
        assert!(store.reports_for_zone("22222").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observed_after_filters_zone_and_time() {
        let repo = MemoryObservationRepository::<TemperatureObservation>::new();
        for (zone, day) in [("11111", 1), ("11111", 5), ("22222", 5)] {
            repo.insert(TemperatureObservation {
                zone: zone.to_string(),
                low: Decimal::from(30),
                high: Decimal::from(50),
                observed_on: Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        }

        let start = Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap();
        let found = repo.observed_after("11111", start).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].observed_on.format("%d").to_string(), "05");
    }

    #[tokio::test]
    async fn test_invalid_precipitation_is_rejected() {
        let repo = MemoryObservationRepository::<PrecipitationObservation>::new();
        let result = repo
            .insert(PrecipitationObservation {
                zone: "11111".to_string(),
                amount: Decimal::from(2),
                kind: PrecipitationKind::None,
                observed_on: Utc::now(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }
}
