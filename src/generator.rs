/// Synthetic observation loader.
///
/// Generates one temperature pair and one precipitation record per zone per
/// UTC day and submits them to the observation stores. The random source is
/// injected so runs can be reproduced from a seed.
///
/// Generation rules:
///   - temperature: two integers in `[0, 100)`, sorted into `low` / `high`
///   - precipitation: with probability 1/2, an integer amount in `[1, 16)`
///     inches, `snow` when the day's low is below 32 F, otherwise `rain`;
///     otherwise zero inches of kind `none`
///
/// Failed submissions are logged and counted but never retried.

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::{ConfigError, Endpoint};
use crate::logging::{self, DataSource};
use crate::model::{PrecipitationKind, PrecipitationObservation, TemperatureObservation, Upstream};

/// Lows below this temperature (F) turn precipitation into snow.
pub const FREEZING_F: i64 = 32;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Draw a sorted low/high pair for `zone` on `day`.
pub fn temperature_for_day<R: Rng + ?Sized>(rng: &mut R, zone: &str, day: NaiveDate) -> TemperatureObservation {
    let mut pair = [rng.gen_range(0..100i64), rng.gen_range(0..100i64)];
    pair.sort_unstable();

    TemperatureObservation {
        zone: zone.to_string(),
        low: Decimal::from(pair[0]),
        high: Decimal::from(pair[1]),
        observed_on: start_of_day(day),
    }
}

/// Draw the day's precipitation; the kind depends on the day's `low`.
pub fn precipitation_for_day<R: Rng + ?Sized>(
    rng: &mut R,
    zone: &str,
    day: NaiveDate,
    low: Decimal,
) -> PrecipitationObservation {
    let is_precip = rng.gen_range(0..2) < 1;

    let (amount, kind) = if is_precip {
        let inches = Decimal::from(rng.gen_range(1..16i64));
        if low < Decimal::from(FREEZING_F) {
            (inches, PrecipitationKind::Snow)
        } else {
            (inches, PrecipitationKind::Rain)
        }
    } else {
        (Decimal::ZERO, PrecipitationKind::None)
    };

    PrecipitationObservation {
        zone: zone.to_string(),
        amount,
        kind,
        observed_on: start_of_day(day),
    }
}

fn start_of_day(day: NaiveDate) -> chrono::DateTime<chrono::Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Days from `today - history_days` through `today`, oldest first.
pub fn days_to_load(today: NaiveDate, history_days: i64) -> Vec<NaiveDate> {
    (0..=history_days.max(0))
        .rev()
        .map(|offset| today - Duration::days(offset))
        .collect()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Outcome of one loader run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub posted: usize,
    pub failed: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.posted + self.failed
    }
}

pub struct DataLoader<R: Rng> {
    http: reqwest::blocking::Client,
    temperature_url: reqwest::Url,
    precipitation_url: reqwest::Url,
    rng: R,
}

impl<R: Rng> DataLoader<R> {
    pub fn new(
        http: reqwest::blocking::Client,
        temperature: &Endpoint,
        precipitation: &Endpoint,
        rng: R,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http,
            temperature_url: temperature.submit_url()?,
            precipitation_url: precipitation.submit_url()?,
            rng,
        })
    }

    /// Generate and submit observations for every zone and day.
    pub fn run(&mut self, zones: &[String], history_days: i64, today: NaiveDate) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for zone in zones {
            logging::info(DataSource::Loader, Some(zone), "processing zone");

            for day in days_to_load(today, history_days) {
                let temperature = temperature_for_day(&mut self.rng, zone, day);
                let precipitation = precipitation_for_day(&mut self.rng, zone, day, temperature.low);

                self.submit(Upstream::Temperature, zone, &temperature, &mut summary);
                if self.submit(Upstream::Precipitation, zone, &precipitation, &mut summary) {
                    logging::debug(
                        DataSource::Precipitation,
                        Some(zone),
                        &format!("{}: {} {} in", day, precipitation.kind, precipitation.amount),
                    );
                }
            }
        }

        logging::log_load_summary(DataSource::Loader, summary.total(), summary.posted, summary.failed);
        summary
    }

    fn submit<T: Serialize>(
        &self,
        upstream: Upstream,
        zone: &str,
        observation: &T,
        summary: &mut LoadSummary,
    ) -> bool {
        let url = match upstream {
            Upstream::Temperature => self.temperature_url.clone(),
            Upstream::Precipitation => self.precipitation_url.clone(),
        };

        let outcome = self
            .http
            .post(url)
            .json(observation)
            .send()
            .map_err(|e| e.to_string())
            .and_then(|response| {
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(format!("HTTP error: {}", response.status().as_u16()))
                }
            });

        match outcome {
            Ok(()) => {
                summary.posted += 1;
                true
            }
            Err(msg) => {
                summary.failed += 1;
                logging::warn(
                    DataSource::from(upstream),
                    Some(zone),
                    &format!("submit failed: {}", msg),
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Observation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_temperature_pair_is_sorted_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let t = temperature_for_day(&mut rng, "11111", day());
            assert!(t.low <= t.high, "low {} above high {}", t.low, t.high);
            assert!(t.low >= Decimal::ZERO && t.high < Decimal::from(100));
            assert_eq!(t.observed_on.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        }
    }

    #[test]
    fn test_precipitation_always_satisfies_invariants() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut kinds = std::collections::HashSet::new();
        for i in 0..500 {
            let low = Decimal::from(i % 100);
            let p = precipitation_for_day(&mut rng, "11111", day(), low);
            assert!(p.validate().is_ok(), "{:?}", p);
            if p.kind == PrecipitationKind::Snow {
                assert!(low < Decimal::from(FREEZING_F));
            }
            if p.kind == PrecipitationKind::Rain {
                assert!(low >= Decimal::from(FREEZING_F));
            }
            if p.kind != PrecipitationKind::None {
                assert!(p.amount >= Decimal::ONE && p.amount < Decimal::from(16));
            }
            kinds.insert(p.kind);
        }
        assert_eq!(kinds.len(), 3, "500 draws should produce every kind");
    }

    #[test]
    fn test_same_seed_reproduces_observations() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(
                temperature_for_day(&mut a, "11111", day()),
                temperature_for_day(&mut b, "11111", day())
            );
        }
    }

    #[test]
    fn test_days_to_load_includes_today_and_history() {
        let days = days_to_load(day(), 2);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 4, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
                day(),
            ]
        );
        assert_eq!(days_to_load(day(), 0), vec![day()]);
    }

    fn endpoint(server: &mockito::ServerGuard) -> Endpoint {
        let addr = server.socket_address();
        Endpoint {
            protocol: "http".to_string(),
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    #[test]
    fn test_loader_posts_one_record_per_zone_day_and_store() {
        let mut temperature = mockito::Server::new();
        let mut precipitation = mockito::Server::new();

        // 2 zones x 3 days
        let temperature_mock = temperature
            .mock("POST", "/observation")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"zone": "11111"})))
            .with_status(201)
            .expect(3)
            .create();
        let other_zone_mock = temperature
            .mock("POST", "/observation")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"zone": "22222"})))
            .with_status(201)
            .expect(3)
            .create();
        let precipitation_mock = precipitation
            .mock("POST", "/observation")
            .with_status(201)
            .expect(6)
            .create();

        let mut loader = DataLoader::new(
            reqwest::blocking::Client::new(),
            &endpoint(&temperature),
            &endpoint(&precipitation),
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        let zones = vec!["11111".to_string(), "22222".to_string()];
        let summary = loader.run(&zones, 2, day());

        temperature_mock.assert();
        other_zone_mock.assert();
        precipitation_mock.assert();
        assert_eq!(summary, LoadSummary { posted: 12, failed: 0 });
    }

    #[test]
    fn test_loader_counts_rejected_submissions_and_continues() {
        let mut temperature = mockito::Server::new();
        let mut precipitation = mockito::Server::new();

        let _temperature_mock = temperature.mock("POST", "/observation").with_status(201).expect(2).create();
        let _precipitation_mock = precipitation.mock("POST", "/observation").with_status(500).expect(2).create();

        let mut loader = DataLoader::new(
            reqwest::blocking::Client::new(),
            &endpoint(&temperature),
            &endpoint(&precipitation),
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        let summary = loader.run(&["11111".to_string()], 1, day());

        assert_eq!(summary, LoadSummary { posted: 2, failed: 2 });
        assert_eq!(summary.total(), 4);
    }
}
