//! Upstream Verification Module
//!
//! Probes the configured observation stores before the report service starts
//! so a bad `[upstreams]` section shows up as a readable summary instead of
//! 502/503 responses at request time.
//!
//! Each probe issues `GET /observation/{probe_zone}?days=1` and checks that
//! the response is a JSON array of valid records.

use chrono::Utc;
use serde::Serialize;
use std::error::Error;
use std::time::Duration;

use crate::config::{Config, Endpoint};
use crate::ingest::observations::decode_records;
use crate::model::{Observation, PrecipitationObservation, TemperatureObservation, Upstream};

/// Zone used when the loader has no zones configured.
pub const DEFAULT_PROBE_ZONE: &str = "11111";

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<UpstreamVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpstreamVerification {
    pub upstream: String,
    pub url: String,
    pub status: VerificationStatus,
    pub api_responsive: bool,
    pub sample_data_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    /// Responded with a valid but empty array.
    PartialSuccess,
    Failed,
}

impl VerificationReport {
    pub fn all_working(&self) -> bool {
        self.summary.failed == 0
    }
}

// ============================================================================
// Probing
// ============================================================================

pub fn verify_upstream(
    client: &reqwest::blocking::Client,
    upstream: Upstream,
    endpoint: &Endpoint,
    probe_zone: &str,
) -> UpstreamVerification {
    match upstream {
        Upstream::Temperature => probe::<TemperatureObservation>(client, endpoint, probe_zone),
        Upstream::Precipitation => probe::<PrecipitationObservation>(client, endpoint, probe_zone),
    }
}

fn probe<T: Observation>(
    client: &reqwest::blocking::Client,
    endpoint: &Endpoint,
    probe_zone: &str,
) -> UpstreamVerification {
    let mut result = UpstreamVerification {
        upstream: T::UPSTREAM.to_string(),
        url: endpoint.base_url(),
        status: VerificationStatus::Failed,
        api_responsive: false,
        sample_data_count: 0,
        error_message: None,
    };

    let url = match endpoint.observation_url(probe_zone, 1) {
        Ok(url) => url,
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    };
    result.url = url.to_string();

    match client.get(url).timeout(Duration::from_secs(10)).send() {
        Ok(response) if response.status().is_success() => {
            result.api_responsive = true;
            match response
                .json::<serde_json::Value>()
                .map_err(|e| e.to_string())
                .and_then(decode_records::<T>)
            {
                Ok(records) => {
                    result.sample_data_count = records.len();
                    result.status = if records.is_empty() {
                        VerificationStatus::PartialSuccess
                    } else {
                        VerificationStatus::Success
                    };
                }
                Err(e) => {
                    result.error_message = Some(format!("Parse error: {}", e));
                }
            }
        }
        Ok(response) => {
            result.api_responsive = true;
            result.error_message = Some(format!("HTTP {}", response.status()));
        }
        Err(e) => {
            result.error_message = Some(format!("Request failed: {}", e));
        }
    }

    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn run_verification(config: &Config) -> Result<VerificationReport, Box<dyn Error>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config.report.request_timeout())
        .build()?;

    let probe_zone = config
        .loader
        .zones
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_PROBE_ZONE);

    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        results: Vec::new(),
        summary: VerificationSummary::default(),
    };

    println!("🔍 Verifying observation stores (zone {})...", probe_zone);
    for upstream in [Upstream::Temperature, Upstream::Precipitation] {
        let endpoint = config.upstreams.endpoint(upstream);
        print!("  {} ({}) ... ", upstream, endpoint.base_url());

        let result = verify_upstream(&client, upstream, endpoint, probe_zone);
        report.summary.total += 1;

        match result.status {
            VerificationStatus::Success => {
                println!("✓ OK ({} records)", result.sample_data_count);
                report.summary.working += 1;
            }
            VerificationStatus::PartialSuccess => {
                println!("⚠ Responsive but no data");
                report.summary.working += 1;
            }
            VerificationStatus::Failed => {
                println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
                report.summary.failed += 1;
            }
        }

        report.results.push(result);
    }

    Ok(report)
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "Observation stores: {}/{} working  ({} failed)",
        report.summary.working, report.summary.total, report.summary.failed
    );
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn endpoint(server: &mockito::ServerGuard) -> Endpoint {
        let addr = server.socket_address();
        Endpoint {
            protocol: "http".to_string(),
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    #[test]
    fn test_responsive_store_with_records_is_success() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/observation/11111")
            .match_query(Matcher::UrlEncoded("days".into(), "1".into()))
            .with_body(r#"[{"zone":"11111","low":30,"high":50,"observedOn":"2024-05-01T00:00:00Z"}]"#)
            .create();

        let client = reqwest::blocking::Client::new();
        let result = verify_upstream(&client, Upstream::Temperature, &endpoint(&server), "11111");

        mock.assert();
        assert_eq!(result.status, VerificationStatus::Success);
        assert_eq!(result.sample_data_count, 1);
    }

    #[test]
    fn test_empty_array_is_partial_success() {
        let mut server = Server::new();
        let _server_mock = server
            .mock("GET", "/observation/11111")
            .match_query(Matcher::Any)
            .with_body("[]")
            .create();

        let client = reqwest::blocking::Client::new();
        let result = verify_upstream(&client, Upstream::Precipitation, &endpoint(&server), "11111");
        assert_eq!(result.status, VerificationStatus::PartialSuccess);
    }

    #[test]
    fn test_error_status_fails() {
        let mut server = Server::new();
        let _server_mock = server
            .mock("GET", "/observation/11111")
            .match_query(Matcher::Any)
            .with_status(500)
            .create();

        let client = reqwest::blocking::Client::new();
        let result = verify_upstream(&client, Upstream::Precipitation, &endpoint(&server), "11111");
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(result.api_responsive);
        assert!(result.error_message.unwrap().contains("500"));
    }

    #[test]
    fn test_malformed_records_fail() {
        let mut server = Server::new();
        let _server_mock = server
            .mock("GET", "/observation/11111")
            .match_query(Matcher::Any)
            .with_body(r#"[{"zone":"11111","amount":2,"kind":"none","observedOn":"2024-05-01"}]"#)
            .create();

        let client = reqwest::blocking::Client::new();
        let result = verify_upstream(&client, Upstream::Precipitation, &endpoint(&server), "11111");
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(result.error_message.unwrap().starts_with("Parse error"));
    }
}
