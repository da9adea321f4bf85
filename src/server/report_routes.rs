//! `GET /weather-report/{zone}?days={n}`

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use std::sync::Arc;

use super::{ApiError, WindowQuery};
use crate::aggregator::Aggregator;
use crate::model::Report;

pub fn report_routes(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/weather-report/{zone}", get(weather_report))
        .with_state(aggregator)
}

async fn weather_report(
    State(aggregator): State<Arc<Aggregator>>,
    Path(zone): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Report>, ApiError> {
    let days = query.days()?;
    let report = aggregator.build_report(&zone, days).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;
    use crate::ingest::observations::ObservationClient;
    use crate::model::Upstream;
    use crate::storage::{MemoryReportStore, ReportStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn endpoint(server: &ServerGuard) -> Endpoint {
        let addr = server.socket_address();
        Endpoint {
            protocol: "http".to_string(),
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    fn app(temperature: &ServerGuard, precipitation: &ServerGuard, store: Arc<MemoryReportStore>) -> Router {
        let http = reqwest::Client::new();
        let aggregator = Aggregator::new(
            ObservationClient::new(http.clone(), endpoint(temperature), Upstream::Temperature),
            ObservationClient::new(http, endpoint(precipitation), Upstream::Precipitation),
            store,
            Duration::from_secs(5),
        );
        report_routes(Arc::new(aggregator))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_report_is_built_and_persisted() {
        let mut temperature = Server::new_async().await;
        let mut precipitation = Server::new_async().await;

        let _temperature_mock = temperature
            .mock("GET", "/observation/11111")
            .match_query(Matcher::UrlEncoded("days".into(), "7".into()))
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"zone": "11111", "low": 30, "high": 50, "observedOn": "2024-05-01T00:00:00Z"},
                    {"zone": "11111", "low": 40, "high": 60, "observedOn": "2024-05-02T00:00:00Z"}
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let _precipitation_mock = precipitation
            .mock("GET", "/observation/11111")
            .match_query(Matcher::UrlEncoded("days".into(), "7".into()))
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"zone": "11111", "amount": 2, "kind": "rain", "observedOn": "2024-05-01T00:00:00Z"},
                    {"zone": "11111", "amount": 0, "kind": "none", "observedOn": "2024-05-02T00:00:00Z"},
                    {"zone": "11111", "amount": 3, "kind": "snow", "observedOn": "2024-05-03T00:00:00Z"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let store = Arc::new(MemoryReportStore::new());
        let (status, body) = get_json(
            app(&temperature, &precipitation, store.clone()),
            "/weather-report/11111?days=7",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["zone"], "11111");
        assert_eq!(body["averageLowF"], 35.0);
        assert_eq!(body["averageHighF"], 55.0);
        assert_eq!(body["totalRainInches"], 2.0);
        assert_eq!(body["totalSnowInches"], 3.0);
        assert_eq!(store.reports_for_zone("11111").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_days_is_bad_request() {
        let temperature = Server::new_async().await;
        let precipitation = Server::new_async().await;
        let store = Arc::new(MemoryReportStore::new());

        let (status, body) = get_json(app(&temperature, &precipitation, store.clone()), "/weather-report/11111").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");

        let (status, body) = get_json(
            app(&temperature, &precipitation, store.clone()),
            "/weather-report/11111?days=31",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidWindow");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_bad_gateway() {
        let mut temperature = Server::new_async().await;
        let mut precipitation = Server::new_async().await;

        let _temperature_mock = temperature
            .mock("GET", "/observation/11111")
            .match_query(Matcher::Any)
            .with_body("[]")
            .create_async()
            .await;
        let _precipitation_mock = precipitation
            .mock("GET", "/observation/11111")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let store = Arc::new(MemoryReportStore::new());
        let (status, body) = get_json(
            app(&temperature, &precipitation, store.clone()),
            "/weather-report/11111?days=7",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "UpstreamUnavailable");
        assert!(store.is_empty());
    }
}
