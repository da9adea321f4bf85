//! Observation store contract, served once per observation kind.
//!
//! - `GET /observation/{zone}?days={n}` returns the records observed strictly
//!   after `now - n days`.
//! - `POST /observation` accepts one record with case-insensitive keys and
//!   any timestamp offset; it is stored in UTC and answered with 201.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use super::{ApiError, WindowQuery};
use crate::logging::{self, DataSource};
use crate::model::Observation;
use crate::storage::ObservationRepository;
use crate::window::LookbackWindow;
use crate::wire;

type Repository<T> = Arc<dyn ObservationRepository<T>>;

pub fn observation_routes<T: Observation>(repository: Repository<T>) -> Router {
    Router::new()
        .route("/observation/{zone}", get(list_observations::<T>))
        .route("/observation", post(submit_observation::<T>))
        .route("/observation/", post(submit_observation::<T>))
        .with_state(repository)
}

async fn list_observations<T: Observation>(
    State(repository): State<Repository<T>>,
    Path(zone): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<T>>, ApiError> {
    let window = LookbackWindow::new(query.days()?)?;
    let records = repository
        .observed_after(&zone, window.start_at(Utc::now()))
        .await?;

    logging::debug(
        DataSource::from(T::UPSTREAM),
        Some(&zone),
        &format!("{} records over last {} days", records.len(), window.days()),
    );
    Ok(Json(records))
}

async fn submit_observation<T: Observation>(
    State(repository): State<Repository<T>>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let observation: T = wire::decode(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    observation.validate().map_err(ApiError::BadRequest)?;

    let zone = observation.zone().to_string();
    repository.insert(observation).await.map_err(|e| {
        logging::error(DataSource::Database, Some(&zone), &format!("insert failed: {}", e));
        e
    })?;

    Ok(StatusCode::CREATED)
}
