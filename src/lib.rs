//! Weather report service.
//!
//! Aggregates per-zone temperature and precipitation observations from two
//! independent observation stores into persisted weekly reports, and provides
//! the observation stores and a synthetic data loader alongside it.

pub mod aggregator;
pub mod analysis;
pub mod config;
pub mod db;
pub mod generator;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod server;
pub mod storage;
pub mod verify;
pub mod window;
pub mod wire;
