/// Database bootstrap: connection check and schema migration.
///
/// Runs on the blocking `postgres` client before a service starts its async
/// runtime, so a missing database or a failed migration stops the process
/// before it accepts traffic. Request paths use `storage::postgres` instead.

use postgres::{Client, NoTls};
use std::env;
use std::fmt;

/// Schema applied by [`migrate`].
pub const SCHEMA_SQL: &str = include_str!("../sql/001_weather_schema.sql");

/// Tables every service expects after migration.
pub const REQUIRED_TABLES: &[&str] = &[
    "temperature_observations",
    "precipitation_observations",
    "weather_reports",
];

#[derive(Debug)]
pub enum DbError {
    /// `DATABASE_URL` is not set.
    MissingUrl,
    /// Could not connect to the server.
    Connection(String),
    /// A migration or verification statement failed.
    Schema(String),
    /// Verification found tables absent after migration.
    MissingTables(Vec<String>),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::MissingUrl => write!(f, "DATABASE_URL must be set (environment or .env)"),
            DbError::Connection(msg) => write!(f, "Database connection failed: {}", msg),
            DbError::Schema(msg) => write!(f, "Schema setup failed: {}", msg),
            DbError::MissingTables(tables) => {
                write!(f, "Missing tables after migration: {}", tables.join(", "))
            }
        }
    }
}

impl std::error::Error for DbError {}

/// Reads `DATABASE_URL`, loading `.env` first if present.
pub fn database_url() -> Result<String, DbError> {
    dotenv::dotenv().ok();
    env::var("DATABASE_URL").map_err(|_| DbError::MissingUrl)
}

/// Applies the schema. Idempotent.
pub fn migrate(client: &mut Client) -> Result<(), DbError> {
    client
        .batch_execute(SCHEMA_SQL)
        .map_err(|e| DbError::Schema(e.to_string()))
}

/// Returns the names in `tables` that do not exist in the public schema.
pub fn missing_tables(client: &mut Client, tables: &[&str]) -> Result<Vec<String>, DbError> {
    let mut missing = Vec::new();
    for table in tables {
        let row = client
            .query_one(
                "SELECT EXISTS (
                     SELECT 1 FROM information_schema.tables
                     WHERE table_schema = 'public' AND table_name = $1
                 )",
                &[table],
            )
            .map_err(|e| DbError::Schema(e.to_string()))?;
        let exists: bool = row.get(0);
        if !exists {
            missing.push(table.to_string());
        }
    }
    Ok(missing)
}

/// Connects, migrates, and verifies that `tables` exist.
///
/// The returned client is blocking; drop it before entering an async runtime.
pub fn connect_and_verify(database_url: &str, tables: &[&str]) -> Result<Client, DbError> {
    let mut client =
        Client::connect(database_url, NoTls).map_err(|e| DbError::Connection(e.to_string()))?;

    migrate(&mut client)?;

    let missing = missing_tables(&mut client, tables)?;
    if !missing.is_empty() {
        return Err(DbError::MissingTables(missing));
    }

    Ok(client)
}
