/// Structured logging for the weather services
///
/// Provides context-rich logging with data source and zone identifiers,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for long-running services.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::Upstream;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {:?}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Temperature,
    Precipitation,
    Reports,
    Loader,
    Http,
    Database,
    System,
}

impl From<Upstream> for DataSource {
    fn from(upstream: Upstream) -> Self {
        match upstream {
            Upstream::Temperature => DataSource::Temperature,
            Upstream::Precipitation => DataSource::Precipitation,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Temperature => write!(f, "TEMP"),
            DataSource::Precipitation => write!(f, "PRECIP"),
            DataSource::Reports => write!(f, "REPORT"),
            DataSource::Loader => write!(f, "LOADER"),
            DataSource::Http => write!(f, "HTTP"),
            DataSource::Database => write!(f, "DB"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the store answered but had nothing for this zone
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, source: &DataSource, zone: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let zone_part = zone.map(|z| format!(" [{}]", z)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, source, zone_part, message)
    }

    fn log(&self, level: LogLevel, source: &DataSource, zone: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, source, zone, message);
        let zone_part = zone.map(|z| format!(" [{}]", z)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, zone_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, zone_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, source: DataSource, zone: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, zone, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: DataSource, zone: Option<&str>, message: &str) {
    emit(LogLevel::Info, source, zone, message);
}

/// Log a warning message
pub fn warn(source: DataSource, zone: Option<&str>, message: &str) {
    emit(LogLevel::Warning, source, zone, message);
}

/// Log an error message
pub fn error(source: DataSource, zone: Option<&str>, message: &str) {
    emit(LogLevel::Error, source, zone, message);
}

/// Log a debug message
pub fn debug(source: DataSource, zone: Option<&str>, message: &str) {
    emit(LogLevel::Debug, source, zone, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify an observation store failure from its rendered error message
pub fn classify_upstream_failure(error_message: &str) -> FailureType {
    if error_message.contains("Insufficient data") {
        // The store answered; the zone simply has no recent observations.
        FailureType::Expected
    } else if error_message.contains("HTTP error")
        || error_message.contains("timeout")
        || error_message.contains("unreachable")
    {
        FailureType::Unexpected
    } else if error_message.contains("Parse error") {
        // Parse errors suggest a contract change between services
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed operation against an observation store, with classification
pub fn log_upstream_failure(source: DataSource, zone: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_upstream_failure(&error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(source, Some(zone), &message),
        FailureType::Unexpected => error(source, Some(zone), &message),
        FailureType::Unknown => warn(source, Some(zone), &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a data loader run
pub fn log_load_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Load complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if successful == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            classify_upstream_failure("Upstream precipitation unavailable: HTTP error: 503"),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_upstream_failure("Upstream temperature unavailable: timeout after 100 ms"),
            FailureType::Unexpected
        );
        assert_eq!(
            classify_upstream_failure("Insufficient data: no temperature observations"),
            FailureType::Expected
        );
        assert_eq!(classify_upstream_failure("something odd"), FailureType::Unknown);
    }

    #[test]
    fn test_entry_format_includes_zone_tag() {
        let entry = Logger::format_entry(LogLevel::Info, &DataSource::Reports, Some("11111"), "built");
        assert!(entry.ends_with("INFO REPORT [11111]: built"), "got {}", entry);
    }
}
