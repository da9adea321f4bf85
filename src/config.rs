/// Service configuration.
///
/// Loaded from a TOML file (default `./weather.toml`). The database URL is
/// never part of this file; binaries read `DATABASE_URL` from the environment
/// after `dotenv::dotenv()`.
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:5000"
///
/// [report]
/// request_timeout_secs = 10
///
/// [upstreams.temperature]
/// protocol = "http"
/// host = "localhost"
/// port = 5001
///
/// [upstreams.precipitation]
/// protocol = "http"
/// host = "localhost"
/// port = 5002
///
/// [loader]
/// zones = ["11111", "22222"]
/// history_days = 2
///
/// [logging]
/// level = "info"
/// ```

use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::logging::LogLevel;
use crate::model::Upstream;

pub const DEFAULT_CONFIG_PATH: &str = "./weather.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io(String),
    /// The file is not valid TOML or does not match the expected structure.
    Parse(String),
    /// A value is structurally valid but unusable.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Cannot read configuration: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Cannot parse configuration: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub upstreams: UpstreamsConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Deadline for fetching both observation sets.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ReportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamsConfig {
    pub temperature: Endpoint,
    pub precipitation: Endpoint,
}

impl UpstreamsConfig {
    pub fn endpoint(&self, upstream: Upstream) -> &Endpoint {
        match upstream {
            Upstream::Temperature => &self.temperature,
            Upstream::Precipitation => &self.precipitation,
        }
    }
}

/// Location of one observation store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// `{base}/observation/{zone}?days={days}`, with `zone` percent-encoded
    /// as a single path segment.
    pub fn observation_url(&self, zone: &str, days: i64) -> Result<reqwest::Url, ConfigError> {
        let mut url = self.parsed_base()?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid(format!("{} cannot carry a path", self.base_url())))?
            .push("observation")
            .push(zone);
        url.query_pairs_mut().append_pair("days", &days.to_string());
        Ok(url)
    }

    /// `{base}/observation`, the submission endpoint.
    pub fn submit_url(&self) -> Result<reqwest::Url, ConfigError> {
        let mut url = self.parsed_base()?;
        url.path_segments_mut()
            .map_err(|_| ConfigError::Invalid(format!("{} cannot carry a path", self.base_url())))?
            .push("observation");
        Ok(url)
    }

    fn parsed_base(&self) -> Result<reqwest::Url, ConfigError> {
        reqwest::Url::parse(&self.base_url())
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", self.base_url(), e)))
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::Invalid(format!(
                "upstreams.{}.protocol must be http or https, got {:?}",
                name, self.protocol
            )));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("upstreams.{}.host is empty", name)));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid(format!("upstreams.{}.port must be non-zero", name)));
        }
        self.parsed_base().map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_zones")]
    pub zones: Vec<String>,
    /// Days before today to generate, in addition to today.
    #[serde(default = "default_history_days")]
    pub history_days: i64,
    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            zones: default_zones(),
            history_days: default_history_days(),
            seed: None,
        }
    }
}

fn default_zones() -> Vec<String> {
    vec!["11111".to_string(), "22222".to_string()]
}

fn default_history_days() -> i64 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, ConfigError> {
        self.level.parse().map_err(ConfigError::Invalid)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            timestamps: default_timestamps(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timestamps() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.upstreams.temperature.validate("temperature")?;
        self.upstreams.precipitation.validate("precipitation")?;

        if self.report.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "report.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.loader.zones.iter().all(|z| z.trim().is_empty()) {
            return Err(ConfigError::Invalid("loader.zones is empty".to_string()));
        }
        if self.loader.history_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "loader.history_days must not be negative, got {}",
                self.loader.history_days
            )));
        }
        self.logging.min_level()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.bind {:?}: {}", self.server.bind, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        bind = "127.0.0.1:5000"

        [report]
        request_timeout_secs = 3

        [upstreams.temperature]
        protocol = "http"
        host = "temperature"
        port = 5001

        [upstreams.precipitation]
        protocol = "https"
        host = "precipitation.internal"
        port = 5002

        [loader]
        zones = ["11111"]
        history_days = 5
        seed = 7
    "#;

    #[test]
    fn test_sample_config_loads() {
        let config = Config::from_toml_str(SAMPLE).expect("sample config should load");
        assert_eq!(config.bind_addr().unwrap().port(), 5000);
        assert_eq!(config.report.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.upstreams.temperature.base_url(), "http://temperature:5001");
        assert_eq!(
            config.upstreams.endpoint(Upstream::Precipitation).base_url(),
            "https://precipitation.internal:5002"
        );
        assert_eq!(config.loader.zones, vec!["11111".to_string()]);
        assert_eq!(config.loader.seed, Some(7));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults_apply_when_sections_missing() {
        let config = Config::from_toml_str(
            r#"
            [upstreams.temperature]
            protocol = "http"
            host = "localhost"
            port = 5001
            [upstreams.precipitation]
            protocol = "http"
            host = "localhost"
            port = 5002
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.report.request_timeout_secs, 10);
        assert_eq!(config.loader.history_days, 2);
        assert_eq!(config.loader.zones.len(), 2);
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let text = SAMPLE.replace("protocol = \"https\"", "protocol = \"ftp\"");
        let result = Config::from_toml_str(&text);
        assert!(matches!(result, Err(ConfigError::Invalid(_))), "got {:?}", result);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let text = SAMPLE.replace("request_timeout_secs = 3", "request_timeout_secs = 0");
        assert!(matches!(Config::from_toml_str(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_upstream_is_a_parse_error() {
        let result = Config::from_toml_str("[server]\nbind = \"127.0.0.1:1\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_observation_url_encodes_zone() {
        let endpoint = Endpoint {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 5001,
        };
        assert_eq!(
            endpoint.observation_url("11111", 7).unwrap().as_str(),
            "http://localhost:5001/observation/11111?days=7"
        );
        assert_eq!(
            endpoint.observation_url("a b/c", 1).unwrap().as_str(),
            "http://localhost:5001/observation/a%20b%2Fc?days=1"
        );
        assert_eq!(
            endpoint.submit_url().unwrap().as_str(),
            "http://localhost:5001/observation"
        );
    }
}
