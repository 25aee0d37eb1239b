//! Configuration management
//!
//! Configuration is read in the following order of precedence:
//! 1. Environment variables
//! 2. `villa-gateway.toml` (or the file named by `VILLA_CONFIG_PATH`)
//! 3. Default values
//!
//! `${VAR_NAME}` references inside the TOML file are expanded from the
//! environment before parsing, so private calendar export URLs can be kept
//! out of the file itself.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::Error;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "villa-gateway.toml";

/// A named iCalendar feed (master calendar or one OTA export)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarSource {
    /// Display name, reported back in `blockedBy`
    pub name: String,
    /// Feed URL (`http`, `https` or `webcal`)
    pub url: String,
}

impl CalendarSource {
    /// Create a new calendar source
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port for HTTP API server
    pub port: u16,

    /// Allowed CORS origins (e.g., ["https://villa.example.com"])
    /// If unset, any origin is allowed
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            allowed_origins: None,
        }
    }
}

/// Availability check configuration
#[derive(Debug, Clone)]
pub struct AvailabilityConfig {
    /// IANA timezone of the villa; stay dates resolve to midnight here
    pub timezone: String,

    /// Per-feed fetch timeout in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Main configuration for villa-gateway
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP API configuration
    pub api: ApiConfig,

    /// Availability check configuration
    pub availability: AvailabilityConfig,

    /// Calendar feeds consulted on every check
    pub calendars: Vec<CalendarSource>,
}

fn default_api_port() -> u16 {
    3000
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Expand `${VAR_NAME}` references with environment variable values.
    ///
    /// Unset variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file
    ///
    /// `${VAR_NAME}` references are expanded before parsing and environment
    /// overrides are applied afterwards.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let expanded_content = Self::expand_env_vars(&toml_content);
        let config: TomlConfig = toml::from_str(&expanded_content)?;

        let mut cfg = Self::from_toml_config(config);
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Load configuration from the default locations
    ///
    /// Looks for the file named by `VILLA_CONFIG_PATH`, then
    /// `./villa-gateway.toml`, then falls back to environment variables only.
    pub fn load() -> crate::Result<Self> {
        if let Ok(path) = std::env::var("VILLA_CONFIG_PATH") {
            tracing::info!("Loading configuration from: {}", path);
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        tracing::info!("No config file found, reading environment only");
        Self::from_env()
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let api = toml.api.unwrap_or_default();
        let api_config = ApiConfig {
            port: api.port.unwrap_or_else(default_api_port),
            allowed_origins: api.allowed_origins,
        };

        let availability = toml.availability.unwrap_or_default();
        let availability_config = AvailabilityConfig {
            timezone: availability.timezone.unwrap_or_else(default_timezone),
            fetch_timeout_secs: availability
                .fetch_timeout_secs
                .unwrap_or_else(default_fetch_timeout_secs),
        };

        let calendars = toml
            .calendars
            .unwrap_or_default()
            .into_iter()
            .map(|c| CalendarSource::new(c.name.trim(), c.url.trim()))
            .collect();

        Config {
            api: api_config,
            availability: availability_config,
            calendars,
        }
    }

    /// Override settings with environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Ok(origins) = std::env::var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(parse_list(&origins));
        }

        if let Ok(tz) = std::env::var("VILLA_TIMEZONE") {
            if !tz.is_empty() {
                self.availability.timezone = tz;
            }
        }
        if let Ok(secs) = std::env::var("FETCH_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                self.availability.fetch_timeout_secs = s;
            }
        }

        if let Ok(sources) = std::env::var("CALENDAR_SOURCES") {
            if !sources.trim().is_empty() {
                self.calendars = parse_calendar_sources(&sources);
            }
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Check the configuration for values that would only fail later
    pub fn validate(&self) -> crate::Result<()> {
        self.timezone()?;

        if self.availability.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be greater than 0".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.calendars {
            if source.name.is_empty() {
                return Err(Error::Config(format!(
                    "Calendar source with url {} has an empty name",
                    source.url
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate calendar source name: {}",
                    source.name
                )));
            }

            let scheme = source.url.split_once("://").map(|(s, _)| s.to_ascii_lowercase());
            match scheme.as_deref() {
                Some("http" | "https" | "webcal") => {}
                _ => {
                    return Err(Error::Config(format!(
                        "Calendar source {} has unsupported url: {}",
                        source.name, source.url
                    )));
                }
            }
        }

        Ok(())
    }

    /// Villa timezone
    pub fn timezone(&self) -> crate::Result<chrono_tz::Tz> {
        self.availability
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| Error::Config(format!("Invalid timezone {}: {}", self.availability.timezone, e)))
    }

    /// Per-feed fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.availability.fetch_timeout_secs)
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `Name=url;Name=url` into calendar sources.
///
/// Only the first `=` separates name from url, so query strings survive.
/// Entries without a `=` are ignored.
pub fn parse_calendar_sources(value: &str) -> Vec<CalendarSource> {
    value
        .split(';')
        .filter_map(|entry| {
            let (name, url) = entry.split_once('=')?;
            let (name, url) = (name.trim(), url.trim());
            if url.is_empty() {
                return None;
            }
            Some(CalendarSource::new(name, url))
        })
        .collect()
}

// ============================================================================
// TOML file structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    api: Option<TomlApiConfig>,
    availability: Option<TomlAvailabilityConfig>,
    calendars: Option<Vec<TomlCalendarSource>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApiConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAvailabilityConfig {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    fetch_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TomlCalendarSource {
    name: String,
    url: String,
}
