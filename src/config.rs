/// Service configuration loader - parses sync.toml
///
/// Keeps broker location, query radius, per-category staleness budgets and
/// source markers out of the code so they can be tuned without recompiling.
/// Every key has a default, so a missing file is not an error.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::SourceMarkers;
use crate::selection::staleness::{MAX_THRESHOLD_HOURS, StalenessConfig, StalenessPolicy};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "sync.toml";

/// JSON-LD context advertised to the broker in the `Link` header.
pub const DEFAULT_CONTEXT_URL: &str =
    "https://raw.githubusercontent.com/diwise/context-broker/main/assets/jsonldcontexts/default-context.jsonld";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub broker: BrokerConfig,
    pub staleness: StalenessConfig,
    pub sources: SourcesConfig,
    pub schedule: ScheduleConfig,
}

/// Context broker connection and query settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub url: String,
    pub context_url: String,
    /// Radius (metres) around a beach in which observations count as "at" it.
    pub max_distance_m: u32,
    pub beach_page_size: u32,
    pub observation_limit: u32,
    pub request_timeout_secs: u64,
    /// Parallel observation fetches.
    pub workers: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8082".to_string(),
            context_url: DEFAULT_CONTEXT_URL.to_string(),
            max_distance_m: 500,
            beach_page_size: 50,
            observation_limit: 1000,
            request_timeout_secs: 30,
            workers: 4,
        }
    }
}

/// Source classification and display settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub satellite_model_markers: Vec<String>,
    pub manual_sample_markers: Vec<String>,
    /// Label stored for sensor readings that arrive without a source.
    pub default_sensor_source: String,
    /// `seeAlso` prefix identifying the beach's municipal web page.
    pub web_page_prefix: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let markers = SourceMarkers::default();
        Self {
            satellite_model_markers: markers.satellite_model,
            manual_sample_markers: markers.manual_sample,
            default_sensor_source: "Göteborgs Stad".to_string(),
            web_page_prefix: "https://goteborg.se/".to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn markers(&self) -> SourceMarkers {
        SourceMarkers {
            satellite_model: self.satellite_model_markers.clone(),
            manual_sample: self.manual_sample_markers.clone(),
        }
    }
}

/// Daemon scheduling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

impl SyncConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, or from `sync.toml` if it exists,
    /// or falls back to defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?,
            None => {
                tracing::debug!("no {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
                SyncConfig::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Applies `CONTEXT_BROKER_URL` on top of file settings.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CONTEXT_BROKER_URL").filter(|u| !u.trim().is_empty()) {
            self.broker.url = url;
        }
    }

    pub fn staleness_policy(&self) -> StalenessPolicy {
        (&self.staleness).into()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.broker.url.starts_with("http://") && !self.broker.url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!("broker url must be http(s): {}", self.broker.url)));
        }
        if self.broker.max_distance_m == 0 {
            return Err(ConfigError::Invalid("broker.max_distance_m must be positive".to_string()));
        }
        if self.broker.beach_page_size == 0 || self.broker.observation_limit == 0 {
            return Err(ConfigError::Invalid("broker page sizes must be positive".to_string()));
        }
        if self.broker.workers == 0 {
            return Err(ConfigError::Invalid("broker.workers must be at least 1".to_string()));
        }
        let s = &self.staleness;
        for hours in [s.sensor_hours, s.satellite_model_hours, s.manual_sample_hours] {
            if hours <= 0 || hours > MAX_THRESHOLD_HOURS {
                return Err(ConfigError::Invalid(format!(
                    "staleness thresholds must be between 1 and {} hours, got {}",
                    MAX_THRESHOLD_HOURS, hours
                )));
            }
        }
        if self.schedule.interval_minutes == 0 {
            return Err(ConfigError::Invalid("schedule.interval_minutes must be positive".to_string()));
        }
        Ok(())
    }
}
