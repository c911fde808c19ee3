use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "WXAGENT_CONFIG";

/// Config file looked up in the working directory when `WXAGENT_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "wxagent.toml";

pub const ENV_PORT: &str = "PORT";
pub const ENV_PROJECT_ID: &str = "GCP_PROJECT_ID";
pub const ENV_STATION_ID: &str = "WEATHER_STATION_ID";
pub const ENV_ACCESS_TOKEN: &str = "GCP_ACCESS_TOKEN";
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single line summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// GSOD data source (BigQuery)
    #[serde(default)]
    pub source: SourceConfig,

    /// Narrative language model
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Statistics tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            ConfigError::Invalid(format!("server.host is not an IP address: {}", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// GCP project the query jobs are billed to
    pub project_id: String,

    /// GSOD station number (`stn` column)
    pub station_id: String,

    /// Fully qualified GSOD table
    pub dataset: String,

    /// BigQuery REST base URL
    pub api_base: String,

    /// Metadata server token endpoint, used when no static token is configured
    pub metadata_token_url: String,

    /// Static OAuth access token (local development). Never written back to disk.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// Outbound HTTP timeout
    pub timeout_secs: u64,

    /// How long BigQuery may run the query before answering `jobComplete: false`
    pub query_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            project_id: "ai-weather-analytics".to_string(),
            station_id: "999999".to_string(),
            dataset: "bigquery-public-data.noaa_gsod.gsod2023".to_string(),
            api_base: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            metadata_token_url: "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token".to_string(),
            access_token: None,
            timeout_secs: 30,
            query_timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Hugging Face Inference API base URL
    pub api_base: String,

    pub model: String,

    /// Hugging Face token. Required; never written back to disk.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,

    pub max_new_tokens: u32,

    pub temperature: f64,

    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api-inference.huggingface.co".to_string(),
            model: "meta-llama/Llama-3.2-3B-Instruct".to_string(),
            api_token: None,
            max_new_tokens: 500,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Degrees Celsius the current reading may deviate from the window mean
    /// before it is flagged. A magnitude, not a p-value.
    pub anomaly_threshold: f64,

    /// Degrees Celsius of day-over-day change flagged as a spike.
    pub spike_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 5.0,
            spike_threshold: 5.0,
        }
    }
}

impl Config {
    /// Load configuration from `WXAGENT_CONFIG` (or `wxagent.toml`), then
    /// apply environment overrides. A `.env` file is read first if present.
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case in deployment.
        let _ = dotenv::dotenv();

        let (path, explicit) = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.trim().is_empty() => (PathBuf::from(p), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if explicit && !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration and validate it.
    ///
    /// Warnings are logged; errors abort.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Parse a TOML file, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup` so tests need not touch
    /// the process environment. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a port number, got {:?}", ENV_PORT, port))
            })?;
        }
        if let Some(project) = get(ENV_PROJECT_ID) {
            self.source.project_id = project;
        }
        if let Some(station) = get(ENV_STATION_ID) {
            self.source.station_id = station;
        }
        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.source.access_token = Some(token);
        }
        if let Some(token) = get(ENV_HF_TOKEN) {
            self.narrative.api_token = Some(token);
        }
        if let Some(model) = get(ENV_LLM_MODEL) {
            self.narrative.model = model;
        }

        Ok(())
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Err(e) = self.server.socket_addr() {
            result.add_error("server.host", e.to_string());
        }
        if self.server.port == 0 {
            result.add_warning("server.port", "Port 0 binds a random port");
        }

        // Data source
        if self.source.project_id.trim().is_empty() {
            result.add_error("source.project_id", "Project id must not be empty");
        }
        if self.source.station_id.trim().is_empty() {
            result.add_error("source.station_id", "Station id must not be empty");
        }
        if !is_valid_table_name(&self.source.dataset) {
            result.add_error(
                "source.dataset",
                format!(
                    "Expected project.dataset.table with letters, digits, '_' or '-', got: {}",
                    self.source.dataset
                ),
            );
        }
        validate_url(&self.source.api_base, "source.api_base", &mut result);
        if self.source.access_token.is_none() {
            validate_url(
                &self.source.metadata_token_url,
                "source.metadata_token_url",
                &mut result,
            );
        }
        if self.source.timeout_secs == 0 {
            result.add_error("source.timeout_secs", "Timeout must be greater than 0");
        }
        if self.source.query_timeout_ms == 0 {
            result.add_error("source.query_timeout_ms", "Query timeout must be greater than 0");
        } else if self.source.query_timeout_ms / 1000 >= self.source.timeout_secs {
            result.add_warning(
                "source.query_timeout_ms",
                "Query timeout is not shorter than the HTTP timeout",
            );
        }

        // Narrative
        validate_url(&self.narrative.api_base, "narrative.api_base", &mut result);
        if self.narrative.model.trim().is_empty() {
            result.add_error("narrative.model", "Model must not be empty");
        }
        match &self.narrative.api_token {
            None => result.add_error(
                "narrative.api_token",
                format!("{} must be set (https://huggingface.co/settings/tokens)", ENV_HF_TOKEN),
            ),
            Some(t) if t.starts_with("your_") => result.add_error(
                "narrative.api_token",
                format!("{} still holds the placeholder value", ENV_HF_TOKEN),
            ),
            Some(_) => {}
        }
        if self.narrative.max_new_tokens == 0 {
            result.add_error("narrative.max_new_tokens", "Must be greater than 0");
        }
        if !(0.0..=2.0).contains(&self.narrative.temperature) {
            result.add_error("narrative.temperature", "Temperature must be within 0.0..=2.0");
        }
        if self.narrative.timeout_secs == 0 {
            result.add_error("narrative.timeout_secs", "Timeout must be greater than 0");
        }

        // Analysis
        for (field, value) in [
            ("analysis.anomaly_threshold", self.analysis.anomaly_threshold),
            ("analysis.spike_threshold", self.analysis.spike_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                result.add_error(field, "Threshold must be a positive number");
            } else if value > 30.0 {
                result.add_warning(field, "Threshold above 30 degrees will rarely trigger");
            }
        }

        result
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

/// `project.dataset.table`, restricted to characters that are safe inside a
/// backtick-quoted GoogleSQL identifier.
fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|p| {
            !p.is_empty()
                && p.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn configured() -> Config {
        let mut config = Config::default();
        config.narrative.api_token = Some("hf_test".to_string());
        config
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_configured_defaults_are_valid() {
        let result = configured().validate();
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_missing_hf_token_is_error() {
        let result = Config::default().validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "narrative.api_token"));
    }

    #[test]
    fn test_placeholder_hf_token_is_error() {
        let mut config = configured();
        config.narrative.api_token = Some("your_actual_token_here".to_string());
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = configured();
        config.narrative.api_base = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_dataset_injection_rejected() {
        let mut config = configured();
        config.source.dataset = "a.b.c` WHERE 1=1 --".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "source.dataset"));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let mut config = configured();
        config.analysis.anomaly_threshold = 0.0;
        config.analysis.spike_threshold = f64::NAN;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "analysis.anomaly_threshold"));
        assert!(result.errors.iter().any(|e| e.field == "analysis.spike_threshold"));
    }

    #[test]
    fn test_metadata_url_ignored_with_static_token() {
        let mut config = configured();
        config.source.metadata_token_url = "not a url".to_string();
        assert!(!config.validate().is_valid());

        config.source.access_token = Some("ya29.token".to_string());
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("PORT", "9090"),
                ("GCP_PROJECT_ID", "my-project"),
                ("WEATHER_STATION_ID", "725300"),
                ("HF_TOKEN", "hf_abc"),
                ("LLM_MODEL", "mistralai/Mistral-7B-Instruct-v0.3"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.source.project_id, "my-project");
        assert_eq!(config.source.station_id, "725300");
        assert_eq!(config.narrative.api_token.as_deref(), Some("hf_abc"));
        assert_eq!(config.narrative.model, "mistralai/Mistral-7B-Instruct-v0.3");
        assert!(config.source.access_token.is_none());
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("WEATHER_STATION_ID", "  "), ("HF_TOKEN", "")]))
            .unwrap();
        assert_eq!(config.source.station_id, "999999");
        assert!(config.narrative.api_token.is_none());
    }

    #[test]
    fn test_bad_port_env_is_error() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.analysis.anomaly_threshold, 5.0);
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wxagent.toml");
        std::fs::write(
            &path,
            r#"
            [source]
            station_id = "722950"

            [analysis]
            anomaly_threshold = 3.5
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.source.station_id, "722950");
        assert_eq!(config.source.project_id, "ai-weather-analytics");
        assert_eq!(config.analysis.anomaly_threshold, 3.5);
        assert_eq!(config.analysis.spike_threshold, 5.0);
        assert_eq!(config.narrative.max_new_tokens, 500);
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wxagent.toml");
        std::fs::write(&path, "[server\nport = 1").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = configured();
        config.source.access_token = Some("ya29.secret".to_string());
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("hf_test"));
        assert!(!toml.contains("ya29.secret"));
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:8080");

        let bad = ServerConfig {
            host: "localhost".to_string(),
            port: 8080,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
