//! Server configuration
//!
//! Layered with the `config` crate, lowest precedence first:
//! built-in defaults, `togovar.toml` (or the file named by `TOGOVAR_CONFIG`),
//! then `TOGOVAR__SECTION__KEY` environment variables. A `.env` file in the
//! working directory is read before the environment is consulted.

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use togovar_format::{FormatterConfig, XrefTemplates};

const CONFIG_PATH_VAR: &str = "TOGOVAR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "togovar.toml";
const ENV_PREFIX: &str = "TOGOVAR";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// External link templates of formatted records.
    #[serde(default)]
    pub xref: XrefTemplates,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
    /// Allowed CORS origins; empty disables CORS headers.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
            cors_origins: Vec::new(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub file_enabled: bool,
    #[serde(default = "default_file_directory")]
    pub file_directory: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// `daily`, `hourly`, `minutely` or `never`.
    #[serde(default = "default_file_rotation")]
    pub file_rotation: String,

    #[serde(default)]
    pub opentelemetry_enabled: bool,
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    #[serde(default = "default_otlp_timeout_seconds")]
    pub otlp_timeout_seconds: u64,
    #[serde(default = "default_trace_sample_ratio")]
    pub trace_sample_ratio: f64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Defaults to the crate version.
    #[serde(default)]
    pub service_version: Option<String>,
    #[serde(default = "default_deployment_environment")]
    pub deployment_environment: String,
}

fn default_level() -> String {
    "info".to_string()
}
fn default_file_directory() -> String {
    "logs".to_string()
}
fn default_file_prefix() -> String {
    "togovar-server".to_string()
}
fn default_file_rotation() -> String {
    "daily".to_string()
}
fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}
fn default_otlp_timeout_seconds() -> u64 {
    10
}
fn default_trace_sample_ratio() -> f64 {
    1.0
}
fn default_service_name() -> String {
    "togovar-server".to_string()
}
fn default_deployment_environment() -> String {
    "development".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            file_enabled: false,
            file_directory: default_file_directory(),
            file_prefix: default_file_prefix(),
            file_rotation: default_file_rotation(),
            opentelemetry_enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            otlp_timeout_seconds: default_otlp_timeout_seconds(),
            trace_sample_ratio: default_trace_sample_ratio(),
            service_name: default_service_name(),
            service_version: None,
            deployment_environment: default_deployment_environment(),
        }
    }
}

/// `[backend]` section: the Elasticsearch cluster holding the variant index.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_index() -> String {
    "variant".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            index: default_index(),
            timeout_secs: default_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[registry]` section: reference data files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Vocabulary JSON; the bundled vocabularies are used when unset.
    #[serde(default)]
    pub vocabularies: Option<PathBuf>,
    /// Dataset policy and alias table; every dataset is public when unset.
    #[serde(default)]
    pub datasets: Option<PathBuf>,
    /// HGNC id to synonyms.
    #[serde(default)]
    pub genes: Option<PathBuf>,
    /// MedGen concept id to preferred name.
    #[serde(default)]
    pub diseases: Option<PathBuf>,
    /// Gzipped VCF consulted for annotation records submitted without
    /// conditions.
    #[serde(default)]
    pub condition_vcf: Option<PathBuf>,
    /// Seconds between reloads; `0` disables reloading.
    #[serde(default)]
    pub refresh_interval_secs: u64,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must not be 0".to_string()));
        }
        if self.backend.url.trim().is_empty() {
            return Err(Error::Config("backend.url must not be empty".to_string()));
        }
        url::Url::parse(&self.backend.url)
            .map_err(|e| Error::Config(format!("backend.url is invalid: {e}")))?;
        if self.backend.index.trim().is_empty() {
            return Err(Error::Config("backend.index must not be empty".to_string()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(Error::Config(
                "backend.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.logging.trace_sample_ratio) {
            return Err(Error::Config(
                "logging.trace_sample_ratio must be between 0 and 1".to_string(),
            ));
        }
        self.xref
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address: {e}")))
    }

    pub fn formatter(&self) -> FormatterConfig {
        FormatterConfig {
            xref: self.xref.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_link_template_without_placeholder() {
        let mut config = Config::default();
        config.xref.dbsnp = "https://example.org/snp".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dbsnp"));
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 9000

                [backend]
                url = "http://es:9200"
                index = "togovar_2024"

                [registry]
                refresh_interval_secs = 300
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.backend.index, "togovar_2024");
        assert_eq!(config.registry.refresh_interval_secs, 300);
        assert!(config.xref.gnomad.contains("{id}"));
    }
}
