//! Configuration loading for LitLens.
//! Reads litlens.toml from the current directory or the path in the
//! LITLENS_CONFIG env var, then applies environment overrides.

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub triage: TriageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String { "sqlite://litlens.db".to_string() }
fn default_max_connections() -> u32 { 10 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url(), max_connections: default_max_connections() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Only used by `openai_compatible`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret", skip_serializing)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Article text beyond this many characters is cut before prompting.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_provider()        -> LlmProvider { LlmProvider::OpenAi }
fn default_llm_model()       -> String { "gpt-4o-mini".to_string() }
fn default_temperature()     -> f32 { 0.2 }
fn default_max_tokens()      -> u32 { 2048 }
fn default_llm_timeout()     -> u64 { 60 }
fn default_max_input_chars() -> usize { 12_000 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(SecretString::from))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default, deserialize_with = "deserialize_secret", skip_serializing)]
    pub ncbi_api_key: Option<SecretString>,
    /// Required by Unpaywall and recommended by NCBI.
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
    #[serde(default = "default_pdf_max_bytes")]
    pub pdf_max_bytes: usize,
}

fn default_max_search_results() -> usize { 20 }
fn default_pdf_max_bytes()      -> usize { 25 * 1024 * 1024 }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ncbi_api_key: None,
            contact_email: None,
            max_search_results: default_max_search_results(),
            pdf_max_bytes: default_pdf_max_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_text_weight")]
    pub text_weight: f64,
    #[serde(default = "default_mesh_weight")]
    pub mesh_weight: f64,
    #[serde(default = "default_author_weight")]
    pub author_weight: f64,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
}

fn default_cache_ttl()      -> u64 { 3600 }
fn default_cache_capacity() -> u64 { 1_000 }
fn default_text_weight()    -> f64 { 0.60 }
fn default_mesh_weight()    -> f64 { 0.25 }
fn default_author_weight()  -> f64 { 0.15 }
fn default_min_similarity() -> f64 { 0.05 }

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            text_weight: default_text_weight(),
            mesh_weight: default_mesh_weight(),
            author_weight: default_author_weight(),
            min_similarity: default_min_similarity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Relevance score (0-100) at or above which a project alert is raised.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
}

fn default_alert_threshold() -> f64 { 80.0 }

impl Default for TriageConfig {
    fn default() -> Self {
        Self { alert_threshold: default_alert_threshold() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String { "info,litlens=debug,tower_http=info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}

mod tests;

impl Config {
    /// Load configuration from litlens.toml.
    /// Checks LITLENS_CONFIG env var first, then current directory. A missing
    /// file yields defaults; environment overrides are applied either way.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var("LITLENS_CONFIG")
            .unwrap_or_else(|_| "litlens.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
            Self::from_toml_str(&content)?
        } else {
            tracing::info!(path = %path, "Config file not found, using defaults");
            Config::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("LITLENS_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(host) = get("LITLENS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("LITLENS_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring unparsable LITLENS_PORT"),
            }
        }
        if let Some(key) = get("LITLENS_OPENAI_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(key) = get("LITLENS_NCBI_API_KEY") {
            self.sources.ncbi_api_key = Some(SecretString::from(key));
        }
        if let Some(email) = get("LITLENS_CONTACT_EMAIL") {
            self.sources.contact_email = Some(email);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.provider == LlmProvider::OpenAiCompatible && self.llm.base_url.is_none() {
            return Err(ConfigError::Invalid("llm.base_url is required for openai_compatible".into()));
        }
        let a = &self.analytics;
        let weight_sum = a.text_weight + a.mesh_weight + a.author_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "analytics weights must sum to 1.0, got {:.4}",
                weight_sum
            )));
        }
        if !(0.0..=100.0).contains(&self.triage.alert_threshold) {
            return Err(ConfigError::Invalid(format!(
                "triage.alert_threshold must be within [0, 100], got {}",
                self.triage.alert_threshold
            )));
        }
        Ok(())
    }
}
