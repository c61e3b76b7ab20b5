use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::store::StoreBackend;

/// Environment prefix for layered overrides, e.g. `PATIENTRAG__RETRIEVAL__TOP_K=5`
pub const ENV_PREFIX: &str = "PATIENTRAG";

/// Fallback variable for the generation API key
pub const LEGACY_API_KEY_VAR: &str = "gemini_api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite file used by the persisted backend
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Fixed corpus dimensionality; inferred from the first record when unset
    #[serde(default)]
    pub dimension: Option<usize>,
}

fn default_store_path() -> String {
    "patientrag.db".to_string()
}

fn default_collection() -> String {
    "vector_database".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// URL or filesystem path of the JSON record feed
    pub source: String,
    #[serde(default = "default_embedding_field")]
    pub embedding_field: String,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_field() -> String {
    "explanation_embedding".to_string()
}

fn default_fetch_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub dimension: usize,
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub endpoint: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_generation_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub loader: LoaderConfig,
    pub retrieval: RetrievalConfig,
    pub embeddings: EmbeddingsConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_legacy_api_key();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `config.toml` layered over defaults and environment
    pub fn load() -> crate::Result<Self> {
        Self::load_from("config.toml")
    }

    /// Layer defaults, an optional TOML file and `PATIENTRAG__*` environment variables
    pub fn load_from<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
        }

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.apply_legacy_api_key();
        config.validate()?;
        Ok(config)
    }

    /// Fill an empty generation key from the `gemini_api` variable
    fn apply_legacy_api_key(&mut self) {
        if self.generation.api_key.is_empty() {
            if let Ok(key) = std::env::var(LEGACY_API_KEY_VAR) {
                self.generation.api_key = key;
            }
        }
    }

    /// Reject settings that would make retrieval or generation meaningless
    pub fn validate(&self) -> crate::Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(crate::PatientRagError::ConfigError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.embeddings.dimension == 0 {
            return Err(crate::PatientRagError::ConfigError(
                "embeddings.dimension must be positive".to_string(),
            ));
        }
        if self.store.dimension == Some(0) {
            return Err(crate::PatientRagError::ConfigError(
                "store.dimension must be positive when set".to_string(),
            ));
        }
        if self.generation.endpoint.trim().is_empty() {
            return Err(crate::PatientRagError::ConfigError(
                "generation.endpoint must not be empty".to_string(),
            ));
        }
        if self.embeddings.endpoint.trim().is_empty() {
            return Err(crate::PatientRagError::ConfigError(
                "embeddings.endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get default retrieval size
    pub fn top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Get record feed location
    pub fn loader_source(&self) -> &str {
        &self.loader.source
    }

    /// Get selected store backend
    pub fn store_backend(&self) -> StoreBackend {
        self.store.backend
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                path: default_store_path(),
                collection: default_collection(),
                dimension: None,
            },
            loader: LoaderConfig {
                source: "https://raw.githubusercontent.com/buithehai1994/EHR/refs/heads/main/data/chunk_2.json"
                    .to_string(),
                embedding_field: default_embedding_field(),
                timeout_secs: default_fetch_timeout(),
            },
            retrieval: RetrievalConfig {
                top_k: default_top_k(),
            },
            embeddings: EmbeddingsConfig {
                provider: default_embedding_provider(),
                endpoint: "http://localhost:11434".to_string(),
                model: "all-minilm".to_string(),
                api_key: None,
                dimension: 384,
            },
            generation: GenerationConfig {
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                model: default_generation_model(),
                api_key: String::new(),
                connect_timeout_secs: default_connect_timeout(),
                request_timeout_secs: default_request_timeout(),
                max_retries: default_max_retries(),
                retry_backoff_ms: default_retry_backoff(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                enable_cors: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_k(), 3);
        assert_eq!(config.store_backend(), StoreBackend::Memory);
        assert_eq!(config.loader.embedding_field, "explanation_embedding");
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(matches!(
            config.validate(),
            Err(crate::PatientRagError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_file_applies_serde_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[logging]
level = "debug"
backtrace = false

[store]
backend = "persisted"
path = "/tmp/records.db"

[loader]
source = "data/records.json"

[retrieval]
top_k = 5

[embeddings]
endpoint = "http://localhost:11434"
model = "all-minilm"
dimension = 384

[generation]
endpoint = "http://localhost:9999/v1beta"
api_key = "test-key"

[server]
host = "0.0.0.0"
port = 9000
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Persisted);
        assert_eq!(config.store.collection, "vector_database");
        assert_eq!(config.loader.timeout_secs, 10);
        assert_eq!(config.top_k(), 5);
        assert_eq!(config.generation.max_retries, 2);
        assert_eq!(config.generation.model, "gemini-1.5-flash-latest");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store.collection, "vector_database");
        assert_eq!(config.embedding_dimension(), 384);
    }
}
