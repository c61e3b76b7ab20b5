use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatientRagError {
    /// Transport failure while fetching source records
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Payload did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source produced zero usable records
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Dimension mismatch, duplicate id or otherwise invalid record
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PatientRagError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<config::ConfigError> for PatientRagError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PatientRagError>;
