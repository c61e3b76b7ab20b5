//! Record loader: fetch the JSON feed and normalize rows into [`Record`]s
//!
//! The feed is either a bare JSON array of row objects or an envelope
//! `{"data": [...]}`. Every row needs `user`, `explanation` and a numeric
//! embedding array. Loading is all-or-nothing: one malformed row rejects
//! the whole batch, and nothing is returned for an empty feed.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use url::Url;

use crate::config::LoaderConfig;
use crate::models::Record;
use crate::models::EXPLANATION_KEY;
use crate::models::USER_KEY;
use crate::PatientRagError;
use crate::Result;

/// Embedding fields tried after the configured one
const FALLBACK_EMBEDDING_FIELDS: [&str; 3] =
    ["explanation_embedding", "symptom_embedding", "embedding"];

/// Where the record feed lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    Url(Url),
    Path(PathBuf),
}

impl RecordSource {
    /// `http(s)://` and `file://` URLs are recognised; anything else is a path
    pub fn parse(source: &str) -> Self {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_or_else(|()| Self::Path(PathBuf::from(source)), Self::Path),
            _ => Self::Path(PathBuf::from(source)),
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches and parses batches of source records
#[derive(Debug, Clone)]
pub struct RecordLoader {
    client: Client,
    embedding_field: String,
}

impl RecordLoader {
    pub fn new(embedding_field: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PatientRagError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            embedding_field: embedding_field.into(),
        })
    }

    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        Self::new(
            config.embedding_field.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Fetch and parse a whole batch
    pub async fn load(&self, source: &RecordSource) -> Result<Vec<Record>> {
        info!("Loading records from {}", source);
        let body = self.fetch(source).await?;
        let records = self.parse_records(&body)?;
        info!("Parsed {} records from {}", records.len(), source);
        Ok(records)
    }

    async fn fetch(&self, source: &RecordSource) -> Result<String> {
        match source {
            RecordSource::Url(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| PatientRagError::Fetch(format!("request to {url} failed: {e}")))?;

                let response = response
                    .error_for_status()
                    .map_err(|e| PatientRagError::Fetch(e.to_string()))?;

                response
                    .text()
                    .await
                    .map_err(|e| PatientRagError::Fetch(format!("reading body failed: {e}")))
            }
            RecordSource::Path(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                PatientRagError::Fetch(format!("reading {} failed: {e}", path.display()))
            }),
        }
    }

    /// Parse a feed body into records without touching any store
    pub fn parse_records(&self, body: &str) -> Result<Vec<Record>> {
        let payload: Value = serde_json::from_str(body)
            .map_err(|e| PatientRagError::Parse(format!("invalid JSON: {e}")))?;

        let rows = match payload {
            Value::Array(rows) => rows,
            Value::Object(mut envelope) => match envelope.remove("data") {
                Some(Value::Array(rows)) => rows,
                _ => {
                    return Err(PatientRagError::Parse(
                        "expected an object with a \"data\" array".to_string(),
                    ))
                }
            },
            _ => {
                return Err(PatientRagError::Parse(
                    "expected a JSON array of records".to_string(),
                ))
            }
        };

        if rows.is_empty() {
            return Err(PatientRagError::EmptyData(
                "the JSON data is empty".to_string(),
            ));
        }

        rows.iter()
            .enumerate()
            .map(|(index, row)| self.parse_row(index, row))
            .collect()
    }

    fn parse_row(&self, index: usize, row: &Value) -> Result<Record> {
        let fields = row
            .as_object()
            .ok_or_else(|| row_error(index, "row is not an object"))?;

        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(_) => return Err(row_error(index, "id must be a string or integer")),
            None => index.to_string(),
        };

        let user = text_field(fields, USER_KEY).ok_or_else(|| {
            row_error(index, &format!("missing or non-string \"{USER_KEY}\""))
        })?;
        let explanation = text_field(fields, EXPLANATION_KEY).ok_or_else(|| {
            row_error(index, &format!("missing or non-string \"{EXPLANATION_KEY}\""))
        })?;
        let embedding = self.embedding_field(index, fields)?;

        debug!("Parsed row {} as record {}", index, id);
        Ok(Record::new(id, embedding)
            .with_metadata(USER_KEY, user)
            .with_metadata(EXPLANATION_KEY, explanation))
    }

    fn embedding_field(&self, index: usize, fields: &Map<String, Value>) -> Result<Vec<f64>> {
        let value = std::iter::once(self.embedding_field.as_str())
            .chain(FALLBACK_EMBEDDING_FIELDS)
            .find_map(|name| fields.get(name))
            .ok_or_else(|| {
                row_error(
                    index,
                    &format!("missing embedding field \"{}\"", self.embedding_field),
                )
            })?;

        let embedding = match value {
            Value::Array(values) => numeric_array(values),
            // Some exports serialise the vector as a JSON string
            Value::String(raw) => match serde_json::from_str::<Vec<Value>>(raw) {
                Ok(values) => numeric_array(&values),
                Err(_) => None,
            },
            _ => None,
        };

        match embedding {
            Some(embedding) if !embedding.is_empty() => Ok(embedding),
            Some(_) => Err(row_error(index, "embedding is empty")),
            None => Err(row_error(index, "embedding must be an array of numbers")),
        }
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

fn numeric_array(values: &[Value]) -> Option<Vec<f64>> {
    values.iter().map(Value::as_f64).collect()
}

fn row_error(index: usize, message: &str) -> PatientRagError {
    PatientRagError::Parse(format!("row {index}: {message}"))
}
