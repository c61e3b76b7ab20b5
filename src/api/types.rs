//! API request and response types

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing::warn;

use crate::models::Metadata;
use crate::models::RankedResultSet;
use crate::PatientRagError;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error rendered as an [`ApiResponse`] with a matching status
#[derive(Debug)]
pub struct ApiError(pub PatientRagError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PatientRagError::Validation(_)
            | PatientRagError::Parse(_)
            | PatientRagError::EmptyData(_) => StatusCode::BAD_REQUEST,
            PatientRagError::EmptyCorpus(_) => StatusCode::NOT_FOUND,
            PatientRagError::Fetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PatientRagError> for ApiError {
    fn from(err: PatientRagError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Welcome response
#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `load_data` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct LoadDataParams {
    /// Clear the store and refetch the feed
    #[serde(default)]
    pub reset: bool,
}

/// Vector query parameters
#[derive(Debug, Deserialize)]
pub struct VectorQueryParams {
    /// Comma-separated embedding components
    pub query_vector: String,
    #[serde(default = "default_n_results")]
    pub n_results: i64,
}

fn default_n_results() -> i64 {
    3
}

/// Column-oriented ranked results
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QueryResults {
    pub ids: Vec<String>,
    pub scores: Vec<f64>,
    /// `1 - score`
    pub distances: Vec<f64>,
    pub metadatas: Vec<Metadata>,
}

impl From<RankedResultSet> for QueryResults {
    fn from(results: RankedResultSet) -> Self {
        let mut columns = Self::default();
        for result in results {
            columns.distances.push(result.distance());
            columns.scores.push(result.score);
            columns.ids.push(result.record.id);
            columns.metadatas.push(result.record.metadata);
        }
        columns
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VectorQueryResponse {
    pub query_results: QueryResults,
}

/// RAG query request
#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    pub symptom: String,
    /// Overrides the configured top-k when present
    #[serde(default)]
    pub k: Option<i64>,
}

/// One retrieved record in a RAG answer
#[derive(Debug, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub score: f64,
    pub user: String,
    pub explanation: String,
}

/// RAG query response
#[derive(Debug, Serialize, Deserialize)]
pub struct RagQueryResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<SourceRecord>,
}

/// Statistics response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub backend: String,
    pub collection: String,
    pub count: usize,
    pub dimension: Option<usize>,
    pub loaded: bool,
}
