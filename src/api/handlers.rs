//! API request handlers

use std::sync::Arc;

use axum::extract::Query;
use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::api::types::*;
use crate::corpus::IngestSummary;
use crate::rag::RagService;
use crate::similarity::parse_vector;
use crate::PatientRagError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RagService>,
    pub collection: String,
}

impl AppState {
    pub fn new(service: Arc<RagService>, collection: impl Into<String>) -> Self {
        Self {
            service,
            collection: collection.into(),
        }
    }
}

/// Welcome handler
pub async fn root() -> Json<ApiResponse<WelcomeResponse>> {
    Json(ApiResponse::success(WelcomeResponse {
        message: "Welcome to the patient record retrieval API".to_string(),
    }))
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Ingest the configured feed
pub async fn load_data(
    State(state): State<AppState>,
    Query(params): Query<LoadDataParams>,
) -> ApiResult<IngestSummary> {
    info!("GET /api/load_data?reset={}", params.reset);

    let corpus = state.service.corpus();
    let summary = if params.reset {
        corpus.reload().await?
    } else {
        corpus.load().await?
    };
    Ok(Json(ApiResponse::success(summary)))
}

/// Rank stored records against a literal embedding
pub async fn query_vector(
    State(state): State<AppState>,
    Query(params): Query<VectorQueryParams>,
) -> ApiResult<VectorQueryResponse> {
    info!("GET /api/query?n_results={}", params.n_results);

    let embedding = parse_vector(&params.query_vector)?;
    let k = usize::try_from(params.n_results).unwrap_or(0);

    let corpus = state.service.corpus();
    corpus.load().await?;
    let results = corpus.store().query(&embedding, k).await?;

    Ok(Json(ApiResponse::success(VectorQueryResponse {
        query_results: results.into(),
    })))
}

/// Full retrieval-augmented answer for a symptom
pub async fn rag_query(
    State(state): State<AppState>,
    Json(req): Json<RagQueryRequest>,
) -> ApiResult<RagQueryResponse> {
    info!("POST /api/rag/query: {}", req.symptom);

    let symptom = req.symptom.trim();
    if symptom.is_empty() {
        return Err(PatientRagError::Validation("symptom must not be empty".to_string()).into());
    }

    let response = match req.k {
        Some(k) => {
            state
                .service
                .ask_with_k(symptom, usize::try_from(k).unwrap_or(0))
                .await?
        }
        None => state.service.ask(symptom).await?,
    };

    let sources = response
        .sources
        .iter()
        .map(|result| SourceRecord {
            id: result.record.id.clone(),
            score: result.score,
            user: result.record.user().to_string(),
            explanation: result.record.explanation().to_string(),
        })
        .collect();

    Ok(Json(ApiResponse::success(RagQueryResponse {
        query: response.query,
        answer: response.answer,
        sources,
    })))
}

/// Store statistics
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    info!("GET /api/stats");

    let corpus = state.service.corpus();
    let store = corpus.store();
    Ok(Json(ApiResponse::success(StatsResponse {
        backend: store.backend().to_string(),
        collection: state.collection.clone(),
        count: store.count().await?,
        dimension: store.dimension().await?,
        loaded: corpus.is_loaded().await,
    })))
}
