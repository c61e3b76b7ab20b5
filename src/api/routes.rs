//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        // Health check
        .route("/health", get(handlers::health))
        // Ingestion
        .route("/load_data", get(handlers::load_data))
        // Similarity query over a literal embedding
        .route("/query", get(handlers::query_vector))
        // RAG endpoints
        .route("/rag/query", post(handlers::rag_query))
        // Statistics
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}
