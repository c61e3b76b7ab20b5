//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::RagService;
use crate::Result;

/// In-flight request cap; each RAG query holds an outbound generation call
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Assemble the application router with its middleware
pub fn build_app(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("Starting patient record API server...");

    let service = Arc::new(RagService::new(config).await?);
    let state = AppState::new(service, config.store.collection.clone());
    let app = build_app(state, enable_cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/             - Welcome message");
    info!("  GET  /api/health       - Health check");
    info!("  GET  /api/load_data    - Ingest the record feed (?reset=true to reload)");
    info!("  GET  /api/query        - Rank records against ?query_vector=&n_results=");
    info!("  POST /api/rag/query    - Symptom to treatment insights");
    info!("  GET  /api/stats        - Store statistics");

    axum::serve(listener, app).await?;

    Ok(())
}
