//! CLI command handlers
//!
//! This module contains all the command handlers for the `patientrag` CLI

use crate::api::serve_api;
use crate::cli::output::*;
use crate::rag::RagService;
use crate::similarity::parse_vector;
use crate::AppConfig;
use crate::Result;

/// Handle load command
pub async fn handle_load_command(service: &RagService, reset: bool) -> Result<()> {
    let corpus = service.corpus();
    print_info(&format!("Loading records from {}", corpus.source()));

    let summary = if reset {
        corpus.reload().await?
    } else {
        corpus.load().await?
    };
    print_ingest_summary(&summary);
    Ok(())
}

/// Handle query command
pub async fn handle_query_command(service: &RagService, vector: &str, n_results: i64) -> Result<()> {
    let embedding = parse_vector(vector)?;
    let k = usize::try_from(n_results).unwrap_or(0);

    let corpus = service.corpus();
    corpus.load().await?;
    let results = corpus.store().query(&embedding, k).await?;
    print_query_results(&results);
    Ok(())
}

/// Handle ask command
pub async fn handle_ask_command(
    service: &RagService,
    symptom: &str,
    k: Option<usize>,
    show_prompt: bool,
) -> Result<()> {
    let response = match k {
        Some(k) => service.ask_with_k(symptom, k).await?,
        None => service.ask(symptom).await?,
    };
    print_rag_response(&response, show_prompt);
    Ok(())
}

/// Handle stats command
pub async fn handle_stats_command(service: &RagService, config: &AppConfig) -> Result<()> {
    let corpus = service.corpus();
    let store = corpus.store();
    print_stats(
        &store.backend().to_string(),
        &config.store.collection,
        store.count().await?,
        store.dimension().await?,
        corpus.is_loaded().await,
    );
    Ok(())
}

/// Handle serve command
pub async fn handle_serve_command(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
    cors: bool,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    serve_api(config, host, port, cors || config.server.enable_cors).await
}

/// Handle config command
pub async fn handle_config_command(config: &AppConfig) -> Result<()> {
    print_config(config);
    Ok(())
}
