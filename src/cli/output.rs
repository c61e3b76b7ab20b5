//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `patientrag` CLI

use crate::corpus::IngestSummary;
use crate::models::RankedResultSet;
use crate::rag::RagResponse;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// # Returns
/// Truncated string with "..." suffix if truncated, otherwise the original string
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Print ingestion outcome
pub fn print_ingest_summary(summary: &IngestSummary) {
    print_success(&format!(
        "{} ({} records)",
        summary.message, summary.records_loaded
    ));
}

/// Print ranked records
pub fn print_query_results(results: &RankedResultSet) {
    if results.is_empty() {
        print_warning("No matching records");
        return;
    }

    println!("Found {} records:", results.len());
    for (idx, result) in results.iter().enumerate() {
        println!();
        println!(
            "  {}. ID: {} | Score: {:.4} | Distance: {:.4}",
            idx + 1,
            result.record.id,
            result.score,
            result.distance()
        );
        println!("     Explanation: {}", truncate_str(result.record.explanation(), 120));
        println!("     Record: {}", truncate_str(result.record.user(), 120));
    }
}

/// Print a generated answer with its sources
pub fn print_rag_response(response: &RagResponse, show_prompt: bool) {
    if show_prompt {
        println!("📝 Prompt:");
        println!("{}", response.prompt);
        println!();
    }
    println!("{}", response.format());
}

/// Print store statistics
pub fn print_stats(
    backend: &str,
    collection: &str,
    count: usize,
    dimension: Option<usize>,
    loaded: bool,
) {
    println!("📊 Store Statistics:");
    println!("  Backend: {backend}");
    println!("  Collection: {collection}");
    println!("  Records: {count}");
    match dimension {
        Some(dimension) => println!("  Dimension: {dimension}"),
        None => println!("  Dimension: not yet established"),
    }
    println!("  Loaded this session: {loaded}");
}

pub fn print_config(config: &AppConfig) {
    println!("📋 PatientRAG Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🗄️  Store:");
    println!("  Backend: {}", config.store.backend);
    println!("  Path: {}", config.store.path);
    println!("  Collection: {}", config.store.collection);
    match config.store.dimension {
        Some(dimension) => println!("  Dimension: {dimension}"),
        None => println!("  Dimension: inferred from first record"),
    }
    println!();

    println!("📥 Loader:");
    println!("  Source: {}", config.loader.source);
    println!("  Embedding field: {}", config.loader.embedding_field);
    println!("  Timeout: {}s", config.loader.timeout_secs);
    println!();

    println!("🔍 Retrieval:");
    println!("  Top k: {}", config.top_k());
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embeddings.model);
    println!("  Dimension: {}", config.embedding_dimension());
    println!();

    println!("🤖 Generation:");
    println!("  Endpoint: {}", config.generation.endpoint);
    println!("  Model: {}", config.generation.model);
    println!("  Key: {}", mask_secret(&config.generation.api_key));
    println!(
        "  Timeouts: connect {}s, request {}s",
        config.generation.connect_timeout_secs, config.generation.request_timeout_secs
    );
    println!(
        "  Retries: {} (backoff {}ms)",
        config.generation.max_retries, config.generation.retry_backoff_ms
    );
    println!();

    println!("🌐 Server:");
    println!("  Address: {}:{}", config.server.host, config.server.port);
    println!("  CORS: {}", config.server.enable_cors);
}

/// Mask an API key for display
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
