//! Query embedding
//!
//! The embedding model is a black box turning symptom text into a
//! fixed-length vector of the corpus dimensionality. [`EmbeddingClient`]
//! talks to one of the supported HTTP providers:
//! - OpenAI-compatible `/embeddings`
//! - Ollama `/api/embeddings`
//!
//! Tests and callers with precomputed vectors can supply their own
//! [`Embedder`].

pub mod client;

use async_trait::async_trait;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;

use crate::errors::Result;

/// Text to embedding vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>>;
}
