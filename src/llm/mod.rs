//! Text generation
//!
//! The generative model is reached over the `generateContent` contract:
//! request `{"contents":[{"parts":[{"text": prompt}]}]}`, response
//! `{"candidates":[{"content":{"parts":[{"text": ...}]}}]}`.

pub mod client;
pub mod response;

use async_trait::async_trait;

pub use client::GenerationClient;
pub use response::ResponseParser;

/// Prompt to user-facing text
///
/// Failures are returned as descriptive text rather than an error, so the
/// answer path always produces something to display.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> String;
}
