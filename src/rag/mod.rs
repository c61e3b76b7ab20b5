//! RAG (Retrieval-Augmented Generation) module
//!
//! This module answers a free-text symptom query end to end:
//! - Top-k retrieval of similar patient records by cosine similarity
//! - Prompt assembly from the retrieved explanations and user records
//! - Answer generation through a [`TextGenerator`](crate::llm::TextGenerator)
//!
//! # Examples
//!
//! ```rust,no_run
//! use patientrag::rag::RagService;
//! use patientrag::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::new(&config).await?;
//!
//!     let response = service.ask("persistent dry cough and fever").await?;
//!     println!("Answer: {}", response.answer);
//!     println!("Sources: {} records", response.sources.len());
//!
//!     Ok(())
//! }
//! ```

pub mod pipeline;
pub mod prompts;
pub mod retriever;

pub use pipeline::RagResponse;
pub use pipeline::RagService;
pub use prompts::PromptBuilder;
pub use retriever::Retriever;
