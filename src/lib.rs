pub mod api;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod models;
pub mod rag;
pub mod similarity;
pub mod store;

pub use config::AppConfig;
pub use corpus::Corpus;
pub use errors::*;
pub use models::Query;
pub use models::RankedResultSet;
pub use models::Record;
pub use models::RetrievalResult;
pub use rag::RagService;
pub use store::RecordStore;
