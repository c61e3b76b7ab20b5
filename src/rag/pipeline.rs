//! Complete RAG pipeline: Embed -> Retrieve -> Prompt -> Generate

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::config::AppConfig;
use crate::corpus::Corpus;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::llm::GenerationClient;
use crate::llm::TextGenerator;
use crate::loader::RecordLoader;
use crate::loader::RecordSource;
use crate::models::Query;
use crate::models::RankedResultSet;
use crate::rag::PromptBuilder;
use crate::rag::Retriever;
use crate::store::open_store;

/// Complete RAG service
pub struct RagService {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    prompt_builder: PromptBuilder,
    generator: Arc<dyn TextGenerator>,
}

impl RagService {
    /// Build every collaborator from configuration
    ///
    /// # Errors
    /// - Store open errors (database path, dimension conflicts)
    /// - Embedding or generation client configuration errors
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let store = open_store(config).await?;
        let loader = RecordLoader::from_config(&config.loader)?;
        let corpus = Arc::new(Corpus::new(
            store,
            loader,
            RecordSource::parse(config.loader_source()),
        ));
        let embedder = Arc::new(EmbeddingClient::from_config(&config.embeddings)?);
        let generator = Arc::new(GenerationClient::from_config(&config.generation)?);

        Ok(Self::from_parts(corpus, embedder, generator, config.top_k()))
    }

    /// Create from existing collaborators
    #[must_use]
    pub fn from_parts(
        corpus: Arc<Corpus>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn TextGenerator>,
        top_k: usize,
    ) -> Self {
        let retriever = Retriever::new(Arc::clone(corpus.store()), top_k);
        Self {
            corpus,
            embedder,
            retriever,
            prompt_builder: PromptBuilder::new(),
            generator,
        }
    }

    /// Answer a symptom query with the configured k
    ///
    /// # Errors
    /// - Corpus loading errors on first use (fetch, parse, empty feed)
    /// - Embedding errors and query dimension mismatches
    ///
    /// Generation failures are not errors; they arrive as the answer text.
    pub async fn ask(&self, symptom: &str) -> Result<RagResponse> {
        self.ask_with_k(symptom, self.retriever.default_k()).await
    }

    pub async fn ask_with_k(&self, symptom: &str, k: usize) -> Result<RagResponse> {
        info!("Processing RAG query: {}", symptom);

        debug!("Step 1: Embedding query");
        let embedding = self.embedder.embed(symptom).await?;
        self.ask_with_embedding(Query::new(symptom, embedding), k)
            .await
    }

    /// Answer a query whose embedding was computed by the caller
    pub async fn ask_with_embedding(&self, query: Query, k: usize) -> Result<RagResponse> {
        self.corpus.load().await?;

        debug!("Step 2: Retrieving {} similar records", k);
        let sources = self.retriever.retrieve_k(&query, k).await?;

        debug!("Step 3: Building prompt from {} records", sources.len());
        let prompt = self.prompt_builder.build(&query.text, &sources);

        debug!("Step 4: Generating answer");
        let answer = self.generator.generate(&prompt).await;

        info!("RAG query completed with {} sources", sources.len());
        Ok(RagResponse {
            query: query.text,
            answer,
            prompt,
            sources,
        })
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}

/// RAG response
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub answer: String,
    pub prompt: String,
    pub sources: RankedResultSet,
}

impl RagResponse {
    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Query: {}\n", self.query);
        let _ = writeln!(output, "Answer:\n{}\n", self.answer);
        let _ = writeln!(output, "Sources ({} records):", self.sources.len());

        for (idx, source) in self.sources.iter().enumerate() {
            let _ = writeln!(
                output,
                "  {}. #{} {} (Score: {:.3})",
                idx + 1,
                source.record.id,
                source.record.explanation(),
                source.score
            );
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryStore;

    struct FixedEmbedder(Vec<f64>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> String {
            format!("echo: {}", prompt.len())
        }
    }

    fn service(dir: &tempfile::TempDir, embedding: Vec<f64>) -> RagService {
        let path = dir.path().join("feed.json");
        std::fs::write(
            &path,
            r#"[
                {"user": "fever and chills", "explanation": "influenza", "explanation_embedding": [1.0, 0.0]},
                {"user": "itchy rash", "explanation": "allergy", "explanation_embedding": [0.0, 1.0]}
            ]"#,
        )
        .unwrap();

        let loader = RecordLoader::new("explanation_embedding", Duration::from_secs(5)).unwrap();
        let corpus = Arc::new(Corpus::new(
            Arc::new(MemoryStore::new()),
            loader,
            RecordSource::Path(path),
        ));
        RagService::from_parts(
            corpus,
            Arc::new(FixedEmbedder(embedding)),
            Arc::new(EchoGenerator),
            1,
        )
    }

    #[tokio::test]
    async fn test_ask_loads_corpus_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, vec![0.9, 0.1]);
        assert!(!service.corpus().is_loaded().await);

        let response = service.ask("fever").await.unwrap();
        assert!(service.corpus().is_loaded().await);
        assert_eq!(response.sources.ids(), vec!["0"]);
        assert!(response.prompt.contains("influenza"));
        assert!(response.answer.starts_with("echo:"));
    }

    #[tokio::test]
    async fn test_ask_with_k_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, vec![0.0, 1.0]);
        let response = service.ask_with_k("rash", 5).await.unwrap();
        assert_eq!(response.sources.ids(), vec!["1", "0"]);
    }

    #[tokio::test]
    async fn test_format_lists_sources() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(&dir, vec![1.0, 0.0]);
        let formatted = service.ask("fever").await.unwrap().format();
        assert!(formatted.contains("Sources (1 records):"));
        assert!(formatted.contains("#0 influenza"));
    }
}
