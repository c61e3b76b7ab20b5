//! Top-k retrieval over a record store

use std::sync::Arc;

use tracing::debug;

use crate::errors::PatientRagError;
use crate::errors::Result;
use crate::models::Query;
use crate::models::RankedResultSet;
use crate::store::RecordStore;

/// Retriever returning the k most similar records for a query
pub struct Retriever {
    store: Arc<dyn RecordStore>,
    default_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn RecordStore>, default_k: usize) -> Self {
        Self { store, default_k }
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Retrieve with the configured k
    pub async fn retrieve(&self, query: &Query) -> Result<RankedResultSet> {
        self.retrieve_k(query, self.default_k).await
    }

    /// Retrieve up to `k` records; a corpus smaller than `k` yields all of it
    pub async fn retrieve_k(&self, query: &Query, k: usize) -> Result<RankedResultSet> {
        let results = self.store.query(&query.embedding, k).await?;
        debug!(
            "Retrieved {} of {} requested records for '{}'",
            results.len(),
            k,
            query.text
        );
        Ok(results)
    }

    /// Like [`retrieve_k`](Self::retrieve_k) but an empty corpus is an error
    pub async fn retrieve_non_empty(&self, query: &Query, k: usize) -> Result<RankedResultSet> {
        if self.store.count().await? == 0 {
            return Err(PatientRagError::EmptyCorpus(
                "no records have been loaded".to_string(),
            ));
        }
        self.retrieve_k(query, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::store::MemoryStore;

    async fn store_with(records: Vec<Record>) -> Arc<dyn RecordStore> {
        let store = MemoryStore::new();
        store.add_batch(records).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_default_k_used() {
        let store = store_with(vec![
            Record::new("a", vec![1.0, 0.0]),
            Record::new("b", vec![0.9, 0.1]),
            Record::new("c", vec![0.5, 0.5]),
            Record::new("d", vec![0.0, 1.0]),
        ])
        .await;
        let retriever = Retriever::new(store, 3);

        let results = retriever
            .retrieve(&Query::new("q", vec![1.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(results.ids(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_small_corpus_returns_everything() {
        let store = store_with(vec![Record::new("only", vec![1.0])]).await;
        let retriever = Retriever::new(store, 3);
        let results = retriever.retrieve(&Query::new("q", vec![1.0])).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_corpus() {
        let retriever = Retriever::new(Arc::new(MemoryStore::new()), 3);
        let query = Query::new("q", vec![1.0]);

        assert!(retriever.retrieve(&query).await.unwrap().is_empty());
        assert!(matches!(
            retriever.retrieve_non_empty(&query, 3).await,
            Err(PatientRagError::EmptyCorpus(_))
        ));
    }
}
