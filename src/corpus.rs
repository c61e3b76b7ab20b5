//! Corpus lifecycle: a record store plus the loader that fills it
//!
//! The corpus is loaded on first use and cached for the lifetime of the
//! instance. A persisted store that already holds records counts as loaded
//! without fetching the feed again.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::loader::RecordLoader;
use crate::loader::RecordSource;
use crate::store::RecordStore;
use crate::Result;

/// Outcome of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub message: String,
    pub records_loaded: usize,
}

pub struct Corpus {
    store: Arc<dyn RecordStore>,
    loader: RecordLoader,
    source: RecordSource,
    /// Record count after the last successful load; `None` until loaded
    loaded: Mutex<Option<usize>>,
}

impl Corpus {
    pub fn new(store: Arc<dyn RecordStore>, loader: RecordLoader, source: RecordSource) -> Self {
        Self {
            store,
            loader,
            source,
            loaded: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }

    pub async fn is_loaded(&self) -> bool {
        self.loaded.lock().await.is_some()
    }

    /// Load the corpus unless it already is; repeated calls are no-ops
    pub async fn load(&self) -> Result<IngestSummary> {
        let mut loaded = self.loaded.lock().await;
        if let Some(count) = *loaded {
            return Ok(summary("Data already loaded", count));
        }

        let existing = self.store.count().await?;
        if existing > 0 {
            info!(
                "Store already holds {} records, skipping fetch from {}",
                existing, self.source
            );
            *loaded = Some(existing);
            return Ok(summary("Data already loaded", existing));
        }

        let records = self.loader.load(&self.source).await?;
        let added = self.store.add_batch(records).await?;
        info!("Loaded {} records into {} store", added, self.store.backend());
        *loaded = Some(added);
        Ok(summary("Data loaded successfully", added))
    }

    /// Refetch the feed and replace the store contents.
    ///
    /// Fetch, parse and batch validation all happen before anything is
    /// replaced, so a failed reload leaves the previous corpus in place.
    pub async fn reload(&self) -> Result<IngestSummary> {
        let mut loaded = self.loaded.lock().await;
        let records = self.loader.load(&self.source).await?;

        let added = self.store.replace_all(records).await?;
        info!("Reloaded {} records into {} store", added, self.store.backend());
        *loaded = Some(added);
        Ok(summary("Data reloaded successfully", added))
    }
}

fn summary(message: &str, records_loaded: usize) -> IngestSummary {
    IngestSummary {
        message: message.to_string(),
        records_loaded,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::Record;
    use crate::store::MemoryStore;
    use crate::PatientRagError;

    const FEED: &str = r#"[
        {"user": "fever", "explanation": "flu", "explanation_embedding": [1.0, 0.0]},
        {"user": "rash", "explanation": "allergy", "explanation_embedding": [0.0, 1.0]}
    ]"#;

    fn loader() -> RecordLoader {
        RecordLoader::new("explanation_embedding", Duration::from_secs(5)).unwrap()
    }

    fn feed_file(dir: &tempfile::TempDir, body: &str) -> RecordSource {
        let path = dir.path().join("feed.json");
        std::fs::write(&path, body).unwrap();
        RecordSource::Path(path)
    }

    #[tokio::test]
    async fn test_load_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let source = feed_file(&dir, FEED);
        let corpus = Corpus::new(Arc::new(MemoryStore::new()), loader(), source);

        assert!(!corpus.is_loaded().await);
        let first = corpus.load().await.unwrap();
        assert_eq!(first.records_loaded, 2);
        assert!(corpus.is_loaded().await);

        // A second load must not try to insert the same ids again
        let second = corpus.load().await.unwrap();
        assert_eq!(second.records_loaded, 2);
        assert_eq!(corpus.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_prefilled_store_skips_fetch() {
        let store = Arc::new(MemoryStore::new());
        store.add(Record::new("a", vec![1.0])).await.unwrap();
        let source = RecordSource::Path("/nonexistent/feed.json".into());
        let corpus = Corpus::new(store, loader(), source);

        let summary = corpus.load().await.unwrap();
        assert_eq!(summary.records_loaded, 1);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = feed_file(&dir, "[]");
        let corpus = Corpus::new(Arc::new(MemoryStore::new()), loader(), source);

        assert!(matches!(
            corpus.load().await,
            Err(PatientRagError::EmptyData(_))
        ));
        assert!(!corpus.is_loaded().await);
        assert_eq!(corpus.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reload_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let source = feed_file(&dir, FEED);
        let corpus = Corpus::new(Arc::new(MemoryStore::new()), loader(), source);
        corpus.load().await.unwrap();

        let summary = corpus.reload().await.unwrap();
        assert_eq!(summary.records_loaded, 2);
        assert_eq!(corpus.store().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let source = feed_file(&dir, FEED);
        let corpus = Corpus::new(Arc::new(MemoryStore::new()), loader(), source);
        corpus.load().await.unwrap();

        std::fs::write(dir.path().join("feed.json"), "not json").unwrap();
        assert!(corpus.reload().await.is_err());
        assert_eq!(corpus.store().count().await.unwrap(), 2);
        assert!(corpus.is_loaded().await);
    }

    #[tokio::test]
    async fn test_reload_with_duplicate_ids_keeps_previous_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let source = feed_file(&dir, FEED);
        let corpus = Corpus::new(Arc::new(MemoryStore::new()), loader(), source);
        corpus.load().await.unwrap();

        std::fs::write(
            dir.path().join("feed.json"),
            r#"[
                {"id": "x", "user": "fever", "explanation": "flu", "explanation_embedding": [1.0, 0.0]},
                {"id": "x", "user": "rash", "explanation": "allergy", "explanation_embedding": [0.0, 1.0]}
            ]"#,
        )
        .unwrap();

        assert!(matches!(
            corpus.reload().await,
            Err(PatientRagError::Validation(_))
        ));
        assert_eq!(corpus.store().count().await.unwrap(), 2);
        assert!(corpus.is_loaded().await);
    }
}
