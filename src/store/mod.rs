//! Record store abstraction
//!
//! Two interchangeable backends sit behind [`RecordStore`]:
//! - [`MemoryStore`]: linear scan over records held in process memory
//! - [`PersistedStore`]: SQLite-backed collection that survives restarts
//!
//! Both reject duplicate ids and dimension mismatches with
//! [`PatientRagError::Validation`](crate::PatientRagError::Validation)
//! before mutating anything, and rank with [`rank_top_k`](crate::similarity::rank_top_k).

pub mod memory;
pub mod persisted;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use memory::MemoryStore;
pub use persisted::PersistedStore;

use crate::config::AppConfig;
use crate::models::RankedResultSet;
use crate::models::Record;
use crate::similarity::validate_embedding;
use crate::PatientRagError;
use crate::Result;

/// Which backend a store was opened with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Persisted,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Persisted => write!(f, "persisted"),
        }
    }
}

/// Storage and similarity query over `{id, embedding, metadata}` records
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend(&self) -> StoreBackend;

    /// Insert one record; duplicate ids and dimension mismatches are rejected
    async fn add(&self, record: Record) -> Result<()>;

    /// Insert a batch atomically: either every record is stored or none is
    async fn add_batch(&self, records: Vec<Record>) -> Result<usize>;

    /// Top-k records by cosine similarity, descending; empty for k == 0 or an empty store
    async fn query(&self, embedding: &[f64], k: usize) -> Result<RankedResultSet>;

    async fn count(&self) -> Result<usize>;

    /// Corpus dimensionality, `None` until established
    async fn dimension(&self) -> Result<Option<usize>>;

    /// Bulk reset
    async fn clear(&self) -> Result<()>;

    /// Swap the whole corpus for `records` atomically; on error the
    /// previous contents are untouched
    async fn replace_all(&self, records: Vec<Record>) -> Result<usize>;
}

/// Open the backend selected in `[store]`
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.store_backend() {
        StoreBackend::Memory => Arc::new(MemoryStore::with_dimension(config.store.dimension)),
        StoreBackend::Persisted => Arc::new(
            PersistedStore::open(
                &config.store.path,
                &config.store.collection,
                config.store.dimension,
            )
            .await?,
        ),
    };
    tracing::info!("Opened {} record store", store.backend());
    Ok(store)
}

/// Validate a batch against the store's current state and itself.
///
/// Returns the dimension the corpus will have once the batch is applied.
pub(crate) fn validate_batch<F>(
    records: &[Record],
    current_dim: Option<usize>,
    mut exists: F,
) -> Result<Option<usize>>
where
    F: FnMut(&str) -> bool,
{
    let mut dim = current_dim;
    let mut seen = HashSet::with_capacity(records.len());

    for record in records {
        validate_record(record, dim)?;
        if exists(record.id.as_str()) || !seen.insert(record.id.as_str()) {
            return Err(duplicate_id(&record.id));
        }
        dim.get_or_insert(record.dimension());
    }

    Ok(dim)
}

pub(crate) fn validate_record(record: &Record, dim: Option<usize>) -> Result<()> {
    if record.id.is_empty() {
        return Err(PatientRagError::Validation(
            "record id must not be empty".to_string(),
        ));
    }
    validate_embedding(&record.embedding, dim).map_err(|e| match e {
        PatientRagError::Validation(msg) => {
            PatientRagError::Validation(format!("record {}: {msg}", record.id))
        }
        other => other,
    })
}

pub(crate) fn duplicate_id(id: &str) -> PatientRagError {
    PatientRagError::Validation(format!("record id {id} already exists"))
}

/// Query-side dimension check; an empty corpus accepts any query
pub(crate) fn check_query_dimension(embedding: &[f64], dim: Option<usize>) -> Result<()> {
    match dim {
        Some(dim) => validate_embedding(embedding, Some(dim)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display_and_serde() {
        assert_eq!(StoreBackend::Persisted.to_string(), "persisted");
        let parsed: StoreBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(parsed, StoreBackend::Memory);
    }

    #[test]
    fn test_validate_batch_detects_internal_duplicates() {
        let records = vec![
            Record::new("a", vec![1.0, 0.0]),
            Record::new("a", vec![0.0, 1.0]),
        ];
        let result = validate_batch(&records, None, |_| false);
        assert!(matches!(result, Err(PatientRagError::Validation(_))));
    }

    #[test]
    fn test_validate_batch_establishes_dimension() {
        let records = vec![
            Record::new("a", vec![1.0, 0.0, 0.0]),
            Record::new("b", vec![0.0, 1.0, 0.0]),
        ];
        assert_eq!(validate_batch(&records, None, |_| false).unwrap(), Some(3));
    }

    #[test]
    fn test_validate_batch_mixed_dimensions() {
        let records = vec![Record::new("a", vec![1.0, 0.0]), Record::new("b", vec![1.0])];
        assert!(validate_batch(&records, None, |_| false).is_err());
    }

    #[test]
    fn test_validate_batch_existing_id() {
        let records = vec![Record::new("a", vec![1.0])];
        assert!(validate_batch(&records, Some(1), |id| id == "a").is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(validate_record(&Record::new("", vec![1.0]), None).is_err());
    }
}
