//! In-memory linear-scan store, rebuilt from the loader on every process start

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::check_query_dimension;
use super::duplicate_id;
use super::validate_batch;
use super::validate_record;
use super::RecordStore;
use super::StoreBackend;
use crate::models::RankedResultSet;
use crate::models::Record;
use crate::similarity::rank_top_k;
use crate::Result;

#[derive(Debug, Default)]
struct Entries {
    /// Insertion order is the tie-break order
    records: Vec<Record>,
    ids: HashSet<String>,
    dimension: Option<usize>,
}

/// Records held in process memory, scanned in full on every query
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Entries>,
    /// Dimension fixed by configuration, kept across `clear`
    fixed_dimension: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose dimension is fixed up front instead of by the first record
    pub fn with_dimension(dimension: Option<usize>) -> Self {
        Self {
            inner: RwLock::new(Entries {
                dimension,
                ..Entries::default()
            }),
            fixed_dimension: dimension,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    async fn add(&self, record: Record) -> Result<()> {
        let mut entries = self.inner.write().await;
        validate_record(&record, entries.dimension)?;
        if entries.ids.contains(&record.id) {
            return Err(duplicate_id(&record.id));
        }

        entries.dimension.get_or_insert(record.dimension());
        entries.ids.insert(record.id.clone());
        entries.records.push(record);
        Ok(())
    }

    async fn add_batch(&self, records: Vec<Record>) -> Result<usize> {
        let mut entries = self.inner.write().await;
        let dimension =
            validate_batch(&records, entries.dimension, |id| entries.ids.contains(id))?;

        let added = records.len();
        entries.dimension = dimension;
        for record in records {
            entries.ids.insert(record.id.clone());
            entries.records.push(record);
        }
        debug!("Added {} records to memory store", added);
        Ok(added)
    }

    async fn query(&self, embedding: &[f64], k: usize) -> Result<RankedResultSet> {
        let entries = self.inner.read().await;
        if entries.records.is_empty() || k == 0 {
            return Ok(RankedResultSet::empty());
        }
        check_query_dimension(embedding, entries.dimension)?;

        Ok(rank_top_k(embedding, &entries.records, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        Ok(self.inner.read().await.dimension)
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.inner.write().await;
        *entries = Entries {
            dimension: self.fixed_dimension,
            ..Entries::default()
        };
        Ok(())
    }

    async fn replace_all(&self, records: Vec<Record>) -> Result<usize> {
        let dimension = validate_batch(&records, self.fixed_dimension, |_| false)?;

        let added = records.len();
        let mut fresh = Entries {
            dimension,
            ..Entries::default()
        };
        for record in records {
            fresh.ids.insert(record.id.clone());
            fresh.records.push(record);
        }

        *self.inner.write().await = fresh;
        debug!("Replaced memory store contents with {} records", added);
        Ok(added)
    }
}
