//! SQLite-backed collection store.
//!
//! Records live in a named collection inside a single database file and
//! survive process restarts. Embeddings are stored as little-endian `f64`
//! blobs; similarity is computed in process by a full scan ordered by
//! insertion sequence, so ties rank the same way as in [`MemoryStore`](super::MemoryStore).

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use sqlx::SqlitePool;
use tracing::debug;
use tracing::info;

use super::check_query_dimension;
use super::duplicate_id;
use super::validate_batch;
use super::validate_record;
use super::RecordStore;
use super::StoreBackend;
use crate::models::Metadata;
use crate::models::RankedResultSet;
use crate::models::Record;
use crate::similarity::rank_top_k;
use crate::PatientRagError;
use crate::Result;

/// Persisted collection of records with add/query primitives
#[derive(Debug, Clone)]
pub struct PersistedStore {
    pool: SqlitePool,
    collection: String,
    fixed_dimension: Option<usize>,
}

impl PersistedStore {
    /// Open (creating if needed) `collection` in the database at `path`
    pub async fn open(
        path: impl AsRef<Path>,
        collection: &str,
        dimension: Option<usize>,
    ) -> Result<Self> {
        let db_path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            collection: collection.to_string(),
            fixed_dimension: dimension,
        };
        store.init_schema().await?;
        store.ensure_collection().await?;

        info!(
            "Opened collection '{}' at {}",
            store.collection,
            db_path.display()
        );
        Ok(store)
    }

    /// Get a reference to the pool for raw queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                added_at TEXT NOT NULL,
                UNIQUE (collection, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection, seq)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Register the collection and reconcile a configured dimension with the stored one
    async fn ensure_collection(&self) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO collections (name, dimension, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&self.collection)
        .bind(self.fixed_dimension.map(|d| d as i64))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let stored = self.stored_dimension().await?;
        match (stored, self.fixed_dimension) {
            (Some(stored), Some(fixed)) if stored != fixed => {
                Err(PatientRagError::ConfigError(format!(
                    "collection '{}' has dimension {stored}, configuration expects {fixed}",
                    self.collection
                )))
            }
            (None, Some(fixed)) => {
                self.set_dimension(Some(fixed)).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn stored_dimension(&self) -> Result<Option<usize>> {
        let dimension: Option<Option<i64>> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?1")
                .bind(&self.collection)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dimension.flatten().map(|d| d as usize))
    }

    async fn set_dimension(&self, dimension: Option<usize>) -> Result<()> {
        sqlx::query("UPDATE collections SET dimension = ?1 WHERE name = ?2")
            .bind(dimension.map(|d| d as i64))
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn existing_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM records WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Write validated records and the resulting dimension in one transaction.
    ///
    /// With `replace` the collection's existing records are deleted inside the
    /// same transaction. A unique-constraint hit from a concurrent writer is
    /// reported as a duplicate id.
    async fn insert_all(
        &self,
        records: &[Record],
        dimension: Option<usize>,
        replace: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let added_at = Utc::now();

        if replace {
            sqlx::query("DELETE FROM records WHERE collection = ?1")
                .bind(&self.collection)
                .execute(&mut *tx)
                .await?;
        }

        for record in records {
            sqlx::query(
                "INSERT INTO records (collection, id, embedding, metadata, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(encode_embedding(&record.embedding))
            .bind(serde_json::to_string(&record.metadata)?)
            .bind(added_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_id(&record.id),
                other => PatientRagError::Database(other),
            })?;
        }

        sqlx::query("UPDATE collections SET dimension = ?1 WHERE name = ?2")
            .bind(dimension.map(|d| d as i64))
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// All records of the collection in insertion order
    async fn scan(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query(
            "SELECT id, embedding, metadata FROM records WHERE collection = ?1 ORDER BY seq",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Record> {
                let id: String = row.try_get("id")?;
                let blob: Vec<u8> = row.try_get("embedding")?;
                let metadata: String = row.try_get("metadata")?;
                Ok(Record {
                    embedding: decode_embedding(&blob)
                        .map_err(|e| PatientRagError::Parse(format!("record {id}: {e}")))?,
                    metadata: serde_json::from_str::<Metadata>(&metadata)?,
                    id,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for PersistedStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Persisted
    }

    async fn add(&self, record: Record) -> Result<()> {
        let dimension = self.stored_dimension().await?;
        validate_record(&record, dimension)?;

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM records WHERE collection = ?1 AND id = ?2")
                .bind(&self.collection)
                .bind(&record.id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_some() {
            return Err(duplicate_id(&record.id));
        }

        let dimension = dimension.or(Some(record.dimension()));
        self.insert_all(std::slice::from_ref(&record), dimension, false)
            .await
    }

    async fn add_batch(&self, records: Vec<Record>) -> Result<usize> {
        let existing = self.existing_ids().await?;
        let dimension = validate_batch(&records, self.stored_dimension().await?, |id| {
            existing.contains(id)
        })?;

        self.insert_all(&records, dimension, false).await?;
        debug!(
            "Added {} records to collection '{}'",
            records.len(),
            self.collection
        );
        Ok(records.len())
    }

    async fn query(&self, embedding: &[f64], k: usize) -> Result<RankedResultSet> {
        if k == 0 {
            return Ok(RankedResultSet::empty());
        }

        let records = self.scan().await?;
        if records.is_empty() {
            return Ok(RankedResultSet::empty());
        }
        check_query_dimension(embedding, self.stored_dimension().await?)?;

        Ok(rank_top_k(embedding, &records, k))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        self.stored_dimension().await
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM records WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;
        self.set_dimension(self.fixed_dimension).await?;
        info!("Cleared collection '{}'", self.collection);
        Ok(())
    }

    async fn replace_all(&self, records: Vec<Record>) -> Result<usize> {
        let dimension = validate_batch(&records, self.fixed_dimension, |_| false)?;

        self.insert_all(&records, dimension.or(self.fixed_dimension), true)
            .await?;
        info!(
            "Replaced collection '{}' with {} records",
            self.collection,
            records.len()
        );
        Ok(records.len())
    }
}

fn encode_embedding(embedding: &[f64]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> std::result::Result<Vec<f64>, String> {
    if bytes.len() % 8 != 0 {
        return Err(format!("embedding blob has {} bytes", bytes.len()));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}
