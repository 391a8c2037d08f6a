//! `SQLite`-backed reference [`VectorIndex`] with brute-force KNN.
//!
//! All collections share one `fragments` table keyed by `(collection, id)`.
//! Embeddings are little-endian `f32` BLOBs; metadata is the JSON form of
//! the flat [`MetadataMap`]. Queries load the collection, filter in Rust
//! with [`FilterPredicate::matches`], and rank by cosine distance.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tracing::debug;
use wabun_core::{CollectionKind, FilterPredicate, MetadataMap};

use super::connection::{self, ConnectionConfig, ConnectionPool};
use crate::embedding::EmbeddingService;
use crate::errors::{IndexError, Result};
use crate::index::{FragmentBatch, QueryHit, VectorIndex};
use crate::normalize::cosine_distance;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS fragments (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (collection, id)
)";

/// Convert an f32 slice to a byte blob for storage.
pub fn f32_slice_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a byte blob back to an f32 vector.
pub fn blob_to_f32_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

struct StoredRow {
    id: String,
    text: String,
    metadata: MetadataMap,
    embedding: Vec<u8>,
}

/// Reference vector index over an `SQLite` pool.
pub struct SqliteVectorIndex {
    pool: ConnectionPool,
    embedder: Arc<dyn EmbeddingService>,
}

impl SqliteVectorIndex {
    /// Wrap an existing pool, creating the table if needed.
    pub fn new(pool: ConnectionPool, embedder: Arc<dyn EmbeddingService>) -> Result<Self> {
        pool.get()?.execute_batch(SCHEMA)?;
        Ok(Self { pool, embedder })
    }

    /// Open (or create) a file-backed index.
    pub fn open(
        path: &Path,
        config: &ConnectionConfig,
        embedder: Arc<dyn EmbeddingService>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IndexError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        Self::new(connection::new_file(path, config)?, embedder)
    }

    /// Open an ephemeral in-memory index.
    pub fn in_memory(embedder: Arc<dyn EmbeddingService>) -> Result<Self> {
        Self::new(
            connection::new_in_memory(&ConnectionConfig::default())?,
            embedder,
        )
    }

    fn ready_embedder(&self) -> Result<&dyn EmbeddingService> {
        if self.embedder.is_ready() {
            Ok(self.embedder.as_ref())
        } else {
            Err(IndexError::NotReady)
        }
    }

    fn load_rows(&self, collection: CollectionKind) -> Result<Vec<StoredRow>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, text, metadata, embedding FROM fragments
             WHERE collection = ?1 ORDER BY rowid",
        )?;
        let raw = stmt
            .query_map(params![collection.name()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter()
            .map(|(id, text, metadata, embedding)| -> Result<StoredRow> {
                Ok(StoredRow {
                    id,
                    text,
                    metadata: serde_json::from_str(&metadata)?,
                    embedding,
                })
            })
            .collect()
    }

    fn rank(query: &[f32], rows: Vec<StoredRow>, k: usize) -> Result<Vec<QueryHit>> {
        let mut hits = rows
            .into_iter()
            .map(|row| -> Result<QueryHit> {
                let embedding = blob_to_f32_vec(&row.embedding);
                let distance = cosine_distance(query, &embedding).ok_or_else(|| {
                    IndexError::Storage(format!(
                        "dimension mismatch for `{}`: expected {}, got {}",
                        row.id,
                        query.len(),
                        embedding.len()
                    ))
                })?;
                Ok(QueryHit {
                    id: row.id,
                    text: row.text,
                    metadata: row.metadata,
                    distance,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn add(&self, collection: CollectionKind, batch: FragmentBatch) -> Result<()> {
        batch.check_aligned()?;
        if batch.is_empty() {
            return Ok(());
        }
        let embeddings = self.ready_embedder()?.embed(&batch.texts).await?;
        if embeddings.len() != batch.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut seen = HashSet::new();
        for ((id, text, metadata), embedding) in batch.iter().zip(&embeddings) {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM fragments WHERE collection = ?1 AND id = ?2",
                    params![collection.name(), id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists || !seen.insert(id) {
                return Err(IndexError::DuplicateId {
                    collection: collection.name().to_owned(),
                    id: id.to_owned(),
                });
            }
            let _ = tx.execute(
                "INSERT INTO fragments (collection, id, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    collection.name(),
                    id,
                    text,
                    serde_json::to_string(metadata)?,
                    f32_slice_to_blob(embedding)
                ],
            )?;
        }
        tx.commit()?;
        debug!(collection = %collection, fragments = batch.len(), "batch stored");
        Ok(())
    }

    async fn query(
        &self,
        collection: CollectionKind,
        query_text: &str,
        predicate: Option<&FilterPredicate>,
        k: usize,
    ) -> Result<Vec<QueryHit>> {
        let query = self.ready_embedder()?.embed_single(query_text).await?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let rows: Vec<StoredRow> = self
            .load_rows(collection)?
            .into_iter()
            .filter(|row| predicate.is_none_or(|p| p.matches(&row.metadata)))
            .collect();
        let hits = Self::rank(&query, rows, k)?;
        debug!(collection = %collection, k, hits = hits.len(), "similarity query");
        Ok(hits)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    async fn count(&self, collection: CollectionKind) -> Result<usize> {
        let count: i64 = self.pool.get()?.query_row(
            "SELECT count(*) FROM fragments WHERE collection = ?1",
            params![collection.name()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn get(
        &self,
        collection: CollectionKind,
        predicate: Option<&FilterPredicate>,
    ) -> Result<FragmentBatch> {
        let mut batch = FragmentBatch::new();
        for row in self.load_rows(collection)? {
            if predicate.is_none_or(|p| p.matches(&row.metadata)) {
                batch.push(row.id, row.text, row.metadata);
            }
        }
        Ok(batch)
    }

    async fn update_metadata(
        &self,
        collection: CollectionKind,
        ids: &[String],
        metadatas: Vec<MetadataMap>,
    ) -> Result<()> {
        if ids.len() != metadatas.len() {
            return Err(IndexError::Storage(format!(
                "misaligned update: {} ids, {} metadatas",
                ids.len(),
                metadatas.len()
            )));
        }
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        for (id, metadata) in ids.iter().zip(&metadatas) {
            let changed = tx.execute(
                "UPDATE fragments SET metadata = ?1 WHERE collection = ?2 AND id = ?3",
                params![serde_json::to_string(metadata)?, collection.name(), id],
            )?;
            if changed == 0 {
                return Err(IndexError::NotFound {
                    collection: collection.name().to_owned(),
                    id: id.clone(),
                });
            }
        }
        tx.commit()?;
        debug!(collection = %collection, fragments = ids.len(), "metadata updated");
        Ok(())
    }
}
