//! The vector index interface consumed by the archive.

use async_trait::async_trait;
use serde::Serialize;
use wabun_core::{CollectionKind, FilterPredicate, MetadataMap};

use crate::errors::{IndexError, Result};

/// Parallel arrays of fragment ids, texts and flat metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FragmentBatch {
    /// Fragment ids, pre-generated by the caller.
    pub ids: Vec<String>,
    /// Fragment texts.
    pub texts: Vec<String>,
    /// Flat metadata, one map per fragment.
    pub metadatas: Vec<MetadataMap>,
}

impl FragmentBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment.
    pub fn push(&mut self, id: impl Into<String>, text: impl Into<String>, metadata: MetadataMap) {
        self.ids.push(id.into());
        self.texts.push(text.into());
        self.metadatas.push(metadata);
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the batch holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check the three arrays line up.
    pub fn check_aligned(&self) -> Result<()> {
        if self.texts.len() != self.ids.len() || self.metadatas.len() != self.ids.len() {
            return Err(IndexError::Storage(format!(
                "misaligned batch: {} ids, {} texts, {} metadatas",
                self.ids.len(),
                self.texts.len(),
                self.metadatas.len()
            )));
        }
        Ok(())
    }

    /// Iterate `(id, text, metadata)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &MetadataMap)> {
        self.ids
            .iter()
            .zip(&self.texts)
            .zip(&self.metadatas)
            .map(|((id, text), meta)| (id.as_str(), text.as_str(), meta))
    }
}

/// One similarity search result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryHit {
    /// Fragment id.
    pub id: String,
    /// Fragment text.
    pub text: String,
    /// Flat metadata.
    pub metadata: MetadataMap,
    /// Distance to the query; lower is more similar.
    pub distance: f32,
}

impl QueryHit {
    /// `1 - distance`; higher is more relevant.
    pub fn relevance(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Similarity search plus metadata filtering over named collections.
///
/// Implementations must make writes visible to subsequent reads, apply a
/// batch `add` all-or-nothing, and reject ids already present in the
/// collection with [`IndexError::DuplicateId`]. Query results are ordered
/// by distance ascending with ties broken by fragment id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a batch of fragments atomically.
    async fn add(&self, collection: CollectionKind, batch: FragmentBatch) -> Result<()>;

    /// The `k` fragments nearest to `query_text` that satisfy `predicate`.
    async fn query(
        &self,
        collection: CollectionKind,
        query_text: &str,
        predicate: Option<&FilterPredicate>,
        k: usize,
    ) -> Result<Vec<QueryHit>>;

    /// Number of fragments stored in the collection.
    async fn count(&self, collection: CollectionKind) -> Result<usize>;

    /// Every fragment satisfying `predicate`, in insertion order.
    async fn get(
        &self,
        collection: CollectionKind,
        predicate: Option<&FilterPredicate>,
    ) -> Result<FragmentBatch>;

    /// Every fragment of the collection, in insertion order.
    async fn get_all(&self, collection: CollectionKind) -> Result<FragmentBatch> {
        self.get(collection, None).await
    }

    /// Replace the metadata of existing fragments atomically.
    async fn update_metadata(
        &self,
        collection: CollectionKind,
        ids: &[String],
        metadatas: Vec<MetadataMap>,
    ) -> Result<()>;
}
