//! Embedding service trait and the deterministic hash embedder.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::{IndexError, Result};
use crate::normalize::l2_normalize;

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (default: calls `embed` with one item).
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("empty result".into()))
    }

    /// Whether the service is ready for inference.
    fn is_ready(&self) -> bool;

    /// Output embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Feature-hashing embedder.
///
/// Each lowercased alphanumeric token is hashed with SHA-256; the first
/// eight bytes pick a dimension and the ninth a sign. The summed vector is
/// L2-normalized, so texts sharing vocabulary land close together. No model,
/// no I/O, fully deterministic.
pub struct HashEmbeddingService {
    dims: usize,
    ready: AtomicBool,
}

impl HashEmbeddingService {
    /// Create a service producing `dims`-dimensional vectors (at least 1).
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            ready: AtomicBool::new(true),
        }
    }

    /// Set whether the service accepts requests.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        let dims = u64::try_from(self.dims).unwrap_or(u64::MAX);
        for token in tokens(text) {
            let hash = Sha256::digest(token.as_bytes());
            let mut head = [0_u8; 8];
            head.copy_from_slice(&hash[..8]);
            let slot = usize::try_from(u64::from_le_bytes(head) % dims).unwrap_or(0);
            v[slot] += if hash[8] & 1 == 0 { 1.0 } else { -1.0 };
        }
        l2_normalize(&mut v);
        v
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingService for HashEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if !self.is_ready() {
            return Err(IndexError::NotReady);
        }
        Ok(texts.iter().map(|t| self.hash_to_vector(t)).collect())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{cosine_similarity, l2_norm};

    #[tokio::test]
    async fn single_returns_correct_dims() {
        let svc = HashEmbeddingService::new(128);
        let v = svc.embed_single("protocolo de memoria").await.unwrap();
        assert_eq!(v.len(), 128);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn deterministic_and_case_insensitive() {
        let svc = HashEmbeddingService::new(128);
        let a = svc.embed_single("Protocolo WABUN").await.unwrap();
        let b = svc.embed_single("protocolo wabun").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn shared_vocabulary_is_closer() {
        let svc = HashEmbeddingService::new(256);
        let query = svc.embed_single("protocolo ARESK principio").await.unwrap();
        let related = svc.embed_single("El protocolo de ARESK define su principio").await.unwrap();
        let unrelated = svc.embed_single("receta de pan con mantequilla").await.unwrap();
        let near = cosine_similarity(&query, &related).unwrap();
        let far = cosine_similarity(&query, &unrelated).unwrap();
        assert!(near > far, "near={near} far={far}");
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let svc = HashEmbeddingService::new(16);
        let v = svc.embed_single("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn not_ready_returns_error() {
        let svc = HashEmbeddingService::new(16);
        svc.set_ready(false);
        assert!(matches!(svc.embed_single("x").await, Err(IndexError::NotReady)));
    }

    #[test]
    fn zero_dimensions_clamped() {
        assert_eq!(HashEmbeddingService::new(0).dimensions(), 1);
    }
}
