//! Table embeddings and a flat L2 similarity index.
//!
//! Each cleaned table is embedded once; a failed embedding is replaced by a
//! zero vector of the index dimension so the index always holds one vector
//! per table and positions stay aligned with table indices.

use crate::error::{GenerationError, PdfTablesError};
use crate::output::CleanedTable;
use async_trait::async_trait;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Embedding collaborator.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError>;
}

/// Embed every text, in order, with at most `concurrency` calls in flight.
///
/// A failed call, or a vector of the wrong length, yields `[0.0; dimension]`.
pub async fn embed_texts(
    embedder: &Arc<dyn Embedder>,
    texts: &[String],
    dimension: usize,
    concurrency: usize,
) -> Vec<Vec<f32>> {
    let embedder = Arc::clone(embedder);
    stream::iter(texts.iter().cloned().enumerate().map(move |(pos, text)| {
        let embedder = Arc::clone(&embedder);
        async move {
            match embedder.embed(&text).await {
                Ok(v) if v.len() == dimension => v,
                Ok(v) => {
                    warn!(
                        "Embedding {}: got {} dimensions, expected {}",
                        pos,
                        v.len(),
                        dimension
                    );
                    vec![0.0; dimension]
                }
                Err(e) => {
                    warn!("Error generating embedding {}: {}", pos, e);
                    vec![0.0; dimension]
                }
            }
        }
        .boxed()
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 1-based table index.
    pub table_index: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    pub content: String,
}

/// Exhaustive L2 index over table embeddings.
#[derive(Debug, Clone)]
pub struct TableIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    entries: Vec<(usize, String)>,
}

impl TableIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn add(
        &mut self,
        table_index: usize,
        content: impl Into<String>,
        vector: Vec<f32>,
    ) -> Result<(), PdfTablesError> {
        if vector.len() != self.dimension {
            return Err(PdfTablesError::InvalidConfig(format!(
                "embedding has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.vectors.push(vector);
        self.entries.push((table_index, content.into()));
        Ok(())
    }

    /// The `k` nearest tables, closest first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, PdfTablesError> {
        if query.len() != self.dimension {
            return Err(PdfTablesError::InvalidConfig(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, squared_l2(v, query)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(pos, distance)| {
                let (table_index, content) = &self.entries[pos];
                SearchHit {
                    table_index: *table_index,
                    distance,
                    content: content.clone(),
                }
            })
            .collect())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Embed the content of every table and build an index over them.
pub async fn index_tables(
    embedder: &Arc<dyn Embedder>,
    tables: &[CleanedTable],
    dimension: usize,
    concurrency: usize,
) -> Result<TableIndex, PdfTablesError> {
    let texts: Vec<String> = tables.iter().map(|t| t.content.clone()).collect();
    let vectors = embed_texts(embedder, &texts, dimension, concurrency).await;

    let mut index = TableIndex::new(dimension);
    for (table, vector) in tables.iter().zip(vectors) {
        index.add(table.table_index, table.content.clone(), vector)?;
    }
    debug!("Indexed {} tables ({} dims)", index.len(), dimension);
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps text to a 3-d vector; "fail" errors out.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, GenerationError> {
            if text == "fail" {
                return Err(GenerationError::Provider("boom".into()));
            }
            if text == "short" {
                return Ok(vec![1.0]);
            }
            Ok(vec![
                text.matches("sales").count() as f32,
                text.matches("year").count() as f32,
                text.len() as f32 / 100.0,
            ])
        }
    }

    fn table(idx: usize, content: &str) -> CleanedTable {
        CleanedTable {
            table_index: idx,
            headers: vec![],
            rows: vec![],
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn failures_fall_back_to_zero_vectors() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let texts = vec!["sales".to_string(), "fail".to_string(), "short".to_string()];
        let vectors = embed_texts(&embedder, &texts, 3, 2).await;
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1], vec![0.0; 3]);
        assert_eq!(vectors[2], vec![0.0; 3]);
    }

    #[tokio::test]
    async fn search_returns_nearest_first() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let tables = vec![
            table(1, "year year"),
            table(2, "sales sales sales"),
            table(3, "fail"),
        ];
        let index = index_tables(&embedder, &tables, 3, 4).await.unwrap();
        assert_eq!(index.len(), 3);

        let query = embedder.embed("sales sales").await.unwrap();
        let hits = index.search(&query, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].table_index, 2);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = TableIndex::new(2);
        assert!(index.add(1, "a", vec![1.0]).is_err());
        index.add(1, "a", vec![1.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
        let hits = index.search(&[0.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 1.0);
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = TableIndex::new(768);
        assert!(index.is_empty());
        assert!(index.search(&vec![0.0; 768], 3).unwrap().is_empty());
    }
}
