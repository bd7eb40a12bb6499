// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Vector Index
//!
//! Exact k-nearest-neighbour search by cosine similarity over one
//! (judge, memory kind) partition.
//!
//! - Entries are kept in insertion order; `search` sorts stably by descending
//!   similarity, so ties resolve to the earliest inserted entry.
//! - Similarity is computed in `f64` on the raw vectors. A zero-magnitude
//!   vector has similarity 0 with everything.
//! - `search` with `k` larger than the partition returns every entry.
//! - `delete` of an unknown id is a no-op.
//!
//! Search is a linear scan. Partitions hold thousands of vectors, where a
//! scan is exact and fast enough; an ANN backend would have to preserve the
//! ordering contract above.

use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::error::MemAlignError;
use crate::domain::providers::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("Vector dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<IndexError> for MemAlignError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch { expected, actual } => {
                MemAlignError::ExternalProvider(ProviderError::DimensionMismatch { expected, actual })
            }
        }
    }
}

#[derive(Debug, Clone)]
struct IndexEntry<K, M> {
    id: K,
    vector: Vec<f32>,
    norm: f64,
    metadata: M,
}

/// One search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<K, M> {
    pub id: K,
    pub similarity: f64,
    pub metadata: M,
}

#[derive(Debug, Clone)]
pub struct VectorIndex<K, M> {
    dimension: usize,
    entries: Vec<IndexEntry<K, M>>,
    positions: HashMap<K, usize>,
}

fn magnitude(vector: &[f32]) -> f64 {
    vector.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    similarity_with_norms(a, magnitude(a), b, magnitude(b))
}

fn similarity_with_norms(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

impl<K, M> VectorIndex<K, M>
where
    K: Copy + Eq + Hash,
    M: Clone,
{
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Insert a new entry at the end; an existing id is replaced in place
    pub fn insert(&mut self, id: K, vector: Vec<f32>, metadata: M) -> Result<(), IndexError> {
        self.check_dimension(&vector)?;
        let norm = magnitude(&vector);
        let entry = IndexEntry { id, vector, norm, metadata };

        match self.positions.get(&id) {
            Some(&position) => self.entries[position] = entry,
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Replace vector and metadata of an entry, keeping its insertion position
    pub fn update(&mut self, id: K, vector: Vec<f32>, metadata: M) -> Result<bool, IndexError> {
        self.check_dimension(&vector)?;
        let Some(&position) = self.positions.get(&id) else {
            return Ok(false);
        };
        let entry = &mut self.entries[position];
        entry.norm = magnitude(&vector);
        entry.vector = vector;
        entry.metadata = metadata;
        Ok(true)
    }

    /// Replace only the metadata of an entry
    pub fn update_metadata(&mut self, id: K, metadata: M) -> bool {
        match self.positions.get(&id) {
            Some(&position) => {
                self.entries[position].metadata = metadata;
                true
            }
            None => false,
        }
    }

    /// Remove an entry; returns its metadata if it existed
    pub fn delete(&mut self, id: &K) -> Option<M> {
        let position = self.positions.remove(id)?;
        let removed = self.entries.remove(position);
        for entry in &self.entries[position..] {
            if let Some(p) = self.positions.get_mut(&entry.id) {
                *p -= 1;
            }
        }
        Some(removed.metadata)
    }

    pub fn get(&self, id: &K) -> Option<&M> {
        self.positions.get(id).map(|&p| &self.entries[p].metadata)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.positions.contains_key(id)
    }

    /// Metadata of every entry, in insertion order
    pub fn values(&self) -> impl Iterator<Item = &M> {
        self.entries.iter().map(|e| &e.metadata)
    }

    /// Top-k entries by descending cosine similarity, ties by insertion order
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<K, M>>, IndexError> {
        self.search_filtered(query, k, |_| true)
    }

    /// `search` restricted to entries whose id passes `filter`
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        filter: impl Fn(&K) -> bool,
    ) -> Result<Vec<SearchHit<K, M>>, IndexError> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_norm = magnitude(query);

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| filter(&e.id))
            .map(|(i, e)| (i, similarity_with_norms(query, query_norm, &e.vector, e.norm)))
            .collect();

        // Stable sort keeps insertion order among equal similarities
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| {
                let entry = &self.entries[i];
                SearchHit {
                    id: entry.id,
                    similarity,
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> VectorIndex<u32, &'static str> {
        VectorIndex::new(2)
    }

    #[test]
    fn test_cosine_bounds_and_zero_vector() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[3.0, 4.0]), 0.6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let mut idx = index();
        idx.insert(1, vec![0.0, 1.0], "orthogonal").unwrap();
        idx.insert(2, vec![1.0, 0.0], "exact").unwrap();
        idx.insert(3, vec![3.0, 4.0], "close").unwrap();

        let hits = idx.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<u32> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut idx = index();
        idx.insert(7, vec![2.0, 0.0], "second-scale").unwrap();
        idx.insert(3, vec![1.0, 0.0], "first-scale").unwrap();
        idx.insert(5, vec![5.0, 0.0], "third-scale").unwrap();

        let ids: Vec<u32> = idx.search(&[1.0, 0.0], 3).unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_k_larger_than_partition_returns_everything_once() {
        let mut idx = index();
        idx.insert(1, vec![1.0, 0.0], "a").unwrap();
        idx.insert(2, vec![0.0, 1.0], "b").unwrap();

        let hits = idx.search(&[1.0, 1.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(idx.search(&[1.0, 1.0], 0).unwrap().is_empty());
        assert!(VectorIndex::<u32, ()>::new(2).search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent_and_keeps_order() {
        let mut idx = index();
        idx.insert(1, vec![1.0, 0.0], "a").unwrap();
        idx.insert(2, vec![1.0, 0.0], "b").unwrap();
        idx.insert(3, vec![1.0, 0.0], "c").unwrap();

        assert_eq!(idx.delete(&2), Some("b"));
        assert_eq!(idx.delete(&2), None);
        assert_eq!(idx.delete(&42), None);

        let ids: Vec<u32> = idx.search(&[1.0, 0.0], 5).unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(idx.get(&3), Some(&"c"));
    }

    #[test]
    fn test_update_keeps_position() {
        let mut idx = index();
        idx.insert(1, vec![1.0, 0.0], "a").unwrap();
        idx.insert(2, vec![0.0, 1.0], "b").unwrap();
        assert!(idx.update(2, vec![1.0, 0.0], "b2").unwrap());
        assert!(!idx.update(9, vec![1.0, 0.0], "missing").unwrap());

        let hits = idx.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[1].metadata, "b2");
    }

    #[test]
    fn test_filtered_search_excludes_ids() {
        let mut idx = index();
        idx.insert(1, vec![1.0, 0.0], "self").unwrap();
        idx.insert(2, vec![3.0, 4.0], "sibling").unwrap();

        let hits = idx.search_filtered(&[1.0, 0.0], 1, |id| *id != 1).unwrap();
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut idx = index();
        assert_eq!(
            idx.insert(1, vec![1.0, 0.0, 0.0], "x"),
            Err(IndexError::DimensionMismatch { expected: 2, actual: 3 })
        );
        assert!(idx.search(&[1.0], 1).is_err());
    }
}
