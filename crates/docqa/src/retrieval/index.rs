//! Exact inner-product vector index

use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Flat, brute-force similarity index over fixed-dimension vectors
///
/// Vectors are stored row-major in insertion order; position `i` is the `i`-th
/// appended vector.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuild an index from row-major data
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(Error::corrupt_state(format!(
                "{} values do not form vectors of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major view of all vectors
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Vector at `position`
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Check every vector before anything is appended
    pub fn check_dimensions(&self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }

    /// Append vectors in order; all-or-nothing on dimension errors
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        self.check_dimensions(vectors)?;
        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Drop every vector at or after position `len`
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    /// Top `k` positions by inner product with `query`, highest first
    ///
    /// Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .map(|row| inner_product(row, query))
            .enumerate()
            .collect();

        let by_score_desc = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
        };

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_score_desc);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_score_desc);

        Ok(scored)
    }
}

/// Dot product of two equal-length slices
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: &[Vec<f32>]) -> VectorIndex {
        let mut index = VectorIndex::new(vectors[0].len());
        index.add(vectors).unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = index_with(&[
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.6, 0.8, 0.0],
        ]);

        let hits = index.search(&[0.0, 1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 2);
        assert!((hits[1].1 - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = index_with(&[vec![1.0, 0.0], vec![0.0, 1.0]]);
        let hits = index.search(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_with(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]]);
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_checks() {
        let mut index = VectorIndex::new(3);
        let err = index.add(&[vec![1.0, 0.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 1 }));
        assert!(index.is_empty());

        assert!(matches!(
            index.search(&[1.0], 1),
            Err(Error::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_truncate_and_get() {
        let mut index = index_with(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(index.get(1), Some(&[3.0, 4.0][..]));
        index.truncate(1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(1), None);
    }

    #[test]
    fn test_from_flat_validates_shape() {
        assert!(VectorIndex::from_flat(2, vec![1.0, 2.0, 3.0]).is_err());
        assert_eq!(VectorIndex::from_flat(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap().len(), 2);
    }
}
