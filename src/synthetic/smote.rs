//! SMOTE oversampling

use crate::error::{ChurnError, Result};
use crate::synthetic::{ImbalanceCorrector, ResampleResult, ResampleSummary};
use crate::training::TrainSplit;
use crate::preprocessing::EncodedDataset;
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::info;

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique)
///
/// Each synthetic row is `x + u * (n - x)` for a random minority row `x`, one
/// of its `k` nearest minority neighbours `n`, and `u ~ U[0, 1)`. Rows are
/// generated until the minority count equals the majority count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: u64,
}

impl SMOTE {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn distance_sq(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum()
    }

    /// k nearest rows of `samples` to row `i`, excluding `i` itself.
    /// Duplicates of `i` at distance zero are valid neighbours.
    fn find_neighbors(samples: &Array2<f64>, i: usize, k: usize) -> Vec<usize> {
        let point = samples.row(i);
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (j, row) in samples.rows().into_iter().enumerate() {
            if j == i {
                continue;
            }
            let dist = Self::distance_sq(point, row);
            if heap.len() < k {
                heap.push(DistIdx(dist, j));
            } else if let Some(&DistIdx(max_dist, _)) = heap.peek() {
                if dist < max_dist {
                    heap.pop();
                    heap.push(DistIdx(dist, j));
                }
            }
        }

        let mut neighbors = heap.into_sorted_vec();
        neighbors.sort_by(|a, b| a.cmp(b).then(a.1.cmp(&b.1)));
        neighbors.into_iter().map(|DistIdx(_, j)| j).collect()
    }

    /// Generate synthetic sample between two points
    fn generate_sample(
        point: ArrayView1<f64>,
        neighbor: ArrayView1<f64>,
        rng: &mut StdRng,
    ) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl ImbalanceCorrector for SMOTE {
    fn resample(&self, train: &TrainSplit) -> Result<ResampleResult> {
        let data = train.data();
        let before = data.class_counts();
        let (n_neg, n_pos) = before;

        if n_neg == 0 || n_pos == 0 {
            return Err(ChurnError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let (minority_class, n_minority, n_majority) = if n_pos <= n_neg {
            (1, n_pos, n_neg)
        } else {
            (0, n_neg, n_pos)
        };
        if n_minority < 2 {
            return Err(ChurnError::ValidationError(format!(
                "SMOTE needs at least 2 minority rows, got {}",
                n_minority
            )));
        }

        let minority_idx: Vec<usize> = data
            .labels
            .iter()
            .enumerate()
            .filter(|&(_, &y)| y == minority_class)
            .map(|(i, _)| i)
            .collect();
        let samples = data.features.select(ndarray::Axis(0), &minority_idx);

        let k = self.k_neighbors.min(n_minority - 1);
        let neighbors: Vec<Vec<usize>> = (0..n_minority)
            .into_par_iter()
            .map(|i| Self::find_neighbors(&samples, i, k))
            .collect();

        let n_to_generate = n_majority - n_minority;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic_x: Vec<Vec<f64>> = Vec::with_capacity(n_to_generate);
        for _ in 0..n_to_generate {
            let idx = rng.gen_range(0..n_minority);
            let candidates = &neighbors[idx];
            let neighbor_idx = candidates[rng.gen_range(0..candidates.len())];
            synthetic_x.push(Self::generate_sample(
                samples.row(idx),
                samples.row(neighbor_idx),
                &mut rng,
            ));
        }

        // Original rows first, unchanged, then synthetic rows
        let n_original = data.n_rows();
        let n_features = data.features.ncols();
        let n_total = n_original + synthetic_x.len();
        let x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                data.features[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<i64> = data.labels.iter().copied().collect();
        all_y.extend(std::iter::repeat(minority_class).take(n_to_generate));
        let resampled = EncodedDataset::new(x, Array1::from_vec(all_y))?;

        let summary = ResampleSummary {
            before,
            after: resampled.class_counts(),
            minority_class,
            n_synthetic: n_to_generate,
        };
        info!(
            k_neighbors = k,
            n_synthetic = n_to_generate,
            before = ?summary.before,
            after = ?summary.after,
            "SMOTE resampled training split"
        );

        Ok(ResampleResult {
            train: TrainSplit::new(resampled),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::N_FEATURES;

    fn split(negatives: usize, positives: usize) -> TrainSplit {
        let n = negatives + positives;
        let features = Array2::from_shape_fn((n, N_FEATURES), |(i, j)| {
            if i >= negatives {
                1.0 + ((i * 7 + j) % 5) as f64 / 10.0
            } else {
                ((i + j) % 3) as f64 / 10.0
            }
        });
        let labels = Array1::from_iter((0..n).map(|i| i64::from(i >= negatives)));
        TrainSplit::new(EncodedDataset::new(features, labels).unwrap())
    }

    #[test]
    fn test_balances_classes() {
        let out = SMOTE::new().resample(&split(40, 8)).unwrap();
        assert_eq!(out.summary.before, (40, 8));
        assert_eq!(out.summary.after, (40, 40));
        assert_eq!(out.summary.n_synthetic, 32);
        assert_eq!(out.train.data().n_rows(), 80);
    }

    #[test]
    fn test_original_rows_unchanged_and_first() {
        let input = split(30, 6);
        let out = SMOTE::new().resample(&input).unwrap();
        let n = input.data().n_rows();
        let head = out.train.data().select(&(0..n).collect::<Vec<_>>());
        assert_eq!(&head, input.data());
    }

    #[test]
    fn test_synthetic_rows_lie_in_minority_hull() {
        let out = SMOTE::new().with_seed(3).resample(&split(30, 6)).unwrap();
        let data = out.train.data();
        for i in 36..data.n_rows() {
            assert_eq!(data.labels[i], 1);
            for &v in data.features.row(i).iter() {
                assert!((1.0..=1.4 + 1e-12).contains(&v));
            }
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let input = split(25, 5);
        let a = SMOTE::new().with_seed(9).resample(&input).unwrap();
        let b = SMOTE::new().with_seed(9).resample(&input).unwrap();
        assert_eq!(a.train, b.train);
    }

    #[test]
    fn test_neighbors_exclude_self_keep_duplicates() {
        let samples = Array2::from_shape_vec((3, 1), vec![1.0, 1.0, 5.0]).unwrap();
        assert_eq!(SMOTE::find_neighbors(&samples, 0, 1), vec![1]);
        assert_eq!(SMOTE::find_neighbors(&samples, 2, 2), vec![0, 1]);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        assert!(SMOTE::new().resample(&split(10, 1)).is_err());
        assert!(SMOTE::new().resample(&split(10, 0)).is_err());
    }
}
