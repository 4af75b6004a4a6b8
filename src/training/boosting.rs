//! Gradient-boosted trees with second-order approximation
//!
//! - Logistic loss: gradient `p - y`, hessian `p (1 - p)`
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Exact greedy split search, parallel across features

use super::config::BoosterConfig;
use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single node in a boosted tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum TreeNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            TreeNode::Leaf { weight } => *weight,
            TreeNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let TreeNode::Split { feature, left, right, .. } = self {
            if *feature < counts.len() {
                counts[*feature] += 1.0;
            }
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

/// Gradient statistics shared by every node of one tree
struct GradStats<'a> {
    x: &'a Array2<f64>,
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
    config: &'a BoosterConfig,
}

/// Best split found for one feature
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Build one tree using exact greedy split finding
fn build_tree(
    stats: &GradStats,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
) -> TreeNode {
    let config = stats.config;
    let g_sum: f64 = indices.iter().map(|&i| stats.grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| stats.hess[i]).sum();
    let leaf_weight = compute_leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return TreeNode::Leaf { weight: leaf_weight };
    }

    let best = feature_indices
        .par_iter()
        .filter_map(|&f| find_best_split(stats, indices, f))
        .max_by(|a, b| {
            a.gain
                .partial_cmp(&b.gain)
                .unwrap_or(Ordering::Equal)
                .then(b.feature.cmp(&a.feature))
        });

    match best {
        Some(split) if split.gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| stats.x[[i, split.feature]] <= split.threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return TreeNode::Leaf { weight: leaf_weight };
            }

            let left = build_tree(stats, &left_idx, feature_indices, depth + 1);
            let right = build_tree(stats, &right_idx, feature_indices, depth + 1);
            TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => TreeNode::Leaf { weight: leaf_weight },
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if alpha > 0.0 {
        if g_sum > alpha {
            g_sum - alpha
        } else if g_sum < -alpha {
            g_sum + alpha
        } else {
            return 0.0;
        }
    } else {
        g_sum
    };
    -g_adj / (h_sum + lambda)
}

/// Best split for a single feature; `None` when no admissible split exists
fn find_best_split(stats: &GradStats, indices: &[usize], feature: usize) -> Option<SplitCandidate> {
    let x = stats.x;
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| stats.grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| stats.hess[i]).sum();
    let lambda = stats.config.reg_lambda;
    let min_child = stats.config.min_child_weight;
    let parent_score = (g_total * g_total) / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for (pos, &idx) in sorted.iter().enumerate().take(sorted.len().saturating_sub(1)) {
        g_left += stats.grad[idx];
        h_left += stats.hess[idx];

        let value = x[[idx, feature]];
        let next = x[[sorted[pos + 1], feature]];
        // No threshold separates equal values
        if (next - value).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < min_child || h_right < min_child {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                - parent_score);

        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (value + next) / 2.0,
                gain,
            });
        }
    }

    best
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// Binary classifier: an additive ensemble of regression trees on the log-odds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    config: BoosterConfig,
    trees: Vec<TreeNode>,
    base_score: f64,
    n_features: usize,
}

impl BoostedTrees {
    pub fn new(config: BoosterConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &BoosterConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }

    /// Fit on 0/1 labels. Both classes must be present.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 || n_features == 0 {
            return Err(ChurnError::TrainingError("empty training matrix".to_string()));
        }
        if y.len() != n_samples {
            return Err(ChurnError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{} labels", y.len()),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ChurnError::TrainingError("non-finite feature value".to_string()));
        }
        let positives = y.iter().filter(|&&v| v == 1).count();
        if y.iter().any(|&v| v != 0 && v != 1) {
            return Err(ChurnError::TrainingError("labels must be 0 or 1".to_string()));
        }
        if positives == 0 || positives == n_samples {
            return Err(ChurnError::TrainingError(
                "training labels contain a single class".to_string(),
            ));
        }

        let target: Array1<f64> = y.mapv(|v| v as f64);
        let p = (positives as f64 / n_samples as f64).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        self.n_features = n_features;
        self.trees.clear();

        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let lr = self.config.learning_rate;

        for _ in 0..self.config.n_estimators {
            let probs: Array1<f64> = raw_preds.mapv(sigmoid);
            let grad: Array1<f64> = &probs - &target;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let stats = GradStats {
                x,
                grad: &grad,
                hess: &hess,
                config: &self.config,
            };
            let tree = build_tree(&stats, &row_indices, &col_indices, 0);

            for (i, row) in x.rows().into_iter().enumerate() {
                raw_preds[i] += lr * tree.predict(row);
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn check_input(&self, n_cols: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(ChurnError::ModelNotFitted);
        }
        if n_cols != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", n_cols),
            });
        }
        Ok(())
    }

    /// Log-odds for one sample; the caller guarantees the width
    pub(crate) fn margin_row(&self, sample: ArrayView1<f64>) -> f64 {
        let lr = self.config.learning_rate;
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| lr * tree.predict(sample))
                .sum::<f64>()
    }

    /// Log-odds for every row
    pub fn predict_margin(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_input(x.ncols())?;
        let margins: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.margin_row(x.row(i)))
            .collect();
        Ok(Array1::from_vec(margins))
    }

    /// Probability of the positive class for one sample
    pub fn predict_proba_one(&self, sample: ArrayView1<f64>) -> Result<f64> {
        self.check_input(sample.len())?;
        Ok(sigmoid(self.margin_row(sample)))
    }

    /// Probability of the positive class for every row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_margin(x)?.mapv(sigmoid))
    }

    /// Hard 0/1 predictions at probability 0.5
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(self.predict_proba(x)?.mapv(|p| i64::from(p >= 0.5)))
    }

    /// Split counts per feature, normalized to sum to one
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if !self.is_fitted() {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Some(Array1::from_vec(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect())
            .unwrap();
        let y: Array1<i64> = x
            .rows()
            .into_iter()
            .map(|r| i64::from(r[0] + r[1] > 5.0))
            .collect();
        (x, y)
    }

    fn small_config() -> BoosterConfig {
        BoosterConfig {
            n_estimators: 30,
            max_depth: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = classification_data();
        let mut model = BoostedTrees::new(small_config());
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        let correct = preds.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / y.len() as f64 >= 0.95);
        assert_eq!(model.n_trees(), 30);
    }

    #[test]
    fn test_probabilities_bounded_and_consistent() {
        let (x, y) = classification_data();
        let mut model = BoostedTrees::new(small_config());
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
        let one = model.predict_proba_one(x.row(7)).unwrap();
        assert!((one - proba[7]).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let (x, y) = classification_data();
        let mut a = BoostedTrees::new(small_config());
        let mut b = BoostedTrees::new(small_config());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class_is_fatal() {
        let x = Array2::zeros((10, 2));
        let y = Array1::zeros(10);
        let mut model = BoostedTrees::new(small_config());
        assert!(matches!(model.fit(&x, &y), Err(ChurnError::TrainingError(_))));
    }

    #[test]
    fn test_unfitted_and_wrong_width() {
        let model = BoostedTrees::new(small_config());
        assert!(matches!(
            model.predict_proba(&Array2::zeros((1, 2))),
            Err(ChurnError::ModelNotFitted)
        ));

        let (x, y) = classification_data();
        let mut model = BoostedTrees::new(small_config());
        model.fit(&x, &y).unwrap();
        assert!(model.predict_proba(&Array2::zeros((1, 3))).is_err());
    }

    #[test]
    fn test_leaf_weight_regularization() {
        assert_eq!(compute_leaf_weight(2.0, 3.0, 1.0, 0.0), -0.5);
        assert_eq!(compute_leaf_weight(0.5, 3.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = classification_data();
        let mut model = BoostedTrees::new(small_config());
        model.fit(&x, &y).unwrap();
        let imp = model.feature_importances().unwrap();
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }
}
