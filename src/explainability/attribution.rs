//! Sampled Shapley attributions
//!
//! For each permutation of the features, start from a random background row
//! and switch features to the explained row's values one at a time in
//! permutation order. A feature's marginal contribution is the change in
//! model output at its switch. Contributions are averaged over permutations.
//! All coalition states of one permutation are scored in a single batch.

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Feature contribution to a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature_index: usize,
    pub feature_name: String,
    /// Feature value for this instance
    pub feature_value: f64,
    /// Contribution to the model output
    pub contribution: f64,
}

/// Attribution of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalExplanation {
    pub instance_index: usize,
    /// Mean model output over the background
    pub base_value: f64,
    pub prediction: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl LocalExplanation {
    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Contributions by absolute value, largest first
    pub fn top_k_contributors(&self, k: usize) -> Vec<&FeatureContribution> {
        let mut sorted: Vec<&FeatureContribution> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        sorted.truncate(k);
        sorted
    }
}

/// Sampling explainer over any batch scoring function
pub struct ShapleySampler<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    predict_fn: F,
    background: Array2<f64>,
    feature_names: Vec<String>,
    n_permutations: usize,
    seed: u64,
}

impl<F> ShapleySampler<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<f64>> + Sync,
{
    pub fn new(predict_fn: F, background: Array2<f64>, feature_names: Vec<String>) -> Result<Self> {
        if background.nrows() == 0 {
            return Err(ChurnError::ValidationError(
                "background must contain at least one row".to_string(),
            ));
        }
        if background.ncols() != feature_names.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} background columns", feature_names.len()),
                actual: format!("{} background columns", background.ncols()),
            });
        }
        Ok(Self {
            predict_fn,
            background,
            feature_names,
            n_permutations: 25,
            seed: 42,
        })
    }

    pub fn with_n_permutations(mut self, n: usize) -> Self {
        self.n_permutations = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Mean model output over the background
    pub fn base_value(&self) -> Result<f64> {
        Ok((self.predict_fn)(&self.background)?.mean().unwrap_or(0.0))
    }

    /// Explain every row of `instances`, in parallel
    pub fn explain_batch(&self, instances: &Array2<f64>) -> Result<Vec<LocalExplanation>> {
        let base_value = self.base_value()?;
        (0..instances.nrows())
            .into_par_iter()
            .map(|idx| self.explain_instance(instances.row(idx), idx, base_value))
            .collect()
    }

    pub fn explain(&self, instance: ArrayView1<f64>) -> Result<LocalExplanation> {
        self.explain_instance(instance, 0, self.base_value()?)
    }

    fn explain_instance(
        &self,
        instance: ArrayView1<f64>,
        instance_index: usize,
        base_value: f64,
    ) -> Result<LocalExplanation> {
        let n_features = self.feature_names.len();
        if instance.len() != n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", instance.len()),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(instance_index as u64));
        let mut contributions = vec![0.0; n_features];
        let mut perm: Vec<usize> = (0..n_features).collect();

        for _ in 0..self.n_permutations {
            perm.shuffle(&mut rng);
            let bg_idx = rng.gen_range(0..self.background.nrows());

            // Row 0 is the background row; row s has the first s permuted
            // features switched to the instance's values.
            let mut states = Array2::zeros((n_features + 1, n_features));
            let mut current = self.background.row(bg_idx).to_owned();
            states.row_mut(0).assign(&current);
            for (step, &feature_idx) in perm.iter().enumerate() {
                current[feature_idx] = instance[feature_idx];
                states.row_mut(step + 1).assign(&current);
            }

            let preds = (self.predict_fn)(&states)?;
            for (step, &feature_idx) in perm.iter().enumerate() {
                contributions[feature_idx] += preds[step + 1] - preds[step];
            }
        }

        let n = self.n_permutations as f64;
        let instance_2d = instance.to_owned().insert_axis(ndarray::Axis(0));
        let prediction = (self.predict_fn)(&instance_2d)?[0];

        let contributions = contributions
            .into_iter()
            .enumerate()
            .map(|(idx, total)| FeatureContribution {
                feature_index: idx,
                feature_name: self.feature_names[idx].clone(),
                feature_value: instance[idx],
                contribution: total / n,
            })
            .collect();

        Ok(LocalExplanation {
            instance_index,
            base_value,
            prediction,
            contributions,
        })
    }
}
