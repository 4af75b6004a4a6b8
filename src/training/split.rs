//! Stratified train/held-out split
//!
//! The two halves are distinct types. Only [`TrainSplit`] is accepted by the
//! oversampler, and nothing converts a [`HeldOutSplit`] into one, so synthetic
//! rows can never reach the evaluation data.

use crate::error::{ChurnError, Result};
use crate::preprocessing::EncodedDataset;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeMap;
use tracing::info;

/// Rows used for fitting; may be oversampled
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSplit(EncodedDataset);

/// Rows reserved for evaluation; never resampled
#[derive(Debug, Clone, PartialEq)]
pub struct HeldOutSplit(EncodedDataset);

impl TrainSplit {
    /// Only the split and the oversampler build training splits
    pub(crate) fn new(data: EncodedDataset) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &EncodedDataset {
        &self.0
    }

    pub fn into_inner(self) -> EncodedDataset {
        self.0
    }
}

impl HeldOutSplit {
    pub fn data(&self) -> &EncodedDataset {
        &self.0
    }
}

/// Split per class: each class sends `round(n_c * test_size)` shuffled rows
/// to the held-out side, at least one and at most `n_c - 1`.
///
/// Rows keep their original relative order within each side.
pub fn stratified_split(
    dataset: &EncodedDataset,
    test_size: f64,
    seed: u64,
) -> Result<(TrainSplit, HeldOutSplit)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ChurnError::InvalidInput(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in dataset.labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(dataset.n_rows());
    let mut held_idx = Vec::new();

    for (class, mut indices) in by_class {
        let n_c = indices.len();
        if n_c < 2 {
            return Err(ChurnError::DataError(format!(
                "class {} has {} row(s); need at least 2 to stratify",
                class, n_c
            )));
        }
        indices.shuffle(&mut rng);
        let n_held = ((n_c as f64) * test_size).round() as usize;
        let n_held = n_held.clamp(1, n_c - 1);
        held_idx.extend_from_slice(&indices[..n_held]);
        train_idx.extend_from_slice(&indices[n_held..]);
    }

    train_idx.sort_unstable();
    held_idx.sort_unstable();

    let train = dataset.select(&train_idx);
    let held = dataset.select(&held_idx);
    info!(
        train_rows = train.n_rows(),
        held_out_rows = held.n_rows(),
        test_size,
        "Stratified split"
    );
    Ok((TrainSplit(train), HeldOutSplit(held)))
}
