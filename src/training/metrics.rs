//! Held-out evaluation metrics

use crate::error::{ChurnError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary confusion matrix at a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1, p == 1) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            pred 0  pred 1")?;
        writeln!(f, "actual 0  {:>7} {:>7}", self.tn, self.fp)?;
        write!(f, "actual 1  {:>7} {:>7}", self.fn_, self.tp)
    }
}

/// Metrics on the naturally imbalanced held-out split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    /// Share of actual churners caught; the metric that matters most here
    pub recall: f64,
    pub f1_score: f64,
    /// `None` when the evaluated labels contain a single class
    pub roc_auc: Option<f64>,
    pub log_loss: f64,
    pub confusion: ConfusionMatrix,
    pub n_samples: usize,
    pub threshold: f64,
}

impl EvaluationMetrics {
    /// Compute every metric from labels and positive-class probabilities
    pub fn compute(y_true: &Array1<i64>, y_prob: &Array1<f64>, threshold: f64) -> Result<Self> {
        if y_true.len() != y_prob.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} probabilities", y_true.len()),
                actual: format!("{} probabilities", y_prob.len()),
            });
        }
        if y_true.is_empty() {
            return Err(ChurnError::ValidationError(
                "cannot evaluate on an empty split".to_string(),
            ));
        }

        let y_pred = y_prob.mapv(|p| i64::from(p >= threshold));
        let cm = ConfusionMatrix::from_predictions(y_true, &y_pred);
        let n = cm.total() as f64;

        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(cm.tp, cm.tp + cm.fp);
        let recall = ratio(cm.tp, cm.tp + cm.fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let eps = 1e-15;
        let log_loss = -y_true
            .iter()
            .zip(y_prob.iter())
            .map(|(&t, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                if t == 1 {
                    p.ln()
                } else {
                    (1.0 - p).ln()
                }
            })
            .sum::<f64>()
            / n;

        Ok(Self {
            accuracy: (cm.tp + cm.tn) as f64 / n,
            precision,
            recall,
            f1_score,
            roc_auc: roc_auc(y_true, y_prob),
            log_loss,
            confusion: cm,
            n_samples: cm.total(),
            threshold,
        })
    }
}

/// Rank-based ROC-AUC (Mann-Whitney U), ties share their average rank
pub fn roc_auc(y_true: &Array1<i64>, y_prob: &Array1<f64>) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..y_prob.len()).collect();
    order.sort_by(|&a, &b| y_prob[a].total_cmp(&y_prob[b]));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_prob[order[end]] == y_prob[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group spans ranks start+1 ..= end
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| y_true[i] == 1).count();
        rank_sum_pos += avg_rank * positives as f64;
        start = end;
    }

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}
