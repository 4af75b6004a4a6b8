//! Global attribution summary and the offline explain step

use super::attribution::{LocalExplanation, ShapleySampler};
use super::ExplainConfig;
use crate::config::ArtifactPaths;
use crate::error::{ChurnError, PipelineStep, Result};
use crate::export::ArtifactStore;
use crate::preprocessing::EncodedDataset;
use crate::schema::FeatureSchema;
use crate::training::ChurnModel;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::time::Instant;
use tracing::info;

/// Aggregate attribution of one feature across the explained sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    /// Mean absolute contribution to the margin
    pub mean_abs: f64,
    /// Sign of the correlation between feature value and contribution:
    /// +1 when higher values push towards churn, -1 when away, 0 if flat
    pub direction: i8,
}

/// Global attribution, sorted by `mean_abs` descending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionSummary {
    pub features: Vec<FeatureAttribution>,
    pub n_samples: usize,
    pub base_value: f64,
}

impl AttributionSummary {
    /// Aggregate per-instance explanations
    pub fn from_explanations(explanations: &[LocalExplanation]) -> Result<Self> {
        let first = explanations.first().ok_or_else(|| {
            ChurnError::ValidationError("no explanations to summarize".to_string())
        })?;
        let n = explanations.len() as f64;

        let features = first
            .contributions
            .iter()
            .enumerate()
            .map(|(j, c)| {
                let values: Vec<f64> = explanations
                    .iter()
                    .map(|e| e.contributions[j].feature_value)
                    .collect();
                let attributions: Vec<f64> = explanations
                    .iter()
                    .map(|e| e.contributions[j].contribution)
                    .collect();
                FeatureAttribution {
                    feature: c.feature_name.clone(),
                    mean_abs: attributions.iter().map(|a| a.abs()).sum::<f64>() / n,
                    direction: covariance_sign(&values, &attributions),
                }
            })
            .collect::<Vec<_>>();

        let mut summary = Self {
            features,
            n_samples: explanations.len(),
            base_value: first.base_value,
        };
        summary
            .features
            .sort_by(|a, b| b.mean_abs.total_cmp(&a.mean_abs));
        Ok(summary)
    }

    pub fn top(&self, k: usize) -> &[FeatureAttribution] {
        &self.features[..k.min(self.features.len())]
    }

    /// Horizontal bar chart of the `top_k` features as a standalone SVG
    pub fn render_svg(&self, top_k: usize) -> Result<String> {
        let mut svg = String::new();
        self.write_svg(&mut svg, top_k)
            .map_err(|e| ChurnError::SerializationError(format!("attribution chart: {}", e)))?;
        Ok(svg)
    }

    fn write_svg(&self, svg: &mut String, top_k: usize) -> fmt::Result {
        const WIDTH: f64 = 760.0;
        const LABEL_W: f64 = 300.0;
        const BAR_H: f64 = 22.0;
        const GAP: f64 = 6.0;
        const TOP: f64 = 56.0;

        let rows = self.top(top_k);
        let height = TOP + rows.len() as f64 * (BAR_H + GAP) + 40.0;
        let max = rows.iter().map(|r| r.mean_abs).fold(0.0, f64::max);
        let scale = if max > 0.0 { (WIDTH - LABEL_W - 80.0) / max } else { 0.0 };

        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="13">"#,
            w = WIDTH,
            h = height
        )?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
        writeln!(
            svg,
            r#"<text x="16" y="28" font-size="16" font-weight="bold">Mean |attribution| on churn log-odds ({} customers)</text>"#,
            self.n_samples
        )?;
        for (i, row) in rows.iter().enumerate() {
            let y = TOP + i as f64 * (BAR_H + GAP);
            let fill = match row.direction {
                d if d > 0 => "#d9534f",
                d if d < 0 => "#337ab7",
                _ => "#999999",
            };
            writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#,
                LABEL_W - 8.0,
                y + BAR_H * 0.7,
                escape(&row.feature)
            )?;
            writeln!(
                svg,
                r#"<rect x="{}" y="{}" width="{:.2}" height="{}" fill="{}"/>"#,
                LABEL_W,
                y,
                row.mean_abs * scale,
                BAR_H,
                fill
            )?;
            writeln!(
                svg,
                r#"<text x="{:.2}" y="{}">{:.3}</text>"#,
                LABEL_W + row.mean_abs * scale + 6.0,
                y + BAR_H * 0.7,
                row.mean_abs
            )?;
        }
        writeln!(
            svg,
            r##"<text x="16" y="{}" fill="#555">red: higher value raises churn risk, blue: lowers it</text>"##,
            height - 14.0
        )?;
        svg.push_str("</svg>\n");
        Ok(())
    }
}

fn covariance_sign(values: &[f64], attributions: &[f64]) -> i8 {
    let n = values.len() as f64;
    let mean_v = values.iter().sum::<f64>() / n;
    let mean_a = attributions.iter().sum::<f64>() / n;
    let cov: f64 = values
        .iter()
        .zip(attributions)
        .map(|(v, a)| (v - mean_v) * (a - mean_a))
        .sum();
    if cov > 1e-12 {
        1
    } else if cov < -1e-12 {
        -1
    } else {
        0
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The offline explain step: model + processed sample → attribution chart
pub struct ExplainStep {
    config: ExplainConfig,
}

impl ExplainStep {
    pub fn new(config: ExplainConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, paths: &ArtifactPaths) -> Result<AttributionSummary> {
        let start = Instant::now();
        ArtifactStore::require(&paths.processed_data, PipelineStep::Preprocess)?;
        ArtifactStore::require(&paths.model, PipelineStep::Train)?;

        let model: ChurnModel = ArtifactStore::load(&paths.model)?;
        let dataset = EncodedDataset::read_csv(&paths.processed_data)?;
        let summary = self.summarize(&model, &dataset)?;

        let svg = summary.render_svg(self.config.top_k)?;
        ArtifactStore::write_bytes(&paths.attribution_image, svg.as_bytes())?;
        info!(
            path = %paths.attribution_image.display(),
            n_samples = summary.n_samples,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Wrote attribution chart"
        );
        Ok(summary)
    }

    /// Attribute a seeded sample of the dataset (labels unused)
    pub fn summarize(&self, model: &ChurnModel, dataset: &EncodedDataset) -> Result<AttributionSummary> {
        let n = dataset.n_rows();
        if n == 0 {
            return Err(ChurnError::DataError("processed dataset is empty".to_string()));
        }
        let mut rng = StdRng::seed_from_u64(self.config.random_state);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        indices.truncate(self.config.sample_size.min(n));
        let sample = dataset.select(&indices).features;

        let booster = &model.booster;
        let explainer = ShapleySampler::new(
            |x| booster.predict_margin(x),
            sample.clone(),
            FeatureSchema::canonical().columns().to_vec(),
        )?
        .with_n_permutations(self.config.n_permutations)
        .with_seed(self.config.random_state);

        info!(
            rows = sample.nrows(),
            permutations = self.config.n_permutations,
            "Computing sampled Shapley attributions"
        );
        let explanations = explainer.explain_batch(&sample)?;
        AttributionSummary::from_explanations(&explanations)
    }
}
