//! Churn predictor
//!
//! Holds the fitted scaler and model for the lifetime of the serving process.
//! Both are loaded once and never mutated, so a shared `Arc<ChurnPredictor>`
//! serves concurrent requests without locking.

use super::{ChurnPrediction, RiskThresholds};
use crate::config::ArtifactPaths;
use crate::error::Result;
use crate::export::ArtifactStore;
use crate::preprocessing::{FeatureVector, NumericScaler, RecordEncoder};
use crate::schema::CustomerRecord;
use crate::training::ChurnModel;
use std::time::Instant;
use tracing::{debug, info};

/// Scores raw customer records
#[derive(Debug)]
pub struct ChurnPredictor {
    scaler: NumericScaler,
    model: ChurnModel,
    thresholds: RiskThresholds,
}

impl ChurnPredictor {
    pub fn new(scaler: NumericScaler, model: ChurnModel) -> Self {
        Self {
            scaler,
            model,
            thresholds: RiskThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Result<Self> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        Ok(self)
    }

    /// Load the scaler and model artifacts.
    ///
    /// A missing file fails with `MissingArtifact` naming the step that
    /// writes it; a model trained on another column layout is rejected.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let start = Instant::now();
        let scaler: NumericScaler = ArtifactStore::load(&paths.scaler)?;
        let model: ChurnModel = ArtifactStore::load(&paths.model)?;
        info!(
            scaler = %paths.scaler.display(),
            model = %paths.model.display(),
            n_trees = model.booster.n_trees(),
            trained_at = %model.trained_at,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Loaded inference artifacts"
        );
        Ok(Self::new(scaler, model))
    }

    pub fn model(&self) -> &ChurnModel {
        &self.model
    }

    pub fn scaler(&self) -> &NumericScaler {
        &self.scaler
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Encoded vector the model sees for `record`
    pub fn encode(&self, record: &CustomerRecord) -> Result<FeatureVector> {
        RecordEncoder::new(&self.scaler).encode(record)
    }

    /// Score one record. Out-of-domain categories are rejected, never
    /// mapped to the reference level.
    pub fn predict(&self, record: &CustomerRecord) -> Result<ChurnPrediction> {
        let features = self.encode(record)?;
        let probability = self.model.predict_proba(features.as_slice())?;
        let prediction = ChurnPrediction::new(probability, &self.thresholds);
        debug!(probability, tier = %prediction.risk_tier, "Scored record");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChurnError;
    use crate::inference::RiskTier;
    use crate::schema::N_FEATURES;
    use crate::training::{BoostedTrees, BoosterConfig, EvaluationMetrics, TrainingConfig};
    use ndarray::{Array1, Array2};
    use tempfile::tempdir;

    fn record() -> CustomerRecord {
        CustomerRecord {
            gender: "Male".into(),
            senior_citizen: "0".into(),
            partner: "No".into(),
            dependents: "No".into(),
            tenure: 2.0,
            phone_service: "Yes".into(),
            multiple_lines: "No".into(),
            internet_service: "Fiber optic".into(),
            online_security: "No".into(),
            online_backup: "No".into(),
            device_protection: "No".into(),
            tech_support: "No".into(),
            streaming_tv: "Yes".into(),
            streaming_movies: "Yes".into(),
            contract: "Month-to-month".into(),
            paperless_billing: "Yes".into(),
            payment_method: "Electronic check".into(),
            monthly_charges: 99.65,
            total_charges: 199.3,
        }
    }

    fn predictor() -> ChurnPredictor {
        let scaler = NumericScaler::fit(&[[0.0, 18.25, 18.8], [72.0, 118.75, 8684.8]]).unwrap();
        // Churn iff the first scaled column (tenure) is low
        let n = 40;
        let mut x = Array2::zeros((n, N_FEATURES));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let tenure = i as f64 / n as f64;
            x[[i, 4]] = tenure;
            y[i] = i64::from(tenure < 0.5);
        }
        let config = BoosterConfig {
            n_estimators: 20,
            ..Default::default()
        };
        let mut booster = BoostedTrees::new(config);
        booster.fit(&x, &y).unwrap();
        let proba = booster.predict_proba(&x).unwrap();
        let metrics = EvaluationMetrics::compute(&y, &proba, 0.5).unwrap();
        ChurnPredictor::new(scaler, ChurnModel::new(booster, TrainingConfig::default(), metrics))
    }

    #[test]
    fn test_predict_in_unit_interval() {
        let p = predictor().predict(&record()).unwrap();
        assert!((0.0..=1.0).contains(&p.probability));
        assert_eq!(p.risk_tier, RiskTier::High);
    }

    #[test]
    fn test_long_tenure_scores_lower() {
        let predictor = predictor();
        let short = predictor.predict(&record()).unwrap();
        let mut loyal = record();
        loyal.tenure = 70.0;
        let long = predictor.predict(&loyal).unwrap();
        assert!(long.probability < short.probability);
        assert_eq!(long.risk_tier, RiskTier::Low);
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut r = record();
        r.payment_method = "Cryptocurrency".into();
        let err = predictor().predict(&r).unwrap_err();
        assert!(matches!(err, ChurnError::UnknownCategory { .. }));
        assert!(err.is_rejected_input());
    }

    #[test]
    fn test_custom_thresholds() {
        let base = predictor();
        let p = base.predict(&record()).unwrap().probability;

        let strict = RiskThresholds { high: 1.0, moderate: 1.0 };
        let base = base.with_thresholds(strict).unwrap();
        assert_eq!(base.thresholds(), &strict);
        let scored = base.predict(&record()).unwrap();
        assert_eq!(scored.probability, p);
        assert_eq!(scored.risk_tier, RiskTier::Low);
        assert!(scored.recommendation.is_none());

        let inverted = RiskThresholds { high: 0.2, moderate: 0.5 };
        assert!(matches!(
            predictor().with_thresholds(inverted),
            Err(ChurnError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_missing_artifacts() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::under(dir.path());
        let err = ChurnPredictor::load(&paths).unwrap_err();
        assert!(matches!(err, ChurnError::MissingArtifact { .. }));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::under(dir.path());
        let original = predictor();
        ArtifactStore::save(&paths.scaler, original.scaler()).unwrap();
        ArtifactStore::save(&paths.model, original.model()).unwrap();

        let loaded = ChurnPredictor::load(&paths).unwrap();
        let a = original.predict(&record()).unwrap();
        let b = loaded.predict(&record()).unwrap();
        assert_eq!(a.probability, b.probability);
    }
}
