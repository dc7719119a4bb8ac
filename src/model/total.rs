//! Total points regressor

use crate::data::Label;
use crate::features::Feature;
use crate::model::predictor::{ModelOutput, ModelSpec, ModelState, PredictorModel};
use crate::training::Objective;

pub const TOTAL_FEATURES: [Feature; 10] = [
    Feature::HomeAvgScored,
    Feature::HomeAvgAllowed,
    Feature::AwayAvgScored,
    Feature::AwayAvgAllowed,
    Feature::ProjectedHomeScore,
    Feature::ProjectedAwayScore,
    Feature::ProjectedTotal,
    Feature::H2hAvgTotal,
    Feature::HomeConsistency,
    Feature::AwayConsistency,
];

/// League-typical combined score, used as the fallback and confidence anchor
pub const TYPICAL_TOTAL: f32 = 220.0;

const SPEC: ModelSpec = ModelSpec {
    name: "total_points_model",
    features: &TOTAL_FEATURES,
    label: Label::TotalPoints,
    hidden_width: Some(16),
    objective: Objective::MeanSquaredError,
};

#[derive(Debug, Default)]
pub struct TotalModel {
    state: ModelState,
}

impl TotalModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredictorModel for TotalModel {
    fn spec(&self) -> &ModelSpec {
        &SPEC
    }

    fn state(&self) -> &ModelState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    /// Highest near a typical total, falling off by 0.01 per point away from it
    fn confidence(&self, total: f32) -> f32 {
        (1.0 - (total - TYPICAL_TOTAL).abs() / 100.0).clamp(0.1, 0.8)
    }

    fn fallback(&self) -> ModelOutput {
        ModelOutput {
            value: TYPICAL_TOTAL,
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TrainingSet;
    use crate::features::FeatureVector;
    use crate::TrainingConfig;

    #[test]
    fn test_confidence_band() {
        let model = TotalModel::new();
        assert_eq!(model.confidence(220.0), 0.8);
        assert!((model.confidence(250.0) - 0.7).abs() < 1e-6);
        assert!((model.confidence(160.0) - 0.4).abs() < 1e-6);
        assert_eq!(model.confidence(400.0), 0.1);
    }

    #[test]
    fn test_untrained_returns_fallback() {
        let output = TotalModel::new().predict(&FeatureVector::default());
        assert_eq!(output, ModelOutput { value: 220.0, confidence: 0.0 });
    }

    #[test]
    fn test_empty_training_set_leaves_model_untrained() {
        let mut model = TotalModel::new();
        assert!(!model.train(&TrainingSet::default(), &TrainingConfig::default()));
        assert!(matches!(model.state(), ModelState::Untrained));
        assert_eq!(model.predict(&FeatureVector::default()), model.fallback());
    }
}
