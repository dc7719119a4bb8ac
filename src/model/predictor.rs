//! Shared predictor lifecycle
//!
//! Every model follows the same path: project its declared features, fit a
//! scaler on the training partition, fit the network, then predict, persist
//! and reload. Only the feature subset, target, network shape and confidence
//! mapping differ between models.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{Label, TrainingSet};
use crate::features::{Feature, FeatureVector};
use crate::model::net::{NetConfig, PredictorNet};
use crate::model::scaler::{FeatureScaler, TargetScaler};
use crate::model::InferenceBackend;
use crate::training::fit::forward_rows;
use crate::training::{
    fit_network, train_held_out_split, FitConfig, MetricKind, Objective, TrainingMetrics,
};
use crate::{ApexError, Result, TrainingConfig};

/// Static description of a model
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    /// Artifact file stem
    pub name: &'static str,
    pub features: &'static [Feature],
    pub label: Label,
    pub hidden_width: Option<usize>,
    pub objective: Objective,
}

impl ModelSpec {
    pub fn net_config(&self) -> NetConfig {
        NetConfig {
            input_dim: self.features.len(),
            hidden_width: self.hidden_width,
        }
    }

    pub fn metric(&self) -> MetricKind {
        match self.objective {
            Objective::BinaryCrossEntropy => MetricKind::Accuracy,
            Objective::MeanSquaredError => MetricKind::MeanAbsoluteError,
        }
    }

    pub fn weights_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.name)
    }

    pub fn metadata_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.name))
    }
}

/// A fitted network with the transforms it was trained under
#[derive(Debug)]
pub struct FittedModel {
    features: Vec<Feature>,
    net: PredictorNet<InferenceBackend>,
    scaler: FeatureScaler,
    /// Present for regressors trained on a standardised target
    target: Option<TargetScaler>,
}

impl FittedModel {
    /// Model outputs in natural units: a probability or a point value
    pub fn predict_rows(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        let device = Default::default();
        let x = self.scaler.to_tensor::<InferenceBackend>(rows, &device);
        let raw = forward_rows(&self.net, x)?;

        Ok(match self.target {
            Some(target) => raw.into_iter().map(|v| target.denormalize(v)).collect(),
            None => raw.into_iter().map(|v| 1.0 / (1.0 + (-v).exp())).collect(),
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f32> {
        let row = features.select(&self.features);
        self.predict_rows(&[row])?
            .first()
            .copied()
            .ok_or_else(|| ApexError::Inference("empty model output".to_string()))
    }
}

/// Where a model is in its lifecycle
#[derive(Debug, Default)]
pub enum ModelState {
    #[default]
    Untrained,
    Trained {
        fitted: FittedModel,
        metrics: TrainingMetrics,
    },
    Loaded {
        fitted: FittedModel,
        /// Metrics recorded when the artifact was written, if any
        metrics: Option<TrainingMetrics>,
    },
}

impl ModelState {
    pub fn fitted(&self) -> Option<&FittedModel> {
        match self {
            ModelState::Untrained => None,
            ModelState::Trained { fitted, .. } | ModelState::Loaded { fitted, .. } => Some(fitted),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.fitted().is_some()
    }

    pub fn metrics(&self) -> Option<&TrainingMetrics> {
        match self {
            ModelState::Untrained => None,
            ModelState::Trained { metrics, .. } => Some(metrics),
            ModelState::Loaded { metrics, .. } => metrics.as_ref(),
        }
    }
}

/// Single-model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutput {
    pub value: f32,
    /// Always in [0, 1]
    pub confidence: f32,
}

/// Contents of `<name>.json` next to the weights
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactMetadata {
    features: Vec<String>,
    hidden_width: Option<usize>,
    scaler: FeatureScaler,
    target: Option<TargetScaler>,
    metrics: Option<TrainingMetrics>,
}

pub trait PredictorModel {
    fn spec(&self) -> &ModelSpec;

    fn state(&self) -> &ModelState;

    fn state_mut(&mut self) -> &mut ModelState;

    /// Confidence for a raw model value
    fn confidence(&self, value: f32) -> f32;

    /// Output used when the model cannot produce one
    fn fallback(&self) -> ModelOutput;

    fn name(&self) -> &'static str {
        self.spec().name
    }

    fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Fit on `set`. On failure the previous state is kept and false is returned.
    fn train(&mut self, set: &TrainingSet, config: &TrainingConfig) -> bool {
        match fit(self.spec(), set, config) {
            Ok((fitted, metrics)) => {
                log::info!("{} trained: {}", self.name(), metrics);
                *self.state_mut() = ModelState::Trained { fitted, metrics };
                true
            }
            Err(e) => {
                log::error!("Failed to train {}: {}", self.name(), e);
                false
            }
        }
    }

    fn predict(&self, features: &FeatureVector) -> ModelOutput {
        let Some(fitted) = self.state().fitted() else {
            log::debug!("{} is not ready, using fallback", self.name());
            return self.fallback();
        };

        match fitted.predict(features) {
            Ok(value) if value.is_finite() => ModelOutput {
                value,
                confidence: self.confidence(value).clamp(0.0, 1.0),
            },
            Ok(value) => {
                log::warn!("{} produced non-finite output {}", self.name(), value);
                self.fallback()
            }
            Err(e) => {
                log::warn!("{} inference failed: {}", self.name(), e);
                self.fallback()
            }
        }
    }

    /// Write `<name>.mpk` and `<name>.json` into `dir`
    fn persist(&self, dir: &Path) -> Result<()> {
        let spec = self.spec();
        let Some(fitted) = self.state().fitted() else {
            return Err(ApexError::Persistence {
                model: spec.name.to_string(),
                message: "model has not been trained".to_string(),
            });
        };

        std::fs::create_dir_all(dir)?;
        fitted.net.save(&spec.weights_path(dir))?;

        let metadata = ArtifactMetadata {
            features: fitted.features.iter().map(|f| f.name().to_string()).collect(),
            hidden_width: spec.hidden_width,
            scaler: fitted.scaler.clone(),
            target: fitted.target,
            metrics: self.state().metrics().copied(),
        };
        std::fs::write(spec.metadata_path(dir), serde_json::to_string_pretty(&metadata)?)?;

        log::info!("Saved {} to {}", spec.name, dir.display());
        Ok(())
    }

    /// Load the artifact from `dir`. Ok(false) when none exists.
    fn load(&mut self, dir: &Path) -> Result<bool> {
        let spec = *self.spec();
        let metadata_path = spec.metadata_path(dir);
        let weights_path = spec.weights_path(dir).with_extension("mpk");
        if !metadata_path.exists() || !weights_path.exists() {
            log::info!("No saved {} in {}", spec.name, dir.display());
            return Ok(false);
        }

        let persistence_error = |message: String| ApexError::Persistence {
            model: spec.name.to_string(),
            message,
        };

        let metadata: ArtifactMetadata =
            serde_json::from_str(&std::fs::read_to_string(&metadata_path)?)
                .map_err(|e| persistence_error(format!("unreadable metadata: {}", e)))?;

        let features: Vec<Option<Feature>> =
            metadata.features.iter().map(|name| Feature::from_name(name)).collect();
        if !features.iter().copied().eq(spec.features.iter().copied().map(Some)) {
            return Err(persistence_error(format!(
                "feature list {:?} does not match this model",
                metadata.features
            )));
        }
        if metadata.hidden_width != spec.hidden_width {
            return Err(persistence_error("network shape mismatch".to_string()));
        }
        let dim = spec.features.len();
        if metadata.scaler.dim() != dim || metadata.scaler.std.len() != dim {
            return Err(persistence_error("scaler dimension mismatch".to_string()));
        }
        let wants_target = spec.objective == Objective::MeanSquaredError;
        if metadata.target.is_some() != wants_target {
            return Err(persistence_error("target scaling mismatch".to_string()));
        }

        let net = PredictorNet::<InferenceBackend>::load(
            &Default::default(),
            &spec.weights_path(dir),
            spec.net_config(),
        )
        .map_err(|e| persistence_error(e.to_string()))?;

        *self.state_mut() = ModelState::Loaded {
            fitted: FittedModel {
                features: spec.features.to_vec(),
                net,
                scaler: metadata.scaler,
                target: metadata.target,
            },
            metrics: metadata.metrics,
        };
        log::info!("Loaded {} from {}", spec.name, dir.display());
        Ok(true)
    }
}

/// Fit a model described by `spec` on the rows of `set`
fn fit(
    spec: &ModelSpec,
    set: &TrainingSet,
    config: &TrainingConfig,
) -> Result<(FittedModel, TrainingMetrics)> {
    let training_error = |message: String| ApexError::Training {
        model: spec.name.to_string(),
        message,
    };

    if set.is_empty() {
        return Err(training_error("training set is empty".to_string()));
    }
    let targets = set.label_column(spec.label).ok_or_else(|| {
        training_error(format!("label {} is missing or non-finite", spec.label.name()))
    })?;

    let rows: Vec<Vec<f32>> = set.rows().iter().map(|r| r.features.select(spec.features)).collect();
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(training_error("non-finite feature value".to_string()));
    }

    let split = train_held_out_split(rows.len(), config.held_out_fraction, config.seed);
    let pick_rows = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect::<Vec<_>>();
    let pick_targets = |idx: &[usize]| idx.iter().map(|&i| targets[i]).collect::<Vec<_>>();

    let train_x = pick_rows(&split.train);
    let train_y = pick_targets(&split.train);

    let scaler = FeatureScaler::fit(&train_x)
        .ok_or_else(|| training_error("no rows to fit the scaler".to_string()))?;
    let scaled: Vec<Vec<f32>> = train_x.iter().map(|r| scaler.transform_row(r)).collect();

    let target = match spec.objective {
        Objective::BinaryCrossEntropy => None,
        Objective::MeanSquaredError => Some(
            TargetScaler::fit(&train_y)
                .ok_or_else(|| training_error("no targets to fit".to_string()))?,
        ),
    };
    let fit_targets: Vec<f32> = match target {
        Some(t) => train_y.iter().map(|v| t.normalize(*v)).collect(),
        None => train_y.clone(),
    };

    log::info!(
        "Training {} on {} rows ({} held out)",
        spec.name,
        split.train.len(),
        split.held_out.len()
    );

    let net = fit_network(
        spec.name,
        spec.net_config(),
        &scaled,
        &fit_targets,
        spec.objective,
        FitConfig::from(config),
    )?;

    let fitted = FittedModel {
        features: spec.features.to_vec(),
        net,
        scaler,
        target,
    };

    let metric = spec.metric();
    let train_score = metric
        .evaluate(&fitted.predict_rows(&train_x)?, &train_y)
        .ok_or_else(|| training_error("could not score training rows".to_string()))?;
    let held_out = if split.held_out.is_empty() {
        None
    } else {
        let held_x = pick_rows(&split.held_out);
        metric.evaluate(&fitted.predict_rows(&held_x)?, &pick_targets(&split.held_out))
    };

    let metrics = TrainingMetrics {
        kind: metric,
        train: train_score,
        held_out,
        train_rows: split.train.len(),
        held_out_rows: split.held_out.len(),
    };
    Ok((fitted, metrics))
}
