//! Predictor models
//!
//! Three independent models share one network shape and lifecycle:
//! - Outcome: home win probability (logistic regression)
//! - Spread: home minus away points (one hidden layer regressor)
//! - Total: combined points (one hidden layer regressor)

pub mod net;
pub mod outcome;
pub mod predictor;
pub mod scaler;
pub mod spread;
pub mod total;

use burn::backend::{Autodiff, NdArray};

pub use outcome::OutcomeModel;
pub use predictor::{FittedModel, ModelOutput, ModelSpec, ModelState, PredictorModel};
pub use spread::SpreadModel;
pub use total::TotalModel;

/// CPU backend used for inference and persisted weights
pub type InferenceBackend = NdArray<f32>;
pub type TrainingBackend = Autodiff<InferenceBackend>;
