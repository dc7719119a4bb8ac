//! Model training
//!
//! Train/held-out splitting, the gradient descent loop and evaluation metrics.

pub mod fit;
pub mod metrics;
pub mod split;

pub use fit::{fit_network, FitConfig, Objective};
pub use metrics::{MetricKind, TrainingMetrics};
pub use split::{train_held_out_split, Split};
