//! Prediction and reconciliation
//!
//! Merge model outputs per matchup, batch-predict upcoming games and score
//! stored predictions once results are in.

pub mod generator;
pub mod manager;
pub mod reconcile;

pub use generator::{BatchReport, PredictionGenerator};
pub use manager::ModelManager;
pub use reconcile::{evaluate, ReconcileReport};
