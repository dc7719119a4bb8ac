//! Evaluation metrics reported after training

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric a model is scored with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Fraction of correct home-win calls at a 0.5 threshold
    Accuracy,
    /// Mean absolute error in points
    MeanAbsoluteError,
}

impl MetricKind {
    pub fn evaluate(&self, predictions: &[f32], targets: &[f32]) -> Option<f32> {
        match self {
            MetricKind::Accuracy => accuracy(predictions, targets),
            MetricKind::MeanAbsoluteError => mean_absolute_error(predictions, targets),
        }
    }
}

/// Train and held-out scores for a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub kind: MetricKind,
    pub train: f32,
    /// None when the held-out partition was empty
    pub held_out: Option<f32>,
    pub train_rows: usize,
    pub held_out_rows: usize,
}

impl fmt::Display for TrainingMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: f32| match self.kind {
            MetricKind::Accuracy => format!("accuracy={:.1}%", v * 100.0),
            MetricKind::MeanAbsoluteError => format!("mae={:.2}", v),
        };
        write!(f, "train {} ({} rows)", show(self.train), self.train_rows)?;
        match self.held_out {
            Some(v) => write!(f, ", held-out {} ({} rows)", show(v), self.held_out_rows),
            None => write!(f, ", no held-out rows"),
        }
    }
}

/// Fraction of probabilities on the same side of 0.5 as their 0/1 target
pub fn accuracy(probs: &[f32], targets: &[f32]) -> Option<f32> {
    if probs.is_empty() || probs.len() != targets.len() {
        return None;
    }
    let correct = probs
        .iter()
        .zip(targets.iter())
        .filter(|(p, t)| (**p > 0.5) == (**t > 0.5))
        .count();
    Some(correct as f32 / probs.len() as f32)
}

pub fn mean_absolute_error(predictions: &[f32], targets: &[f32]) -> Option<f32> {
    if predictions.is_empty() || predictions.len() != targets.len() {
        return None;
    }
    let total: f32 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .sum();
    Some(total / predictions.len() as f32)
}
