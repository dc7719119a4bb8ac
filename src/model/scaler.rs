//! Z-score scaling for features and regression targets

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use serde::{Deserialize, Serialize};

/// Per-column z-score transform fitted on the training partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureScaler {
    /// Fit on rows of equal width. Zero-variance columns get a std of 1.
    ///
    /// Returns None for an empty or ragged input.
    pub fn fit(rows: &[Vec<f32>]) -> Option<Self> {
        let dim = rows.first()?.len();
        if rows.iter().any(|r| r.len() != dim) {
            return None;
        }

        let n = rows.len() as f64;
        let mean: Vec<f64> = (0..dim)
            .map(|j| rows.iter().map(|r| r[j] as f64).sum::<f64>() / n)
            .collect();
        let std = mean
            .iter()
            .enumerate()
            .map(|(j, m)| {
                let variance = rows.iter().map(|r| (r[j] as f64 - m).powi(2)).sum::<f64>() / n;
                let sd = variance.sqrt();
                if sd < 1e-6 {
                    1.0
                } else {
                    sd as f32
                }
            })
            .collect();

        Some(FeatureScaler {
            mean: mean.iter().map(|m| *m as f32).collect(),
            std,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    /// Scale rows into a [n, d] tensor
    pub fn to_tensor<B: Backend>(&self, rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
        let flat: Vec<f32> = rows.iter().flat_map(|r| self.transform_row(r)).collect();
        Tensor::from_data(TensorData::new(flat, [rows.len(), self.dim()]), device)
    }
}

/// Standardisation of a regression target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetScaler {
    pub mean: f32,
    pub std: f32,
}

impl TargetScaler {
    /// Std is floored at 1 so a near-constant target does not blow up the scale
    pub fn fit(values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().map(|v| *v as f64).sum::<f64>() / n;
        let variance = values.iter().map(|v| (*v as f64 - mean).powi(2)).sum::<f64>() / n;

        Some(TargetScaler {
            mean: mean as f32,
            std: (variance.sqrt() as f32).max(1.0),
        })
    }

    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.mean) / self.std
    }

    pub fn denormalize(&self, value: f32) -> f32 {
        value * self.std + self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = FeatureScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        // Second column has no variance and scales by 1
        assert_eq!(scaler.std, vec![1.0, 1.0]);
        assert_eq!(scaler.transform_row(&[3.0, 12.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(FeatureScaler::fit(&[]).is_none());
        assert!(FeatureScaler::fit(&[vec![1.0], vec![1.0, 2.0]]).is_none());
        assert!(TargetScaler::fit(&[]).is_none());
    }

    #[test]
    fn test_target_scaler_inverse() {
        let scaler = TargetScaler::fit(&[190.0, 210.0, 230.0, 250.0]).unwrap();
        assert_eq!(scaler.mean, 220.0);
        let z = scaler.normalize(241.0);
        assert!((scaler.denormalize(z) - 241.0).abs() < 1e-4);

        let constant = TargetScaler::fit(&[10.0, 10.0]).unwrap();
        assert_eq!(constant.std, 1.0);
        assert_eq!(constant.normalize(12.0), 2.0);
    }
}
