//! Full-batch gradient descent for a [`PredictorNet`]

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};

use crate::model::net::{NetConfig, PredictorNet};
use crate::model::{InferenceBackend, TrainingBackend};
use crate::{ApexError, Result, TrainingConfig};

/// Loss minimised during fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Sigmoid on the raw output, cross-entropy against 0/1 targets
    BinaryCrossEntropy,
    MeanSquaredError,
}

impl Objective {
    pub fn loss<B: Backend>(&self, output: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            Objective::BinaryCrossEntropy => {
                let eps = 1e-7;
                let probs = sigmoid(output).clamp(eps, 1.0 - eps);
                let loss = targets.clone().neg() * probs.clone().log()
                    - (targets.neg() + 1.0) * (probs.neg() + 1.0).log();
                loss.mean()
            }
            Objective::MeanSquaredError => (output - targets).powf_scalar(2.0).mean(),
        }
    }
}

/// Optimiser settings for one fit
#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl From<&TrainingConfig> for FitConfig {
    fn from(config: &TrainingConfig) -> Self {
        FitConfig {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            seed: config.seed,
        }
    }
}

/// Fit a freshly initialised network on already-scaled inputs.
///
/// Returns the inference copy of the trained network.
pub fn fit_network(
    model_name: &str,
    net_config: NetConfig,
    inputs: &[Vec<f32>],
    targets: &[f32],
    objective: Objective,
    config: FitConfig,
) -> Result<PredictorNet<InferenceBackend>> {
    let training_error = |message: String| ApexError::Training {
        model: model_name.to_string(),
        message,
    };

    if inputs.is_empty() || inputs.len() != targets.len() {
        return Err(training_error(format!(
            "{} input rows for {} targets",
            inputs.len(),
            targets.len()
        )));
    }
    if inputs.iter().any(|r| r.len() != net_config.input_dim) {
        return Err(training_error(format!(
            "expected {} features per row",
            net_config.input_dim
        )));
    }

    TrainingBackend::seed(config.seed);
    let device = Default::default();

    let n = inputs.len();
    let flat: Vec<f32> = inputs.iter().flatten().copied().collect();
    let x = Tensor::<TrainingBackend, 2>::from_data(
        TensorData::new(flat, [n, net_config.input_dim]),
        &device,
    );
    let y = Tensor::<TrainingBackend, 2>::from_data(
        TensorData::new(targets.to_vec(), [n, 1]),
        &device,
    );

    let mut model = PredictorNet::<TrainingBackend>::new(&device, net_config);
    let mut optimizer = SgdConfig::new().init::<TrainingBackend, PredictorNet<TrainingBackend>>();

    log::debug!("Fitting {} on {} rows for {} epochs", model_name, n, config.epochs);

    for epoch in 0..config.epochs {
        let output = model.forward(x.clone());
        let loss = objective.loss(output, y.clone());

        if epoch % 100 == 0 || epoch + 1 == config.epochs {
            let loss_val: f32 = loss.clone().into_scalar().elem();
            log::debug!(
                "{} epoch {}/{}: loss={:.5}",
                model_name,
                epoch + 1,
                config.epochs,
                loss_val
            );
            if !loss_val.is_finite() {
                return Err(training_error(format!("loss diverged at epoch {}", epoch + 1)));
            }
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optimizer.step(config.learning_rate, model, grads);
    }

    Ok(model.valid())
}

/// Raw network outputs for scaled input rows
pub fn forward_rows<B: Backend>(net: &PredictorNet<B>, x: Tensor<B, 2>) -> Result<Vec<f32>> {
    net.forward(x)
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| ApexError::Inference(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(epochs: usize) -> FitConfig {
        FitConfig {
            epochs,
            learning_rate: 0.1,
            seed: 42,
        }
    }

    #[test]
    fn test_classifier_separates_classes() {
        let inputs = vec![vec![-1.0], vec![-0.5], vec![0.5], vec![1.0]];
        let targets = vec![0.0, 0.0, 1.0, 1.0];
        let net_config = NetConfig {
            input_dim: 1,
            hidden_width: None,
        };
        let net = fit_network(
            "test",
            net_config,
            &inputs,
            &targets,
            Objective::BinaryCrossEntropy,
            config(300),
        )
        .unwrap();

        let x = Tensor::<InferenceBackend, 2>::from_data(
            TensorData::new(vec![-1.0f32, 1.0], [2, 1]),
            &Default::default(),
        );
        let logits = forward_rows(&net, x).unwrap();
        assert!(logits[0] < 0.0 && logits[1] > 0.0);
    }

    #[test]
    fn test_regressor_learns_constant_target() {
        let inputs = vec![vec![0.0, 0.0]; 6];
        let targets = vec![1.5; 6];
        let net_config = NetConfig {
            input_dim: 2,
            hidden_width: Some(4),
        };
        let net = fit_network(
            "test",
            net_config,
            &inputs,
            &targets,
            Objective::MeanSquaredError,
            config(300),
        )
        .unwrap();

        let x = Tensor::<InferenceBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.0], [1, 2]),
            &Default::default(),
        );
        let out = forward_rows(&net, x).unwrap();
        assert!((out[0] - 1.5).abs() < 0.1, "got {}", out[0]);
    }

    #[test]
    fn test_rejects_mismatched_inputs() {
        let net_config = NetConfig {
            input_dim: 3,
            hidden_width: None,
        };
        let result = fit_network(
            "test",
            net_config,
            &[vec![1.0, 2.0]],
            &[1.0],
            Objective::MeanSquaredError,
            config(1),
        );
        assert!(matches!(result, Err(ApexError::Training { .. })));

        let empty = fit_network(
            "test",
            net_config,
            &[],
            &[],
            Objective::MeanSquaredError,
            config(1),
        );
        assert!(empty.is_err());
    }
}
