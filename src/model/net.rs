//! Feed-forward network shared by the three predictors
//!
//! Architecture: Input(d) → [Hidden(w) → ReLU] → head(1)
//!
//! Without a hidden block the network is a plain linear model, which is what
//! the outcome classifier uses (logistic regression once a sigmoid is applied).

use std::path::Path;

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::{ApexError, Result};

/// Shape of a [`PredictorNet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    pub input_dim: usize,
    /// Width of the single hidden layer, None for a linear model
    pub hidden_width: Option<usize>,
}

/// Linear → ReLU
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        relu(self.linear.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct PredictorNet<B: Backend> {
    hidden: Option<HiddenBlock<B>>,
    head: Linear<B>,
}

impl<B: Backend> PredictorNet<B> {
    pub fn new(device: &B::Device, config: NetConfig) -> Self {
        let (hidden, head_input_dim) = match config.hidden_width {
            Some(width) => (
                Some(HiddenBlock::new(device, config.input_dim, width)),
                width,
            ),
            None => (None, config.input_dim),
        };

        PredictorNet {
            hidden,
            head: LinearConfig::new(head_input_dim, 1).init(device),
        }
    }

    /// Raw output [batch, 1]: a logit for the classifier, a standardised value for regressors
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = match &self.hidden {
            Some(hidden) => hidden.forward(x),
            None => x,
        };
        self.head.forward(x)
    }

    /// Save weights to `<path>.mpk`
    pub fn save(&self, path: &Path) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.to_path_buf())
            .map_err(|e| record_error(path, e))
    }

    /// Load weights from `<path>.mpk` into a network of the given shape
    pub fn load(device: &B::Device, path: &Path, config: NetConfig) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| record_error(path, e))?;

        Ok(Self::new(device, config).load_record(record))
    }
}

fn record_error(path: &Path, err: impl std::fmt::Display) -> ApexError {
    ApexError::Persistence {
        model: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        message: err.to_string(),
    }
}
