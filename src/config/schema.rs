//! YAML schema definitions for declarative training configuration

use serde::{Deserialize, Serialize};

/// Complete training specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSpec {
    /// Network architecture
    pub model: ModelSpec,

    /// Optimizer configuration
    pub optimizer: OptimSpec,

    /// Training hyperparameters
    #[serde(default)]
    pub training: TrainingParams,
}

/// Multi-layer perceptron classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Width of each input row
    pub input_features: usize,

    /// Widths of the hidden layers, each followed by a ReLU
    #[serde(default)]
    pub hidden_layers: Vec<usize>,

    /// Number of output classes
    pub num_classes: usize,

    /// What the final layer emits
    #[serde(default)]
    pub output: OutputKind,
}

/// Head of the network, which also picks the matching loss
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Log-probabilities, trained with negative log-likelihood
    #[default]
    LogSoftmax,
    /// Raw scores, trained with cross-entropy
    Logits,
}

/// Optimizer specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Optimizer name: "sgd" | "adam"
    pub name: String,

    /// Learning rate
    pub lr: f32,

    /// SGD momentum (0 disables it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f32>,

    /// Adam first-moment decay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta1: Option<f32>,

    /// Adam second-moment decay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta2: Option<f32>,

    /// Adam denominator term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f32>,
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Number of epochs
    pub epochs: usize,

    /// Examples per mini-batch
    pub batch_size: usize,

    /// Gradient clipping threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_grad_norm: Option<f32>,

    /// Log every N steps
    pub log_interval: usize,

    /// Mini-batches summed per optimizer step
    pub gradient_accumulation_steps: usize,

    /// Seed for parameter initialization (thread RNG when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            max_grad_norm: None,
            log_interval: 10,
            gradient_accumulation_steps: 1,
            seed: None,
        }
    }
}
