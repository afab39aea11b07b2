//! Configuration validation

use super::schema::TrainSpec;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid input features: {0} (must be > 0)")]
    InvalidInputFeatures(usize),

    #[error("Invalid hidden layer {index}: width {width} (must be > 0)")]
    InvalidHiddenLayer { index: usize, width: usize },

    #[error("Invalid number of classes: {0} (must be >= 2)")]
    InvalidNumClasses(usize),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid optimizer: {0} (must be one of: sgd, adam)")]
    InvalidOptimizer(String),

    #[error("Invalid momentum: {0} (must be in [0.0, 1.0))")]
    InvalidMomentum(f32),

    #[error("Invalid beta: {0} (must be in [0.0, 1.0))")]
    InvalidBeta(f32),

    #[error("Invalid epsilon: {0} (must be > 0.0)")]
    InvalidEpsilon(f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid gradient clip value: {0} (must be > 0.0)")]
    InvalidGradClip(f32),

    #[error("Invalid log interval: {0} (must be > 0)")]
    InvalidLogInterval(usize),

    #[error("Invalid gradient accumulation steps: {0} (must be > 0)")]
    InvalidAccumulationSteps(usize),
}

/// Validate a training specification
///
/// Checks:
/// - Layer widths are non-zero
/// - Numeric values are in valid ranges
/// - The optimizer name is known
pub fn validate_config(spec: &TrainSpec) -> Result<(), ValidationError> {
    let model = &spec.model;
    if model.input_features == 0 {
        return Err(ValidationError::InvalidInputFeatures(model.input_features));
    }
    if let Some(index) = model.hidden_layers.iter().position(|&w| w == 0) {
        return Err(ValidationError::InvalidHiddenLayer { index, width: 0 });
    }
    if model.num_classes < 2 {
        return Err(ValidationError::InvalidNumClasses(model.num_classes));
    }

    let optim = &spec.optimizer;
    // NaN fails every comparison, so test for the valid range
    if !(optim.lr > 0.0) {
        return Err(ValidationError::InvalidLearningRate(optim.lr));
    }
    match optim.name.to_lowercase().as_str() {
        "sgd" | "adam" => {}
        other => return Err(ValidationError::InvalidOptimizer(other.to_string())),
    }
    if let Some(momentum) = optim.momentum {
        if !(0.0..1.0).contains(&momentum) {
            return Err(ValidationError::InvalidMomentum(momentum));
        }
    }
    for beta in [optim.beta1, optim.beta2].into_iter().flatten() {
        if !(0.0..1.0).contains(&beta) {
            return Err(ValidationError::InvalidBeta(beta));
        }
    }
    if let Some(eps) = optim.epsilon {
        if !(eps > 0.0) {
            return Err(ValidationError::InvalidEpsilon(eps));
        }
    }

    let training = &spec.training;
    if training.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(training.batch_size));
    }
    if training.epochs == 0 {
        return Err(ValidationError::InvalidEpochs(training.epochs));
    }
    if let Some(clip) = training.max_grad_norm {
        if !(clip > 0.0) {
            return Err(ValidationError::InvalidGradClip(clip));
        }
    }
    if training.log_interval == 0 {
        return Err(ValidationError::InvalidLogInterval(training.log_interval));
    }
    if training.gradient_accumulation_steps == 0 {
        return Err(ValidationError::InvalidAccumulationSteps(
            training.gradient_accumulation_steps,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ModelSpec, OptimSpec, OutputKind, TrainingParams};

    fn valid_spec() -> TrainSpec {
        TrainSpec {
            model: ModelSpec {
                input_features: 4,
                hidden_layers: vec![8],
                num_classes: 3,
                output: OutputKind::LogSoftmax,
            },
            optimizer: OptimSpec {
                name: "sgd".to_string(),
                lr: 0.05,
                momentum: None,
                beta1: None,
                beta2: None,
                epsilon: None,
            },
            training: TrainingParams::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_spec()).is_ok());
    }

    #[test]
    fn test_zero_input_features() {
        let mut spec = valid_spec();
        spec.model.input_features = 0;
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidInputFeatures(0))
        ));
    }

    #[test]
    fn test_zero_hidden_width() {
        let mut spec = valid_spec();
        spec.model.hidden_layers = vec![8, 0, 4];
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidHiddenLayer { index: 1, width: 0 })
        ));
    }

    #[test]
    fn test_single_class_rejected() {
        let mut spec = valid_spec();
        spec.model.num_classes = 1;
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidNumClasses(1))
        ));
    }

    #[test]
    fn test_invalid_learning_rate() {
        for lr in [0.0, -0.1, f32::NAN] {
            let mut spec = valid_spec();
            spec.optimizer.lr = lr;
            assert!(matches!(
                validate_config(&spec),
                Err(ValidationError::InvalidLearningRate(_))
            ));
        }
    }

    #[test]
    fn test_unknown_optimizer() {
        let mut spec = valid_spec();
        spec.optimizer.name = "adamw".to_string();
        let err = validate_config(&spec).unwrap_err();
        assert!(err.to_string().contains("adamw"));
    }

    #[test]
    fn test_optimizer_name_is_case_insensitive() {
        for name in ["Adam", "SGD", "sgd"] {
            let mut spec = valid_spec();
            spec.optimizer.name = name.to_string();
            assert!(validate_config(&spec).is_ok(), "{name} rejected");
        }
    }

    #[test]
    fn test_momentum_range() {
        let mut spec = valid_spec();
        spec.optimizer.momentum = Some(0.9);
        assert!(validate_config(&spec).is_ok());

        spec.optimizer.momentum = Some(1.0);
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidMomentum(_))
        ));
    }

    #[test]
    fn test_adam_hyperparameters() {
        let mut spec = valid_spec();
        spec.optimizer.name = "adam".to_string();
        spec.optimizer.beta2 = Some(1.5);
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidBeta(_))
        ));

        spec.optimizer.beta2 = Some(0.999);
        spec.optimizer.epsilon = Some(0.0);
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidEpsilon(_))
        ));
    }

    #[test]
    fn test_training_params() {
        let mut spec = valid_spec();
        spec.training.batch_size = 0;
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidBatchSize(0))
        ));

        let mut spec = valid_spec();
        spec.training.epochs = 0;
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidEpochs(0))
        ));

        let mut spec = valid_spec();
        spec.training.max_grad_norm = Some(-1.0);
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidGradClip(_))
        ));

        let mut spec = valid_spec();
        spec.training.gradient_accumulation_steps = 0;
        assert!(matches!(
            validate_config(&spec),
            Err(ValidationError::InvalidAccumulationSteps(0))
        ));
    }
}
