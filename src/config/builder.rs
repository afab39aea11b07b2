//! Build training components from configuration

use super::schema::{ModelSpec, OptimSpec, OutputKind, TrainSpec, TrainingParams};
use crate::error::{Error, Result};
use crate::nn::{Linear, LogSoftmax, Module, ReLU, Sequential};
use crate::optim::{Adam, Optimizer, SGD};
use crate::train::{CrossEntropyLoss, LossFn, NLLLoss, TrainConfig, Trainer};
use crate::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Build the classifier described by `spec`
///
/// Parameters come from a `StdRng` seeded with `training.seed` when one is
/// given, otherwise from the thread RNG.
pub fn build_model(spec: &TrainSpec) -> Result<Sequential> {
    match spec.training.seed {
        Some(seed) => build_model_with_rng(&spec.model, &mut StdRng::seed_from_u64(seed)),
        None => build_model_with_rng(&spec.model, &mut rand::rng()),
    }
}

/// Build the classifier drawing initial parameters from `rng`
///
/// Layout: `Linear → ReLU` for every hidden width, a final `Linear` to
/// `num_classes`, then `LogSoftmax` unless the head emits logits.
pub fn build_model_with_rng<R: Rng + ?Sized>(spec: &ModelSpec, rng: &mut R) -> Result<Sequential> {
    let mut model = Sequential::new();
    let mut width = spec.input_features;

    for &hidden in &spec.hidden_layers {
        model.push(Box::new(Linear::with_rng(width, hidden, rng)?));
        model.push(Box::new(ReLU));
        width = hidden;
    }
    model.push(Box::new(Linear::with_rng(width, spec.num_classes, rng)?));

    if spec.output == OutputKind::LogSoftmax {
        model.push(Box::new(LogSoftmax));
    }

    tracing::debug!(
        layers = ?model.layer_names(),
        parameters = model.num_parameters(),
        "built model"
    );
    Ok(model)
}

/// Build optimizer from configuration over `params`
pub fn build_optimizer(spec: &OptimSpec, params: Vec<Tensor>) -> Result<Box<dyn Optimizer>> {
    match spec.name.to_lowercase().as_str() {
        "sgd" => {
            let momentum = spec.momentum.unwrap_or(0.0);
            Ok(Box::new(SGD::new(params, spec.lr).with_momentum(momentum)))
        }
        "adam" => {
            let beta1 = spec.beta1.unwrap_or(0.9);
            let beta2 = spec.beta2.unwrap_or(0.999);
            let eps = spec.epsilon.unwrap_or(1e-8);
            Ok(Box::new(Adam::new(params, spec.lr, beta1, beta2, eps)))
        }
        name => Err(Error::ConfigError(format!(
            "Unknown optimizer: {}. Supported: sgd, adam",
            name
        ))),
    }
}

/// Pick the loss matching the model head
///
/// A log-softmax head is paired with NLL; a logits head with cross-entropy,
/// which applies log-softmax itself.
pub fn build_loss(spec: &ModelSpec) -> Box<dyn LossFn> {
    match spec.output {
        OutputKind::LogSoftmax => Box::new(NLLLoss),
        OutputKind::Logits => Box::new(CrossEntropyLoss),
    }
}

/// Translate training hyperparameters into a [`TrainConfig`]
pub fn build_train_config(params: &TrainingParams) -> TrainConfig {
    let config = TrainConfig::new()
        .with_log_interval(params.log_interval)
        .with_gradient_accumulation(params.gradient_accumulation_steps);

    match params.max_grad_norm {
        Some(max_norm) => config.with_grad_clip(max_norm),
        None => config.without_grad_clip(),
    }
}

/// Assemble model, optimizer, loss, and loop settings into a [`Trainer`]
pub fn build_trainer(spec: &TrainSpec) -> Result<Trainer<Sequential>> {
    let model = build_model(spec)?;
    let optimizer = build_optimizer(&spec.optimizer, model.parameters())?;
    let loss_fn = build_loss(&spec.model);
    let config = build_train_config(&spec.training);

    tracing::info!(
        optimizer = %spec.optimizer.name,
        lr = spec.optimizer.lr,
        loss = loss_fn.name(),
        "assembled trainer"
    );
    Ok(Trainer::new(model, optimizer, loss_fn, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_spec(hidden: Vec<usize>, output: OutputKind) -> ModelSpec {
        ModelSpec {
            input_features: 4,
            hidden_layers: hidden,
            num_classes: 3,
            output,
        }
    }

    fn optim_spec(name: &str) -> OptimSpec {
        OptimSpec {
            name: name.to_string(),
            lr: 0.01,
            momentum: None,
            beta1: None,
            beta2: None,
            epsilon: None,
        }
    }

    #[test]
    fn test_build_model_layout() {
        let mut rng = StdRng::seed_from_u64(0);
        let model =
            build_model_with_rng(&model_spec(vec![16, 8], OutputKind::LogSoftmax), &mut rng)
                .unwrap();

        assert_eq!(
            model.layer_names(),
            vec!["Linear", "ReLU", "Linear", "ReLU", "Linear", "LogSoftmax"]
        );
        // 4·16+16 + 16·8+8 + 8·3+3
        assert_eq!(model.num_parameters(), 80 + 136 + 27);
    }

    #[test]
    fn test_build_model_logits_head() {
        let mut rng = StdRng::seed_from_u64(0);
        let model =
            build_model_with_rng(&model_spec(vec![], OutputKind::Logits), &mut rng).unwrap();
        assert_eq!(model.layer_names(), vec!["Linear"]);

        let out = model.forward(&Tensor::zeros(&[2, 4], false)).unwrap();
        assert_eq!(out.shape(), vec![2, 3]);
    }

    #[test]
    fn test_build_model_seed_is_deterministic() {
        let yaml = r#"
model: { input_features: 4, hidden_layers: [5], num_classes: 3 }
optimizer: { name: sgd, lr: 0.1 }
training: { seed: 11 }
"#;
        let spec: TrainSpec = serde_yaml::from_str(yaml).unwrap();
        let a = build_model(&spec).unwrap();
        let b = build_model(&spec).unwrap();

        for (pa, pb) in a.parameters().iter().zip(b.parameters()) {
            assert_eq!(*pa.data(), *pb.data());
        }
    }

    #[test]
    fn test_build_model_rejects_zero_width() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = build_model_with_rng(&model_spec(vec![0], OutputKind::Logits), &mut rng);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_build_optimizer_sgd() {
        let mut spec = optim_spec("sgd");
        spec.momentum = Some(0.9);
        let param = Tensor::from_vec(vec![1.0, 2.0], true);

        let optimizer = build_optimizer(&spec, vec![param]).unwrap();
        assert_eq!(optimizer.lr(), 0.01);
        assert_eq!(optimizer.params().len(), 1);
    }

    #[test]
    fn test_build_optimizer_adam() {
        let mut spec = optim_spec("Adam");
        spec.beta1 = Some(0.8);
        let optimizer = build_optimizer(&spec, vec![]).unwrap();
        assert_eq!(optimizer.lr(), 0.01);
    }

    #[test]
    fn test_build_optimizer_unknown() {
        let result = build_optimizer(&optim_spec("rmsprop"), vec![]);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_build_loss_matches_head() {
        assert_eq!(build_loss(&model_spec(vec![], OutputKind::LogSoftmax)).name(), "NLL");
        assert_eq!(
            build_loss(&model_spec(vec![], OutputKind::Logits)).name(),
            "CrossEntropy"
        );
    }

    #[test]
    fn test_build_train_config() {
        let params = TrainingParams {
            max_grad_norm: Some(2.0),
            log_interval: 5,
            gradient_accumulation_steps: 4,
            ..TrainingParams::default()
        };
        let config = build_train_config(&params);
        assert_eq!(config.max_grad_norm, Some(2.0));
        assert_eq!(config.log_interval, 5);
        assert_eq!(config.gradient_accumulation_steps, 4);

        assert_eq!(build_train_config(&TrainingParams::default()), TrainConfig::default());
    }
}
