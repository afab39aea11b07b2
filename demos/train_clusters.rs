//! Example: Training a classifier from YAML
//!
//! Builds an MLP from a declarative config, trains it on synthetic clusters
//! and prints the class probabilities of one example.
//!
//! Run with `RUST_LOG=gradiente=debug` for per-step logs.

use gradiente::config::{build_trainer, parse_config};
use gradiente::train::{argmax_rows, synthetic::ClusterSpec, EarlyStopping, ProgressCallback};
use gradiente::Tensor;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
model:
  input_features: 16
  hidden_layers: [32]
  num_classes: 10
  output: log_softmax

optimizer:
  name: sgd
  lr: 0.05
  momentum: 0.9

training:
  epochs: 5
  batch_size: 16
  max_grad_norm: 5.0
  log_interval: 20
  seed: 42
"#;

fn main() -> gradiente::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== Training Example ===\n");

    let spec = parse_config(CONFIG)?;
    let clusters = ClusterSpec::new(spec.model.input_features, spec.model.num_classes);
    let train = clusters.generate(640, spec.training.batch_size, 1)?;
    let test = clusters.generate(160, spec.training.batch_size, 2)?;

    let mut trainer = build_trainer(&spec)?;
    trainer.add_callback(ProgressCallback::new(1));
    trainer.add_callback(EarlyStopping::new(2, 1e-4));

    println!("Model: {:?}", trainer.model());
    println!(
        "Optimizer: {} (lr={})\n",
        spec.optimizer.name, spec.optimizer.lr
    );

    let result = trainer.train(spec.training.epochs, || train.clone())?;
    println!(
        "\nTrained {} epochs in {:.2}s, final loss {:.4} (best {:.4})",
        result.final_epoch, result.elapsed_secs, result.final_loss, result.best_loss
    );

    let eval = trainer.evaluate(test.clone())?;
    println!(
        "Test loss {:.4}, accuracy {:.1}% over {} examples",
        eval.loss,
        eval.accuracy * 100.0,
        eval.samples
    );

    let sample = &test[0];
    let features = spec.model.input_features;
    let row = sample.inputs.data().as_slice().map(|data| data[..features].to_vec());
    if let Some(row) = row {
        let log_probs = trainer.predict(&Tensor::from_shape_vec(&[1, features], row, false)?)?;
        let predicted = argmax_rows(&log_probs)[0];

        println!("\nFirst test example (label {}):", sample.labels[0]);
        for (class, lp) in log_probs.data().iter().enumerate() {
            let marker = if class == predicted { " <-" } else { "" };
            println!("  class {class}: p = {:.4}{marker}", lp.exp());
        }
    }

    Ok(())
}
