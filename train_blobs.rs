// train_blobs.rs
// Trains conv -> fc on a synthetic binary task: a bright 2x2 blob placed in
// the left half (class 0) or the right half (class 1) of a noisy 8x8 image.
//
// Usage:
//   train_blobs [training.json] [architecture.json]
//
// Without arguments the built-in configuration below is used.
// Set RUST_LOG=debug together with "debug": true to dump every tensor.

use binary_cnn::architecture::{
    build_network, load_architecture, validate_architecture, ArchitectureConfig, InputConfig,
    LayerConfig,
};
use binary_cnn::config::{load_config, TrainingConfig};
use binary_cnn::tensor::{Shape, Tensor};
use binary_cnn::utils::SimpleRng;
use log::info;
use std::error::Error;
use std::time::Instant;

const IMG: usize = 8;
const BATCH: usize = 8;
const TRAIN_BATCHES: usize = 16;
const TEST_BATCHES: usize = 4;

fn default_architecture() -> ArchitectureConfig {
    ArchitectureConfig {
        input: InputConfig {
            examples: BATCH,
            width: IMG,
            height: IMG,
            depth: 1,
        },
        layers: vec![
            LayerConfig {
                layer_type: "conv".to_string(),
                stride: Some(2),
                extent: Some(2),
                filters: Some(4),
                output_size: None,
            },
            LayerConfig {
                layer_type: "fc".to_string(),
                stride: None,
                extent: None,
                filters: None,
                output_size: Some(2),
            },
        ],
    }
}

// The task needs one score per class: the network must end in (m, 2, 1, 1).
fn check_two_class_output(architecture: &ArchitectureConfig) -> Result<(), Box<dyn Error>> {
    let out = validate_architecture(architecture)?;
    let expected = Shape::new(architecture.input.examples, 2, 1, 1);
    if out != expected {
        return Err(format!(
            "architecture output {} does not match two-class scores {}",
            out, expected
        )
        .into());
    }
    Ok(())
}

// One batch of images plus one-hot targets.
fn make_batch(rng: &mut SimpleRng, shape: Shape) -> (Tensor<f64>, Tensor<f64>) {
    let mut images = Tensor::new(shape);
    let mut targets = Tensor::new(Shape::new(shape.m, 2, 1, 1));
    let half = shape.x / 2;

    for e in 0..shape.m {
        for v in 0..shape.per_example() {
            let x = v % shape.x;
            let y = (v / shape.x) % shape.y;
            let z = v / (shape.x * shape.y);
            images[(e, x, y, z)] = 0.1 * rng.next_f64();
        }

        let class = (rng.next_u32() % 2) as usize;
        let span = half.saturating_sub(1).max(1);
        let bx = (rng.next_u32() as usize % span) + class * half;
        let by = rng.next_u32() as usize % (shape.y - 1);
        for dx in 0..2 {
            for dy in 0..2 {
                let x = (bx + dx).min(shape.x - 1);
                for z in 0..shape.z {
                    images[(e, x, by + dy, z)] = 1.0;
                }
            }
        }
        targets[(e, class, 0, 0)] = 1.0;
    }

    (images, targets)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let training = match args.get(1) {
        Some(path) => load_config(path)?,
        None => TrainingConfig::default(),
    };
    let architecture = match args.get(2) {
        Some(path) => load_architecture(path)?,
        None => default_architecture(),
    };
    check_two_class_output(&architecture)?;

    let mut rng = SimpleRng::new(training.seed);
    let mut network = build_network(&architecture, &training, &mut rng)?;
    let optimizer = training.optimizer();
    info!(
        "network: {} layers, {} parameters",
        network.layers().len(),
        network.parameter_count()
    );

    let shape = architecture.input.shape();
    if shape.x < 4 || shape.y < 2 {
        return Err(format!("input {} is too small for the blob task", shape).into());
    }
    let mut data_rng = SimpleRng::new(training.seed.wrapping_add(1));
    let train: Vec<_> = (0..TRAIN_BATCHES)
        .map(|_| make_batch(&mut data_rng, shape))
        .collect();
    let test: Vec<_> = (0..TEST_BATCHES)
        .map(|_| make_batch(&mut data_rng, shape))
        .collect();

    for epoch in 0..training.epochs {
        let start = Instant::now();
        let mut total = 0.0;
        for (images, targets) in &train {
            total += network.train_step(images, targets, &optimizer, training.learning_rate)?;
        }
        info!(
            "epoch {:>3} | loss {:.6} | {:.3}s",
            epoch + 1,
            total / (TRAIN_BATCHES * shape.m) as f64,
            start.elapsed().as_secs_f64()
        );
    }

    let mut correct = 0usize;
    for (images, targets) in &test {
        let probabilities = network.predict(images)?;
        for e in 0..shape.m {
            let predicted = usize::from(probabilities[(e, 1, 0, 0)] > probabilities[(e, 0, 0, 0)]);
            if targets[(e, predicted, 0, 0)] == 1.0 {
                correct += 1;
            }
        }
    }
    info!(
        "test accuracy: {:.2}%",
        100.0 * correct as f64 / (TEST_BATCHES * shape.m) as f64
    );

    Ok(())
}
