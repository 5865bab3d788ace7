//! End-to-end tests for the binary_cnn library
//!
//! This file tests the public API as a whole:
//! - Network: chaining, training steps, prediction
//! - Layer cycle ordering enforced through the network
//! - Momentum carry across steps
//! - Cross-entropy on network output

use approx::assert_relative_eq;
use binary_cnn::layers::{ConvLayer, FcLayer, Layer, LayerOptions, LayerState};
use binary_cnn::loss::cross_entropy;
use binary_cnn::network::Network;
use binary_cnn::optimizers::{GradientClip, MomentumSgd};
use binary_cnn::tensor::{Shape, Tensor};
use binary_cnn::utils::SimpleRng;
use binary_cnn::CnnError;

const IN: Shape = Shape::new(4, 4, 4, 1);

fn network(options: LayerOptions, seed: u64) -> Network {
    let mut rng = SimpleRng::new(seed);
    let mut net = Network::new();
    let conv = ConvLayer::new(1, 3, 3, IN, options, &mut rng);
    let fc = FcLayer::new(conv.output_shape(), 2, options, &mut rng);
    net.push(conv).unwrap();
    net.push(fc).unwrap();
    net
}

// Examples 0 and 2 light up the left column, 1 and 3 the right column.
fn batch() -> (Tensor<f64>, Tensor<f64>) {
    let mut images = Tensor::new(IN);
    let mut targets = Tensor::new(Shape::new(4, 2, 1, 1));
    for e in 0..4 {
        let class = e % 2;
        let x = if class == 0 { 0 } else { 3 };
        for y in 0..4 {
            images[(e, x, y, 0)] = 1.0;
        }
        targets[(e, class, 0, 0)] = 1.0;
    }
    (images, targets)
}

// ============================================================================
// Training Tests
// ============================================================================

mod training_tests {
    use super::*;

    #[test]
    fn test_training_lowers_loss() {
        let mut net = network(LayerOptions::default(), 42);
        let (images, targets) = batch();
        let optimizer = MomentumSgd::default();

        let first = net.train_step(&images, &targets, &optimizer, 0.05).unwrap();
        let mut last = first;
        for _ in 0..60 {
            last = net.train_step(&images, &targets, &optimizer, 0.05).unwrap();
        }
        assert!(last < first, "loss did not drop: {} -> {}", first, last);

        let probabilities = net.predict(&images).unwrap();
        for e in 0..4 {
            let class = e % 2;
            assert!(probabilities[(e, class, 0, 0)] > probabilities[(e, 1 - class, 0, 0)]);
        }
    }

    #[test]
    fn test_train_step_returns_loss_before_update() {
        let mut net = network(LayerOptions::default(), 3);
        let (images, targets) = batch();

        let probabilities = net.predict(&images).unwrap();
        let expected = cross_entropy(&probabilities, &targets).unwrap();
        let loss = net
            .train_step(&images, &targets, &MomentumSgd::default(), 0.01)
            .unwrap();
        assert_relative_eq!(loss, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_rows_sum_to_one() {
        let mut net = network(LayerOptions::default(), 5);
        let (images, _) = batch();
        let probabilities = net.predict(&images).unwrap();
        assert_eq!(probabilities.shape(), Shape::new(4, 2, 1, 1));
        for e in 0..4 {
            assert_relative_eq!(
                probabilities[(e, 0, 0, 0)] + probabilities[(e, 1, 0, 0)],
                1.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_training_without_target_fails() {
        let mut net = network(LayerOptions::default(), 5);
        let (images, _) = batch();
        let blank = Tensor::new(Shape::new(4, 2, 1, 1));
        assert!(matches!(
            net.train_step(&images, &blank, &MomentumSgd::default(), 0.01),
            Err(CnnError::MissingOneHotTarget { example: 0 })
        ));
    }
}

// ============================================================================
// Layer Cycle Tests
// ============================================================================

mod cycle_tests {
    use super::*;

    #[test]
    fn test_backward_before_forward_rejected() {
        let mut net = network(LayerOptions::default(), 1);
        let grad = Tensor::new(Shape::new(4, 2, 1, 1));
        assert!(matches!(
            net.backward(&grad),
            Err(CnnError::StateViolation {
                operation: "backward",
                state: LayerState::Fresh,
                ..
            })
        ));
    }

    #[test]
    fn test_update_requires_backward() {
        let mut net = network(LayerOptions::default(), 1);
        let (images, _) = batch();
        net.forward(&images).unwrap();
        let err = net
            .update_parameters(&MomentumSgd::default(), 0.01)
            .unwrap_err();
        assert!(matches!(
            err,
            CnnError::StateViolation {
                operation: "update",
                state: LayerState::Forwarded,
                ..
            }
        ));
    }

    #[test]
    fn test_layers_report_state_through_cycle() {
        let mut net = network(LayerOptions::default(), 1);
        let (images, targets) = batch();
        assert!(net.layers().iter().all(|l| l.state() == LayerState::Fresh));

        net.forward(&images).unwrap();
        assert!(net.layers().iter().all(|l| l.state() == LayerState::Forwarded));

        net.backward(&targets).unwrap();
        assert!(net
            .layers()
            .iter()
            .all(|l| l.state() == LayerState::Backpropagated));

        net.update_parameters(&MomentumSgd::default(), 0.01).unwrap();
        assert!(net.layers().iter().all(|l| l.state() == LayerState::Updated));
    }

    #[test]
    fn test_wrong_batch_shape_rejected() {
        let mut net = network(LayerOptions::default(), 1);
        let wrong = Tensor::new(Shape::new(4, 5, 5, 1));
        assert!(matches!(
            net.forward(&wrong),
            Err(CnnError::ShapeMismatch { .. })
        ));
    }
}

// ============================================================================
// Momentum Tests
// ============================================================================

mod momentum_tests {
    use super::*;

    fn weights_after(steps: usize, use_momentum: bool) -> Tensor<f64> {
        let options = LayerOptions {
            clip: GradientClip::default(),
            use_momentum,
            debug: false,
        };
        let mut net = network(options, 17);
        let (images, targets) = batch();
        for _ in 0..steps {
            net.train_step(&images, &targets, &MomentumSgd::default(), 0.05)
                .unwrap();
        }
        net.layers()[0].as_conv().unwrap().weights().clone()
    }

    #[test]
    fn test_first_step_ignores_carry() {
        // oldgrad starts at zero, so the flag cannot matter yet
        assert_eq!(weights_after(1, true), weights_after(1, false));
    }

    #[test]
    fn test_carry_changes_later_steps() {
        assert_ne!(weights_after(2, true), weights_after(2, false));
    }
}
