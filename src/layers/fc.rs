//! Fully-connected layer
//!
//! Each example's `(W, H, D)` input is flattened into a single row index
//! `z * (W * H) + y * W + x`, which addresses the first axis of the weight
//! matrix `(W * H * D, units, 1, 1)`. The output of an example is
//! `(units, 1, 1)`.

use crate::error::Result;
use crate::gradient::Gradient;
use crate::layers::{check_shape, Layer, LayerKind, LayerOptions, LayerState};
use crate::optimizers::Optimizer;
use crate::tensor::{Shape, Tensor};
use crate::utils::SimpleRng;
use log::{debug, trace};

/// Fully-connected layer without bias.
///
/// Unlike the convolution layer it keeps one [`Gradient`] per example and
/// output unit (the upstream gradient); weight gradients are formed from
/// those at update time.
///
/// # Example
///
/// ```ignore
/// use binary_cnn::layers::{FcLayer, LayerOptions};
/// use binary_cnn::tensor::Shape;
/// use binary_cnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = FcLayer::new(Shape::new(4, 7, 7, 8), 2, LayerOptions::default(), &mut rng);
/// assert_eq!(layer.weights().shape(), Shape::new(392, 2, 1, 1));
/// ```
#[derive(Debug, Clone)]
pub struct FcLayer {
    input: Tensor<f64>,
    output: Tensor<f64>,
    grads_in: Tensor<f64>,
    weights: Tensor<f64>,
    gradients: Tensor<Gradient>,
    options: LayerOptions,
    state: LayerState,
}

impl FcLayer {
    /// Create a fully-connected layer with triangularly distributed weights in [-1, 1].
    ///
    /// # Arguments
    ///
    /// * `in_size` - Input shape `(examples, width, height, depth)`
    /// * `out_size` - Number of output units
    /// * `options` - Clipping, momentum and debug switches
    /// * `rng` - Random number generator for weight initialization
    ///
    /// # Panics
    ///
    /// Panics if `out_size` is zero or the input has an empty axis.
    pub fn new(in_size: Shape, out_size: usize, options: LayerOptions, rng: &mut SimpleRng) -> Self {
        assert!(out_size > 0, "fc layer needs at least one output unit");
        assert!(
            in_size.per_example() > 0,
            "fc input {} has an empty axis",
            in_size
        );

        let rows = in_size.per_example();
        let mut weights = Tensor::new(Shape::new(rows, out_size, 1, 1));
        for i in 0..out_size {
            for h in 0..rows {
                weights[(h, i, 0, 0)] = rng.triangular();
            }
        }

        if options.debug {
            debug!("fc weights after init:\n{}", weights);
        }

        Self {
            input: Tensor::new(in_size),
            output: Tensor::new(Shape::new(in_size.m, out_size, 1, 1)),
            grads_in: Tensor::new(in_size),
            weights,
            gradients: Tensor::new(Shape::new(in_size.m, out_size, 1, 1)),
            options,
            state: LayerState::Fresh,
        }
    }

    /// Row of the weight matrix fed by input cell `(x, y, z)`.
    pub fn flatten_index(&self, x: usize, y: usize, z: usize) -> usize {
        let s = self.input.shape();
        z * (s.x * s.y) + y * s.x + x
    }

    /// Inverse of [`flatten_index`](Self::flatten_index).
    pub fn unflatten_index(&self, row: usize) -> (usize, usize, usize) {
        let s = self.input.shape();
        let plane = s.x * s.y;
        let z = row / plane;
        let rest = row % plane;
        (rest % s.x, rest / s.x, z)
    }

    /// Get the number of output units.
    pub fn units(&self) -> usize {
        self.output.shape().x
    }

    /// Get the clipping, momentum and debug switches.
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Get the weight matrix `(W * H * D, units, 1, 1)`.
    pub fn weights(&self) -> &Tensor<f64> {
        &self.weights
    }

    /// Direct access to the weight matrix, e.g. to load known weights.
    pub fn weights_mut(&mut self) -> &mut Tensor<f64> {
        &mut self.weights
    }

    /// Per-example, per-unit upstream gradients with their momentum carry.
    pub fn gradients(&self) -> &Tensor<Gradient> {
        &self.gradients
    }

    /// Get the cached input of the last forward pass.
    pub fn input(&self) -> &Tensor<f64> {
        &self.input
    }

    /// Get the output of the last forward pass.
    pub fn output(&self) -> &Tensor<f64> {
        &self.output
    }

    /// Get the gradient w.r.t. the input from the last backward pass.
    pub fn grads_in(&self) -> &Tensor<f64> {
        &self.grads_in
    }

    fn activate(&mut self) {
        let in_shape = self.input.shape();
        let units = self.output.shape().x;

        for e in 0..in_shape.m {
            for n in 0..units {
                let mut inputv = 0.0;
                for z in 0..in_shape.z {
                    for j in 0..in_shape.y {
                        for i in 0..in_shape.x {
                            let m = self.flatten_index(i, j, z);
                            inputv += self.input[(e, i, j, z)] * self.weights[(m, n, 0, 0)];
                        }
                    }
                }
                self.output[(e, n, 0, 0)] = inputv;
            }
        }
    }

    fn calc_grads(&mut self, grad_next: &Tensor<f64>) {
        self.grads_in.zero();

        let in_shape = self.input.shape();
        let units = self.output.shape().x;
        let clip = self.options.clip;

        for e in 0..in_shape.m {
            for n in 0..units {
                // Overwritten, not accumulated: one upstream value per cell.
                let grad = grad_next[(e, n, 0, 0)];
                self.gradients[(e, n, 0, 0)].grad = grad;

                for i in 0..in_shape.x {
                    for j in 0..in_shape.y {
                        for z in 0..in_shape.z {
                            let m = self.flatten_index(i, j, z);
                            let w = self.weights[(m, n, 0, 0)];
                            let cell = &mut self.grads_in[(e, i, j, z)];
                            *cell += grad * w;
                            clip.apply(cell);
                        }
                    }
                }
            }
        }
    }
}

impl Layer for FcLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::FullyConnected
    }

    fn forward(&mut self, input: &Tensor<f64>) -> Result<&Tensor<f64>> {
        check_shape("fc forward input", self.input.shape(), input.shape())?;
        self.input.copy_from(input)?;
        self.activate();
        self.state = LayerState::Forwarded;
        trace!("fc forward: {} -> {}", input.shape(), self.output.shape());

        if self.options.debug {
            debug!("fc output:\n{}", self.output);
        }
        Ok(&self.output)
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> Result<&Tensor<f64>> {
        self.state.check_backward(LayerKind::FullyConnected)?;
        check_shape("fc upstream gradient", self.output.shape(), grad_next.shape())?;
        self.calc_grads(grad_next);
        self.state = LayerState::Backpropagated;

        if self.options.debug {
            debug!("fc grads_in:\n{}", self.grads_in);
        }
        Ok(&self.grads_in)
    }

    // dW[row, n] = sum over examples of upstream[e, n] * input[e, row]; the
    // momentum carry advances once per (example, unit) cell, not per weight.
    fn update_parameters(&mut self, optimizer: &dyn Optimizer, learning_rate: f64) -> Result<()> {
        self.state.check_update(LayerKind::FullyConnected)?;

        let in_shape = self.input.shape();
        let units = self.output.shape().x;
        let examples = self.output.shape().m;
        let use_momentum = self.options.use_momentum;

        for n in 0..units {
            for i in 0..in_shape.x {
                for j in 0..in_shape.y {
                    for z in 0..in_shape.z {
                        let m = self.flatten_index(i, j, z);

                        let mut grad_sum = Gradient::default();
                        for e in 0..examples {
                            let weight_grad = self.gradients[(e, n, 0, 0)] * self.input[(e, i, j, z)];
                            grad_sum = weight_grad + grad_sum;
                        }

                        let w = &mut self.weights[(m, n, 0, 0)];
                        *w = optimizer.update_weight(*w, &grad_sum, 1.0, use_momentum, learning_rate);
                    }
                }
            }
            for e in 0..examples {
                optimizer.update_gradient(&mut self.gradients[(e, n, 0, 0)]);
            }
        }
        self.state = LayerState::Updated;

        if self.options.debug {
            debug!("fc weights after update:\n{}", self.weights);
        }
        Ok(())
    }

    fn input_shape(&self) -> Shape {
        self.input.shape()
    }

    fn output_shape(&self) -> Shape {
        self.output.shape()
    }

    fn parameter_count(&self) -> usize {
        self.weights.shape().len()
    }

    fn state(&self) -> LayerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CnnError;
    use crate::optimizers::{GradientClip, MomentumSgd};
    use approx::assert_relative_eq;

    fn no_clip() -> LayerOptions {
        LayerOptions {
            clip: GradientClip::disabled(),
            ..LayerOptions::default()
        }
    }

    #[test]
    fn test_fc_layer_creation() {
        let mut rng = SimpleRng::new(42);
        let layer = FcLayer::new(Shape::new(3, 4, 2, 2), 5, no_clip(), &mut rng);

        assert_eq!(layer.weights().shape(), Shape::new(16, 5, 1, 1));
        assert_eq!(layer.output_shape(), Shape::new(3, 5, 1, 1));
        assert_eq!(layer.gradients().shape(), Shape::new(3, 5, 1, 1));
        assert_eq!(layer.parameter_count(), 80);
        assert_eq!(layer.units(), 5);
    }

    #[test]
    #[should_panic(expected = "at least one output unit")]
    fn test_zero_units_panics() {
        let mut rng = SimpleRng::new(42);
        FcLayer::new(Shape::new(1, 2, 2, 1), 0, no_clip(), &mut rng);
    }

    #[test]
    #[should_panic(expected = "has an empty axis")]
    fn test_empty_input_panics() {
        let mut rng = SimpleRng::new(42);
        FcLayer::new(Shape::new(1, 0, 2, 1), 2, no_clip(), &mut rng);
    }

    #[test]
    fn test_flatten_round_trip_over_grid() {
        let mut rng = SimpleRng::new(42);
        let layer = FcLayer::new(Shape::new(1, 3, 2, 4), 1, no_clip(), &mut rng);
        for row in 0..24 {
            let (x, y, z) = layer.unflatten_index(row);
            assert_eq!(layer.flatten_index(x, y, z), row);
        }
        assert_eq!(layer.flatten_index(2, 1, 3), 3 * 6 + 3 + 2);
    }

    #[test]
    fn test_forward_is_dot_product() {
        let mut rng = SimpleRng::new(7);
        let mut layer = FcLayer::new(Shape::new(1, 2, 1, 1), 2, no_clip(), &mut rng);
        let w = layer.weights_mut();
        w[(0, 0, 0, 0)] = 1.0;
        w[(1, 0, 0, 0)] = 2.0;
        w[(0, 1, 0, 0)] = -1.0;
        w[(1, 1, 0, 0)] = 0.5;

        let input = Tensor::from_vec(Shape::new(1, 2, 1, 1), vec![3.0, 4.0]).unwrap();
        let out = layer.forward(&input).unwrap();
        assert_relative_eq!(out[(0, 0, 0, 0)], 11.0);
        assert_relative_eq!(out[(0, 1, 0, 0)], -1.0);
    }

    #[test]
    fn test_backward_overwrites_unit_gradient() {
        let mut rng = SimpleRng::new(7);
        let mut layer = FcLayer::new(Shape::new(1, 2, 1, 1), 1, no_clip(), &mut rng);
        let input = Tensor::from_vec(Shape::new(1, 2, 1, 1), vec![1.0, 1.0]).unwrap();
        layer.forward(&input).unwrap();

        let first = Tensor::from_vec(Shape::new(1, 1, 1, 1), vec![5.0]).unwrap();
        layer.backward(&first).unwrap();
        let second = Tensor::from_vec(Shape::new(1, 1, 1, 1), vec![-2.0]).unwrap();
        layer.backward(&second).unwrap();

        assert_eq!(layer.gradients()[(0, 0, 0, 0)].grad, -2.0);
        assert_relative_eq!(
            layer.grads_in()[(0, 1, 0, 0)],
            -2.0 * layer.weights()[(1, 0, 0, 0)]
        );
    }

    #[test]
    fn test_update_sums_over_examples() {
        let mut rng = SimpleRng::new(7);
        let mut layer = FcLayer::new(Shape::new(2, 1, 1, 1), 1, no_clip(), &mut rng);
        layer.weights_mut().fill(1.0);

        let input = Tensor::from_vec(Shape::new(2, 1, 1, 1), vec![2.0, 3.0]).unwrap();
        layer.forward(&input).unwrap();
        let upstream = Tensor::from_vec(Shape::new(2, 1, 1, 1), vec![1.0, -1.0]).unwrap();
        layer.backward(&upstream).unwrap();

        let sgd = MomentumSgd::new(0.5, 0.0);
        layer.update_parameters(&sgd, 0.1).unwrap();
        // dW = 1 * 2 + (-1) * 3 = -1
        assert_relative_eq!(layer.weights()[(0, 0, 0, 0)], 1.1, epsilon = 1e-12);
        // momentum carry advanced per example cell
        assert_relative_eq!(layer.gradients()[(0, 0, 0, 0)].oldgrad, 1.0);
        assert_relative_eq!(layer.gradients()[(1, 0, 0, 0)].oldgrad, -1.0);
    }

    #[test]
    fn test_update_twice_is_rejected() {
        let mut rng = SimpleRng::new(7);
        let mut layer = FcLayer::new(Shape::new(1, 1, 1, 1), 1, no_clip(), &mut rng);
        let sgd = MomentumSgd::default();

        assert!(layer.update_parameters(&sgd, 0.1).is_err());

        let input = Tensor::from_vec(Shape::new(1, 1, 1, 1), vec![1.0]).unwrap();
        layer.forward(&input).unwrap();
        let upstream = Tensor::from_vec(Shape::new(1, 1, 1, 1), vec![1.0]).unwrap();
        layer.backward(&upstream).unwrap();
        layer.update_parameters(&sgd, 0.1).unwrap();

        assert!(matches!(
            layer.update_parameters(&sgd, 0.1),
            Err(CnnError::StateViolation { operation: "update", .. })
        ));
    }
}
