//! Convolution layer
//!
//! Square filters slide over the input with a fixed stride and no padding.
//! Every filter reads all input channels and produces one output channel.
//! The backward pass walks the input grid and scatters each upstream
//! gradient into both the input gradient and the filter gradients, using
//! [`ReceptiveField::map_to_output`] to find the outputs an input cell fed.

use crate::error::Result;
use crate::gradient::Gradient;
use crate::layers::mapper::ReceptiveField;
use crate::layers::{check_shape, Layer, LayerKind, LayerOptions, LayerState};
use crate::optimizers::Optimizer;
use crate::tensor::{Point, Shape, Tensor};
use crate::utils::SimpleRng;
use log::{debug, trace};

/// Convolution layer with learnable filters and no bias.
///
/// # Fields
///
/// * `input` - Cached copy of the last forward input `(m, W, H, C)`
/// * `output` - Last forward output `(m, W', H', F)`
/// * `grads_in` - Gradient w.r.t. `input`, same shape as `input`
/// * `filters` - Weights `(F, extent, extent, C)`
/// * `filter_grads` - Accumulated gradient and momentum carry per weight
///
/// # Example
///
/// ```ignore
/// use binary_cnn::layers::{ConvLayer, LayerOptions};
/// use binary_cnn::tensor::Shape;
/// use binary_cnn::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// // 8 filters of 3x3, stride 1, over a batch of 4 grayscale 28x28 images
/// let layer = ConvLayer::new(1, 3, 8, Shape::new(4, 28, 28, 1), LayerOptions::default(), &mut rng);
/// assert_eq!(layer.output().shape(), Shape::new(4, 26, 26, 8));
/// ```
#[derive(Debug, Clone)]
pub struct ConvLayer {
    input: Tensor<f64>,
    output: Tensor<f64>,
    grads_in: Tensor<f64>,
    filters: Tensor<f64>,
    filter_grads: Tensor<Gradient>,
    mapper: ReceptiveField,
    options: LayerOptions,
    state: LayerState,
}

impl ConvLayer {
    /// Output size along one spatial axis, or `None` if the windows do not
    /// tile `input` exactly (or the geometry is degenerate).
    pub fn output_size(input: usize, extent: usize, stride: usize) -> Option<usize> {
        if stride == 0 || extent == 0 || extent > input {
            return None;
        }
        if (input - extent) % stride != 0 {
            return None;
        }
        Some((input - extent) / stride + 1)
    }

    /// Create a convolution layer with triangularly distributed weights in [-1, 1].
    ///
    /// # Arguments
    ///
    /// * `stride` - Step between consecutive windows
    /// * `extent` - Filter width and height
    /// * `filters` - Number of filters (output channels)
    /// * `in_size` - Input shape `(examples, width, height, channels)`
    /// * `options` - Clipping, momentum and debug switches
    /// * `rng` - Random number generator for weight initialization
    ///
    /// # Panics
    ///
    /// Panics if `filters` is zero, if the input has an empty axis, or if
    /// `(in_size - extent) / stride` is not an exact integer on either
    /// spatial axis. No partially built layer is returned.
    pub fn new(
        stride: usize,
        extent: usize,
        filters: usize,
        in_size: Shape,
        options: LayerOptions,
        rng: &mut SimpleRng,
    ) -> Self {
        assert!(filters > 0, "conv layer needs at least one filter");
        assert!(
            in_size.per_example() > 0,
            "conv input {} has an empty axis",
            in_size
        );

        let out_x = Self::output_size(in_size.x, extent, stride);
        let out_y = Self::output_size(in_size.y, extent, stride);
        assert!(
            out_x.is_some(),
            "conv width {} with extent {} and stride {} does not tile exactly",
            in_size.x,
            extent,
            stride
        );
        assert!(
            out_y.is_some(),
            "conv height {} with extent {} and stride {} does not tile exactly",
            in_size.y,
            extent,
            stride
        );
        let (out_x, out_y) = (out_x.unwrap_or_default(), out_y.unwrap_or_default());

        let mut weights = Tensor::new(Shape::new(filters, extent, extent, in_size.z));
        for a in 0..filters {
            for i in 0..extent {
                for j in 0..extent {
                    for z in 0..in_size.z {
                        weights[(a, i, j, z)] = rng.triangular();
                    }
                }
            }
        }

        if options.debug {
            debug!("conv weights after init:\n{}", weights);
        }

        Self {
            input: Tensor::new(in_size),
            output: Tensor::new(Shape::new(in_size.m, out_x, out_y, filters)),
            grads_in: Tensor::new(in_size),
            filter_grads: Tensor::new(weights.shape()),
            filters: weights,
            mapper: ReceptiveField::new(stride, extent, out_x, out_y, filters),
            options,
            state: LayerState::Fresh,
        }
    }

    /// Get the step between consecutive windows.
    pub fn stride(&self) -> usize {
        self.mapper.stride()
    }

    /// Get the filter width and height.
    pub fn extent(&self) -> usize {
        self.mapper.extent()
    }

    /// Get the number of filters (output channels).
    pub fn filter_count(&self) -> usize {
        self.filters.shape().m
    }

    /// Get the coordinate mapper used by forward and backward.
    pub fn mapper(&self) -> &ReceptiveField {
        &self.mapper
    }

    /// Get the clipping, momentum and debug switches.
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Get the filters `(F, extent, extent, C)`.
    pub fn weights(&self) -> &Tensor<f64> {
        &self.filters
    }

    /// Direct access to the filters, e.g. to load known weights.
    pub fn weights_mut(&mut self) -> &mut Tensor<f64> {
        &mut self.filters
    }

    /// Get the accumulated filter gradients from the last backward pass.
    pub fn weight_gradients(&self) -> &Tensor<Gradient> {
        &self.filter_grads
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
        let out_shape = self.output.shape();
        let extent = self.mapper.extent();

        for example in 0..in_shape.m {
            for filter in 0..out_shape.z {
                for x in 0..out_shape.x {
                    for y in 0..out_shape.y {
                        let mapped = self.mapper.map_to_input(Point::new(0, x, y, 0), 0);

                        let mut sum = 0.0;
                        for i in 0..extent {
                            for j in 0..extent {
                                for z in 0..in_shape.z {
                                    let f = self.filters[(filter, i, j, z)];
                                    let v = self.input[(example, mapped.x + i, mapped.y + j, z)];
                                    sum += f * v;
                                }
                            }
                        }
                        self.output[(example, x, y, filter)] = sum;
                    }
                }
            }
        }
    }

    fn calc_grads(&mut self, grad_next: &Tensor<f64>) {
        for cell in self.filter_grads.data_mut() {
            cell.grad = 0.0;
        }

        let in_shape = self.input.shape();
        let stride = self.mapper.stride();
        let clip = self.options.clip;

        for e in 0..in_shape.m {
            for x in 0..in_shape.x {
                for y in 0..in_shape.y {
                    let rn = self.mapper.map_to_output(x, y);
                    for z in 0..in_shape.z {
                        let mut sum_error = 0.0;
                        for i in rn.xs() {
                            let minx = i * stride;
                            for j in rn.ys() {
                                let miny = j * stride;
                                for k in rn.zs() {
                                    let upstream = grad_next[(e, i, j, k)];
                                    let w_applied = self.filters[(k, x - minx, y - miny, z)];
                                    sum_error += w_applied * upstream;

                                    let cell = &mut self.filter_grads[(k, x - minx, y - miny, z)];
                                    cell.grad += self.input[(e, x, y, z)] * upstream;
                                    clip.apply(&mut cell.grad);
                                }
                            }
                        }
                        let cell = &mut self.grads_in[(e, x, y, z)];
                        *cell = sum_error;
                        clip.apply(cell);
                    }
                }
            }
        }
    }
}

impl Layer for ConvLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Conv
    }

    fn forward(&mut self, input: &Tensor<f64>) -> Result<&Tensor<f64>> {
        check_shape("conv forward input", self.input.shape(), input.shape())?;
        self.input.copy_from(input)?;
        self.activate();
        self.state = LayerState::Forwarded;
        trace!("conv forward: {} -> {}", input.shape(), self.output.shape());

        if self.options.debug {
            debug!("conv output:\n{}", self.output);
        }
        Ok(&self.output)
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> Result<&Tensor<f64>> {
        self.state.check_backward(LayerKind::Conv)?;
        check_shape("conv upstream gradient", self.output.shape(), grad_next.shape())?;
        self.calc_grads(grad_next);
        self.state = LayerState::Backpropagated;

        if self.options.debug {
            debug!("conv filter gradients:\n{}", self.filter_grads);
            debug!("conv grads_in:\n{}", self.grads_in);
        }
        Ok(&self.grads_in)
    }

    // Summed over the batch; not divided by the example count.
    fn update_parameters(&mut self, optimizer: &dyn Optimizer, learning_rate: f64) -> Result<()> {
        self.state.check_update(LayerKind::Conv)?;

        let use_momentum = self.options.use_momentum;
        for (w, grad) in self
            .filters
            .data_mut()
            .iter_mut()
            .zip(self.filter_grads.data_mut().iter_mut())
        {
            *w = optimizer.update_weight(*w, grad, 1.0, use_momentum, learning_rate);
            optimizer.update_gradient(grad);
        }
        self.state = LayerState::Updated;

        if self.options.debug {
            debug!("conv weights after update:\n{}", self.filters);
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
        self.filters.shape().len()
    }

    fn state(&self) -> LayerState {
        self.state
    }
}
