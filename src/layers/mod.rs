//! Trainable layers
//!
//! Two layer types share one capability interface: [`ConvLayer`] and
//! [`FcLayer`]. [`AnyLayer`] is the closed tagged union the network driver
//! stores, dispatching with a plain `match`.
//!
//! Every layer runs the same cycle: `forward` caches its input and fills its
//! output, `backward` consumes the upstream gradient and fills both the input
//! gradient and its own weight gradients, `update_parameters` applies the
//! optimizer once per training step.

pub mod conv;
pub mod fc;
pub mod mapper;

pub use conv::ConvLayer;
pub use fc::FcLayer;
pub use mapper::{OutputRange, ReceptiveField};

use crate::error::{CnnError, Result};
use crate::optimizers::{GradientClip, Optimizer};
use crate::tensor::{Shape, Tensor};

/// Layer type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Conv,
    FullyConnected,
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Conv => "conv",
            LayerKind::FullyConnected => "fc",
        }
    }
}

/// Where a layer is in its forward/backward/update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// Constructed, no input cached yet.
    Fresh,
    Forwarded,
    /// Gradients accumulated and not yet consumed by an update.
    Backpropagated,
    Updated,
}

impl LayerState {
    pub(crate) fn check_backward(self, layer: LayerKind) -> Result<()> {
        match self {
            LayerState::Fresh => Err(CnnError::StateViolation {
                layer: layer.name(),
                operation: "backward",
                state: self,
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_update(self, layer: LayerKind) -> Result<()> {
        match self {
            LayerState::Backpropagated => Ok(()),
            _ => Err(CnnError::StateViolation {
                layer: layer.name(),
                operation: "update",
                state: self,
            }),
        }
    }
}

/// Per-layer switches shared by both layer types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerOptions {
    pub clip: GradientClip,
    /// Passed through to the optimizer on every weight update.
    pub use_momentum: bool,
    /// Dump weights, outputs and gradients through `log::debug!`.
    pub debug: bool,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            clip: GradientClip::default(),
            use_momentum: false,
            debug: false,
        }
    }
}

pub(crate) fn check_shape(context: &'static str, expected: Shape, actual: Shape) -> Result<()> {
    if expected != actual {
        return Err(CnnError::ShapeMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Capability interface implemented by every trainable layer.
pub trait Layer {
    fn kind(&self) -> LayerKind;

    /// Copy `input` into the layer's cache and compute the output.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `input` does not have the construction-time input shape.
    fn forward(&mut self, input: &Tensor<f64>) -> Result<&Tensor<f64>>;

    /// Propagate `grad_next` (gradient w.r.t. this layer's output) back.
    ///
    /// Returns the gradient w.r.t. the layer input; its shape always equals
    /// the input shape.
    ///
    /// # Errors
    ///
    /// `StateViolation` before the first `forward`, `ShapeMismatch` if
    /// `grad_next` does not have the output shape.
    fn backward(&mut self, grad_next: &Tensor<f64>) -> Result<&Tensor<f64>>;

    /// Apply one optimizer step using the gradients of the last `backward`.
    ///
    /// Gradients are summed over the batch, never averaged.
    ///
    /// # Errors
    ///
    /// `StateViolation` unless a `backward` ran since the last update.
    fn update_parameters(&mut self, optimizer: &dyn Optimizer, learning_rate: f64) -> Result<()>;

    fn input_shape(&self) -> Shape;

    fn output_shape(&self) -> Shape;

    /// Number of trainable weights.
    fn parameter_count(&self) -> usize;

    fn state(&self) -> LayerState;
}

/// Closed set of layer types stored by the network.
#[derive(Debug, Clone)]
pub enum AnyLayer {
    Conv(ConvLayer),
    FullyConnected(FcLayer),
}

impl From<ConvLayer> for AnyLayer {
    fn from(layer: ConvLayer) -> Self {
        AnyLayer::Conv(layer)
    }
}

impl From<FcLayer> for AnyLayer {
    fn from(layer: FcLayer) -> Self {
        AnyLayer::FullyConnected(layer)
    }
}

impl AnyLayer {
    pub fn as_conv(&self) -> Option<&ConvLayer> {
        match self {
            AnyLayer::Conv(layer) => Some(layer),
            AnyLayer::FullyConnected(_) => None,
        }
    }

    pub fn as_fc(&self) -> Option<&FcLayer> {
        match self {
            AnyLayer::FullyConnected(layer) => Some(layer),
            AnyLayer::Conv(_) => None,
        }
    }
}

impl Layer for AnyLayer {
    fn kind(&self) -> LayerKind {
        match self {
            AnyLayer::Conv(l) => l.kind(),
            AnyLayer::FullyConnected(l) => l.kind(),
        }
    }

    fn forward(&mut self, input: &Tensor<f64>) -> Result<&Tensor<f64>> {
        match self {
            AnyLayer::Conv(l) => l.forward(input),
            AnyLayer::FullyConnected(l) => l.forward(input),
        }
    }

    fn backward(&mut self, grad_next: &Tensor<f64>) -> Result<&Tensor<f64>> {
        match self {
            AnyLayer::Conv(l) => l.backward(grad_next),
            AnyLayer::FullyConnected(l) => l.backward(grad_next),
        }
    }

    fn update_parameters(&mut self, optimizer: &dyn Optimizer, learning_rate: f64) -> Result<()> {
        match self {
            AnyLayer::Conv(l) => l.update_parameters(optimizer, learning_rate),
            AnyLayer::FullyConnected(l) => l.update_parameters(optimizer, learning_rate),
        }
    }

    fn input_shape(&self) -> Shape {
        match self {
            AnyLayer::Conv(l) => l.input_shape(),
            AnyLayer::FullyConnected(l) => l.input_shape(),
        }
    }

    fn output_shape(&self) -> Shape {
        match self {
            AnyLayer::Conv(l) => l.output_shape(),
            AnyLayer::FullyConnected(l) => l.output_shape(),
        }
    }

    fn parameter_count(&self) -> usize {
        match self {
            AnyLayer::Conv(l) => l.parameter_count(),
            AnyLayer::FullyConnected(l) => l.parameter_count(),
        }
    }

    fn state(&self) -> LayerState {
        match self {
            AnyLayer::Conv(l) => l.state(),
            AnyLayer::FullyConnected(l) => l.state(),
        }
    }
}
