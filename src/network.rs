//! Sequential network driver
//!
//! Chains layers in order: forward feeds each output into the next layer,
//! backward walks the layers in reverse handing each input gradient to the
//! previous layer, and the update step runs once per layer per training step.

use crate::error::{CnnError, Result};
use crate::layers::{AnyLayer, Layer};
use crate::loss::{cross_entropy, cross_entropy_softmax_gradient};
use crate::optimizers::Optimizer;
use crate::tensor::Tensor;
use crate::utils::activations::softmax_examples;
use log::debug;

/// Ordered stack of convolution and fully-connected layers.
#[derive(Debug, Clone, Default)]
pub struct Network {
    layers: Vec<AnyLayer>,
}

impl Network {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer. Its input shape must equal the current output shape.
    pub fn push(&mut self, layer: impl Into<AnyLayer>) -> Result<()> {
        let layer = layer.into();
        if let Some(last) = self.layers.last() {
            if last.output_shape() != layer.input_shape() {
                return Err(CnnError::ShapeMismatch {
                    context: "layer chaining",
                    expected: last.output_shape(),
                    actual: layer.input_shape(),
                });
            }
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn layers(&self) -> &[AnyLayer] {
        &self.layers
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Run every layer's forward pass and return the last layer's output.
    pub fn forward(&mut self, input: &Tensor<f64>) -> Result<&Tensor<f64>> {
        let (first, rest) = self
            .layers
            .split_first_mut()
            .ok_or_else(|| CnnError::InvalidConfig("network has no layers".to_string()))?;

        let mut current = first.forward(input)?;
        for layer in rest {
            current = layer.forward(current)?;
        }
        Ok(current)
    }

    /// Propagate the gradient of the loss w.r.t. the network output back
    /// through every layer, last to first.
    pub fn backward(&mut self, grad_output: &Tensor<f64>) -> Result<()> {
        let mut grad = grad_output.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?.clone();
        }
        Ok(())
    }

    pub fn update_parameters(&mut self, optimizer: &dyn Optimizer, learning_rate: f64) -> Result<()> {
        for layer in &mut self.layers {
            layer.update_parameters(optimizer, learning_rate)?;
        }
        Ok(())
    }

    /// Class probabilities for `input`.
    pub fn predict(&mut self, input: &Tensor<f64>) -> Result<Tensor<f64>> {
        let scores = self.forward(input)?;
        Ok(softmax_examples(scores))
    }

    /// One full training step on a batch; returns the summed loss before the update.
    ///
    /// `targets` must be one-hot with the network's output shape.
    pub fn train_step(
        &mut self,
        input: &Tensor<f64>,
        targets: &Tensor<f64>,
        optimizer: &dyn Optimizer,
        learning_rate: f64,
    ) -> Result<f64> {
        let probabilities = self.predict(input)?;
        let loss = cross_entropy(&probabilities, targets)?;
        let grad = cross_entropy_softmax_gradient(&probabilities, targets)?;
        self.backward(&grad)?;
        self.update_parameters(optimizer, learning_rate)?;
        debug!("train step: loss {:.6}", loss);
        Ok(loss)
    }
}
