//! Stochastic gradient descent with momentum and weight decay
//!
//! `m = grad + momentum * oldgrad` (the carry term only when momentum is requested)
//! `w = w - lr * m * multiplier - lr * weight_decay * w * multiplier`
//! and after each step `oldgrad = grad + momentum * oldgrad`.

use crate::gradient::Gradient;
use crate::optimizers::Optimizer;

pub const DEFAULT_MOMENTUM: f64 = 0.6;
pub const DEFAULT_WEIGHT_DECAY: f64 = 0.001;

/// SGD with an optional momentum term and L2 weight decay.
///
/// The learning rate is not stored here: it is passed on every call so that
/// the driver can schedule it freely.
///
/// # Example
///
/// ```
/// use binary_cnn::gradient::Gradient;
/// use binary_cnn::optimizers::{MomentumSgd, Optimizer};
///
/// let sgd = MomentumSgd::new(0.0, 0.0);
/// let w = sgd.update_weight(1.0, &Gradient::new(0.5, 0.0), 1.0, false, 0.1);
/// assert!((w - 0.95).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumSgd {
    momentum: f64,
    weight_decay: f64,
}

impl MomentumSgd {
    pub fn new(momentum: f64, weight_decay: f64) -> Self {
        Self {
            momentum,
            weight_decay,
        }
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn weight_decay(&self) -> f64 {
        self.weight_decay
    }
}

impl Default for MomentumSgd {
    fn default() -> Self {
        Self::new(DEFAULT_MOMENTUM, DEFAULT_WEIGHT_DECAY)
    }
}

impl Optimizer for MomentumSgd {
    fn update_weight(
        &self,
        weight: f64,
        gradient: &Gradient,
        multiplier: f64,
        use_momentum: bool,
        learning_rate: f64,
    ) -> f64 {
        let m = if use_momentum {
            gradient.grad + gradient.oldgrad * self.momentum
        } else {
            gradient.grad
        };
        weight
            - learning_rate * m * multiplier
            - learning_rate * self.weight_decay * weight * multiplier
    }

    fn update_gradient(&self, gradient: &mut Gradient) {
        gradient.oldgrad = gradient.grad + gradient.oldgrad * self.momentum;
    }
}
