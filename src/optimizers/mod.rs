//! Weight update and gradient clipping
//!
//! The layers accumulate raw gradients; everything about how those gradients
//! turn into new weights lives behind the [`Optimizer`] trait. Layers call
//! it once per weight per update step with the batch-summed gradient and
//! then let it advance the momentum carry.
//!
//! # Example
//!
//! ```ignore
//! use binary_cnn::optimizers::{MomentumSgd, Optimizer};
//!
//! let optimizer = MomentumSgd::default();
//! let w = optimizer.update_weight(w, &grad, 1.0, false, 0.01);
//! optimizer.update_gradient(&mut grad);
//! ```

pub mod clip;
pub mod sgd;

pub use clip::GradientClip;
pub use sgd::MomentumSgd;

use crate::gradient::Gradient;

/// Update rule consumed by the layers' weight-update step.
///
/// Implementations own the formula; the layers only guarantee that
/// `update_weight` sees the summed (not averaged) gradient of the batch and
/// that `update_gradient` is invoked after every update step.
pub trait Optimizer {
    /// Compute the new value of `weight` from its accumulated gradient.
    ///
    /// # Arguments
    ///
    /// * `weight` - Current weight value
    /// * `gradient` - Accumulated gradient and momentum carry for this weight
    /// * `multiplier` - Scale applied to the whole step (1.0 for a plain step)
    /// * `use_momentum` - Whether the carried `oldgrad` contributes to the step
    /// * `learning_rate` - Step size
    fn update_weight(
        &self,
        weight: f64,
        gradient: &Gradient,
        multiplier: f64,
        use_momentum: bool,
        learning_rate: f64,
    ) -> f64;

    /// Advance the momentum carry stored in `gradient.oldgrad`.
    fn update_gradient(&self, gradient: &mut Gradient);
}
