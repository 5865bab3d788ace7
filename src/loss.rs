//! Cross-entropy loss
//!
//! `loss = sum over examples of -ln(p[target])`, where `target` is the first
//! class whose one-hot value is 1. The total is a sum, not a mean, matching
//! the batch-summed gradients of the layers.

use crate::error::{CnnError, Result};
use crate::layers::check_shape;
use crate::tensor::Tensor;

/// Index of the first class marked 1 in example `e` of a `(m, classes, 1, 1)` target.
fn target_index(actual: &Tensor<f64>, e: usize) -> Result<usize> {
    (0..actual.shape().x)
        .find(|&i| actual[(e, i, 0, 0)].trunc() == 1.0)
        .ok_or(CnnError::MissingOneHotTarget { example: e })
}

/// Summed cross-entropy of predicted probabilities against one-hot targets.
///
/// # Errors
///
/// `ShapeMismatch` if the tensors differ in shape, `MissingOneHotTarget` if
/// an example has no class marked 1.
///
/// # Example
///
/// ```
/// use binary_cnn::loss::cross_entropy;
/// use binary_cnn::tensor::{Shape, Tensor};
///
/// let p = Tensor::from_vec(Shape::new(1, 2, 1, 1), vec![0.5, 0.5]).unwrap();
/// let y = Tensor::from_vec(Shape::new(1, 2, 1, 1), vec![1.0, 0.0]).unwrap();
/// let loss = cross_entropy(&p, &y).unwrap();
/// assert!((loss - 0.5f64.ln().abs()).abs() < 1e-12);
/// ```
pub fn cross_entropy(predicted: &Tensor<f64>, actual: &Tensor<f64>) -> Result<f64> {
    check_shape("cross entropy target", predicted.shape(), actual.shape())?;

    let mut cost = 0.0;
    for e in 0..predicted.shape().m {
        let index = target_index(actual, e)?;
        cost += -predicted[(e, index, 0, 0)].ln();
    }
    Ok(cost)
}

/// Gradient of the summed cross-entropy w.r.t. the scores fed to a softmax.
///
/// With `p = softmax(scores)` this is `p - y`, where `y` is the one-hot
/// target rebuilt from the first class marked 1.
pub fn cross_entropy_softmax_gradient(
    probabilities: &Tensor<f64>,
    actual: &Tensor<f64>,
) -> Result<Tensor<f64>> {
    check_shape("cross entropy target", probabilities.shape(), actual.shape())?;

    let mut grad = probabilities.clone();
    for e in 0..probabilities.shape().m {
        let index = target_index(actual, e)?;
        grad[(e, index, 0, 0)] -= 1.0;
    }
    Ok(grad)
}
