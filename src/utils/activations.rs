//! Output normalization used by the network driver.
//!
//! The network has no activation layers; the driver turns the last layer's
//! scores into class probabilities with a softmax before evaluating the loss.

use crate::tensor::Tensor;

/// Softmax over the x axis of every example.
///
/// Expects a `(m, classes, 1, 1)` tensor, the output shape of a fully-connected
/// layer. Uses the max-subtraction trick so large scores do not overflow.
pub fn softmax_examples(scores: &Tensor<f64>) -> Tensor<f64> {
    let shape = scores.shape();
    let mut probabilities = Tensor::new(shape);
    if shape.x == 0 {
        return probabilities;
    }

    for e in 0..shape.m {
        let mut max_value = scores[(e, 0, 0, 0)];
        for i in 1..shape.x {
            max_value = max_value.max(scores[(e, i, 0, 0)]);
        }

        let mut sum = 0.0;
        for i in 0..shape.x {
            let v = (scores[(e, i, 0, 0)] - max_value).exp();
            probabilities[(e, i, 0, 0)] = v;
            sum += v;
        }

        for i in 0..shape.x {
            probabilities[(e, i, 0, 0)] /= sum;
        }
    }

    probabilities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Shape;
    use approx::assert_relative_eq;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let scores =
            Tensor::from_vec(Shape::new(2, 3, 1, 1), vec![1.0, 2.0, 3.0, -1.0, 0.0, 5.0]).unwrap();
        let p = softmax_examples(&scores);
        for e in 0..2 {
            let s: f64 = (0..3).map(|i| p[(e, i, 0, 0)]).sum();
            assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        }
        assert!(p[(0, 2, 0, 0)] > p[(0, 1, 0, 0)]);
    }

    #[test]
    fn test_softmax_equal_scores() {
        let scores = Tensor::from_vec(Shape::new(1, 2, 1, 1), vec![3.0, 3.0]).unwrap();
        let p = softmax_examples(&scores);
        assert_relative_eq!(p[(0, 0, 0, 0)], 0.5);
        assert_relative_eq!(p[(0, 1, 0, 0)], 0.5);
    }

    #[test]
    fn test_softmax_large_scores_stay_finite() {
        let scores = Tensor::from_vec(Shape::new(1, 2, 1, 1), vec![1000.0, 999.0]).unwrap();
        let p = softmax_examples(&scores);
        assert!(p.data().iter().all(|v| v.is_finite()));
    }
}
