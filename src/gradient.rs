//! Per-weight gradient accumulator
//!
//! A [`Gradient`] pairs the derivative accumulated during the current
//! backward pass (`grad`) with the optimizer's momentum carry (`oldgrad`).
//! The layers only ever write `grad`; `oldgrad` belongs to the optimizer and
//! survives across batches.

use std::fmt;
use std::ops::{Add, Div, Mul};

/// Accumulated derivative plus momentum carry for one weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gradient {
    pub grad: f64,
    pub oldgrad: f64,
}

impl Gradient {
    pub const fn new(grad: f64, oldgrad: f64) -> Self {
        Self { grad, oldgrad }
    }
}

/// Component-wise sum of both fields.
impl Add for Gradient {
    type Output = Gradient;

    fn add(self, other: Gradient) -> Gradient {
        Gradient {
            grad: self.grad + other.grad,
            oldgrad: self.oldgrad + other.oldgrad,
        }
    }
}

impl Div<f64> for Gradient {
    type Output = Gradient;

    fn div(self, num: f64) -> Gradient {
        Gradient {
            grad: self.grad / num,
            oldgrad: self.oldgrad / num,
        }
    }
}

impl Mul<f64> for Gradient {
    type Output = Gradient;

    fn mul(self, num: f64) -> Gradient {
        Gradient {
            grad: self.grad * num,
            oldgrad: self.oldgrad * num,
        }
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(precision) = f.precision() {
            write!(f, "{:.*}", precision, self.grad)
        } else {
            write!(f, "{}", self.grad)
        }
    }
}
