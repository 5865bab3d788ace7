//! Error types shared by the layers, the loss and the network driver.

use crate::layers::LayerState;
use crate::tensor::Shape;
use thiserror::Error;

/// Errors reported by layer operations, the loss and configuration validation.
///
/// Construction-time geometry violations inside a layer constructor are not
/// represented here: those are contract violations and panic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CnnError {
    #[error("{context}: expected shape {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: Shape,
        actual: Shape,
    },

    #[error("{layer} layer: cannot run {operation} while {state:?}")]
    StateViolation {
        layer: &'static str,
        operation: &'static str,
        state: LayerState,
    },

    #[error("example {example} has no target class marked 1")]
    MissingOneHotTarget { example: usize },

    #[error("{axis} axis: input {input} with extent {extent} and stride {stride} does not tile exactly")]
    InvalidGeometry {
        axis: &'static str,
        input: usize,
        extent: usize,
        stride: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CnnError>;
