//! Binary image classification CNN
//!
//! A small convolutional network with hand-derived backpropagation: no
//! autodiff, every derivative is written out per layer type and accumulated
//! per training example.
//!
//! # Modules
//!
//! - `tensor`: Four-axis tensor storage `(example, x, y, channel)`
//! - `gradient`: Per-weight gradient accumulator with momentum carry
//! - `layers`: Convolution and fully-connected layers, coordinate mapper, `Layer` trait
//! - `optimizers`: Weight update rule and gradient clipping
//! - `loss`: Cross-entropy loss
//! - `network`: Sequential driver chaining layers
//! - `config`: Training configuration
//! - `architecture`: Architecture configuration and network building
//! - `utils`: RNG and softmax helper
//! - `error`: Error type

pub mod architecture;
pub mod config;
pub mod error;
pub mod gradient;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizers;
pub mod tensor;
pub mod utils;

pub use error::{CnnError, Result};
