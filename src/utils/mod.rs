//! Shared utilities: seeded random numbers and output normalization.

pub mod activations;
pub mod rng;

pub use rng::SimpleRng;
