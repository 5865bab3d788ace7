//! Configuration structures for training
//!
//! This module provides the training configuration: learning rate,
//! optimizer constants, gradient clipping and the debug dump switch.

use crate::error::CnnError;
use crate::layers::LayerOptions;
use crate::optimizers::clip::DEFAULT_CLIP_BOUND;
use crate::optimizers::sgd::{DEFAULT_MOMENTUM, DEFAULT_WEIGHT_DECAY};
use crate::optimizers::{GradientClip, MomentumSgd};
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Training configuration parsed from a JSON file.
///
/// Every field is optional; missing fields take the defaults below.
///
/// # Example
///
/// ```json
/// {
///   "learning_rate": 0.01,
///   "momentum": 0.6,
///   "weight_decay": 0.001,
///   "use_momentum": false,
///   "clip_gradients": true,
///   "clip_bound": 10.0,
///   "epochs": 20,
///   "seed": 42,
///   "debug": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Step size passed to every weight update (default 0.01)
    pub learning_rate: f64,

    /// Momentum factor carried in each gradient's `oldgrad` (default 0.6)
    pub momentum: f64,

    /// L2 weight decay applied on every update (default 0.001)
    pub weight_decay: f64,

    /// Whether the carried momentum contributes to the weight step (default false)
    pub use_momentum: bool,

    /// Clip accumulated gradients into `[-clip_bound, clip_bound]` (default true)
    pub clip_gradients: bool,

    /// Clip bound (default 10.0)
    pub clip_bound: f64,

    /// Number of passes over the training data (default 10)
    pub epochs: usize,

    /// Seed for weight initialization (default 42)
    pub seed: u64,

    /// Dump tensors through the `debug` log level (default false)
    pub debug: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: DEFAULT_MOMENTUM,
            weight_decay: DEFAULT_WEIGHT_DECAY,
            use_momentum: false,
            clip_gradients: true,
            clip_bound: DEFAULT_CLIP_BOUND,
            epochs: 10,
            seed: 42,
            debug: false,
        }
    }
}

impl TrainingConfig {
    pub fn optimizer(&self) -> MomentumSgd {
        MomentumSgd::new(self.momentum, self.weight_decay)
    }

    pub fn gradient_clip(&self) -> GradientClip {
        if self.clip_gradients {
            GradientClip::new(self.clip_bound)
        } else {
            GradientClip::disabled()
        }
    }

    pub fn layer_options(&self) -> LayerOptions {
        LayerOptions {
            clip: self.gradient_clip(),
            use_momentum: self.use_momentum,
            debug: self.debug,
        }
    }

    /// Check value ranges. Called by [`load_config`].
    pub fn validate(&self) -> Result<(), CnnError> {
        if !(self.learning_rate > 0.0) {
            return Err(CnnError::InvalidConfig(
                "learning_rate must be positive".to_string(),
            ));
        }
        if self.momentum < 0.0 {
            return Err(CnnError::InvalidConfig(
                "momentum must be non-negative".to_string(),
            ));
        }
        if self.weight_decay < 0.0 {
            return Err(CnnError::InvalidConfig(
                "weight_decay must be non-negative".to_string(),
            ));
        }
        if self.clip_gradients && !(self.clip_bound > 0.0) {
            return Err(CnnError::InvalidConfig(
                "clip_bound must be positive when clipping is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into a
/// `TrainingConfig` and validates the values.
///
/// # Examples
///
/// ```no_run
/// use binary_cnn::config::load_config;
///
/// let cfg = load_config("training.json").unwrap();
/// assert!(cfg.learning_rate > 0.0);
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
