//! Gradient clipping
//!
//! Layers apply the clip after every individual accumulation into a gradient
//! cell, so a cell never leaves `[-bound, bound]` at any point of a backward
//! pass.

pub const DEFAULT_CLIP_BOUND: f64 = 10.0;

/// Clamp applied in place to accumulated derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientClip {
    enabled: bool,
    bound: f64,
}

impl GradientClip {
    /// Enabled clip at `bound`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is not strictly positive.
    pub fn new(bound: f64) -> Self {
        assert!(bound > 0.0, "clip bound must be positive, got {}", bound);
        Self {
            enabled: true,
            bound,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            bound: DEFAULT_CLIP_BOUND,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bound(&self) -> f64 {
        self.bound
    }

    #[inline]
    pub fn apply(&self, value: &mut f64) {
        if !self.enabled {
            return;
        }
        if *value < -self.bound {
            *value = -self.bound;
        } else if *value > self.bound {
            *value = self.bound;
        }
    }
}

impl Default for GradientClip {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_BOUND)
    }
}
