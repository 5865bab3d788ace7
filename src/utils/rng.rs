//! Simple random number generator for reproducible weight initialization.
//!
//! Lightweight xorshift PRNG; the same seed always yields the same network.

/// Xorshift RNG (not cryptographic).
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform sample in [0, 1].
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / u32::MAX as f64
    }

    /// Difference of two independent uniform samples.
    ///
    /// The result lies in [-1, 1] with a triangular density peaking at 0.
    pub fn triangular(&mut self) -> f64 {
        let u1 = self.next_f64();
        let u2 = self.next_f64();
        u1 - u2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(42);
        let mut rng2 = SimpleRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = SimpleRng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_rng_next_f64_range() {
        let mut rng = SimpleRng::new(12345);

        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!((0.0..=1.0).contains(&val));
        }
    }

    #[test]
    fn test_triangular_bounds_and_shape() {
        let mut rng = SimpleRng::new(777);
        let n = 20_000;
        let mut center = 0usize;
        let mut tails = 0usize;
        let mut sum = 0.0;

        for _ in 0..n {
            let v = rng.triangular();
            assert!((-1.0..=1.0).contains(&v));
            sum += v;
            if v.abs() < 0.5 {
                center += 1;
            } else {
                tails += 1;
            }
        }

        // Triangular on [-1, 1]: P(|v| < 0.5) = 0.75, a uniform would give 0.5.
        let center_ratio = center as f64 / n as f64;
        assert!(center_ratio > 0.70 && center_ratio < 0.80, "{}", center_ratio);
        assert!(tails > 0);
        assert!((sum / n as f64).abs() < 0.05);
    }
}
