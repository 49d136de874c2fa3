//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG with 64-bit state. Same seed, same sequence:
//! incident generation, scene placement and cleanup decisions all replay
//! identically for a given seed and config.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use dispatch_sim_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let index = rng.pick_index(5); // [0, 5)
/// assert!(index < 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    pub fn new(seed: u64) -> Self {
        // xorshift state must never be zero
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Current RNG state (for replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    ///
    /// # Example
    /// ```
    /// use dispatch_sim_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// let p = rng.next_f64();
    /// assert!(p >= 0.0 && p < 1.0);
    /// ```
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform f64 in [min, max)
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        min + self.next_f64() * (max - min)
    }

    /// Bernoulli draw: true with probability `p`
    ///
    /// `p <= 0.0` never succeeds, `p >= 1.0` always succeeds. Both still
    /// consume one value so the stream stays aligned.
    ///
    /// # Example
    /// ```
    /// use dispatch_sim_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// assert!(rng.chance(1.0));
    /// assert!(!rng.chance(0.0));
    /// ```
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform index in [0, len)
    ///
    /// # Panics
    /// Panics if len == 0
    pub fn pick_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot pick from an empty set");
        (self.next() % len as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "cannot pick from an empty set")]
    fn test_pick_index_empty_panics() {
        let mut rng = RngManager::new(12345);
        rng.pick_index(0);
    }

    #[test]
    fn test_range_f64_degenerate_interval() {
        let mut rng = RngManager::new(3);
        assert_eq!(rng.range_f64(5.0, 5.0), 5.0);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = RngManager::new(99999);
        for _ in 0..100 {
            assert!(rng.chance(1.0));
            assert!(!rng.chance(0.0));
        }
    }
}
