//! Random sources for weighted sampling.
//!
//! The assembler never reaches for a global generator: it owns whatever
//! [`RandomSource`] it was built with. Any [`rand::Rng`] qualifies, so a
//! seeded [`StdRng`] gives reproducible scripts and [`FixedSequence`] pins
//! individual draws in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed reals.
pub trait RandomSource {
    /// Draw a value in `[low, high)`. Returns `low` when the interval is
    /// empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

impl<R: Rng> RandomSource for R {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Entropy-seeded generator for production use.
#[must_use]
pub fn default_rng() -> StdRng {
    StdRng::from_entropy()
}

/// Deterministic generator for replays and tests.
#[must_use]
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Cycles through preset positions inside the requested interval.
///
/// Each entry is a fraction in `[0, 1]`; a draw returns
/// `low + fraction * (high - low)`. A fraction of exactly `1.0` lands on the
/// upper end, which a real generator never produces. That is useful for
/// exercising the end of a cumulative-weight walk.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    fractions: Vec<f64>,
    cursor: usize,
}

impl FixedSequence {
    /// Build from fractions; values are clamped into `[0, 1]`. An empty list
    /// behaves like `[0.0]`.
    #[must_use]
    pub fn new(fractions: impl IntoIterator<Item = f64>) -> Self {
        let mut fractions: Vec<f64> = fractions.into_iter().map(|f| f.clamp(0.0, 1.0)).collect();
        if fractions.is_empty() {
            fractions.push(0.0);
        }
        Self {
            fractions,
            cursor: 0,
        }
    }
}

impl RandomSource for FixedSequence {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let fraction = self.fractions[self.cursor % self.fractions.len()];
        self.cursor = self.cursor.wrapping_add(1);
        low + fraction * (high - low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_draws_stay_in_range() {
        let mut rng = seeded_rng(7);
        for _ in 0..1_000 {
            let v = rng.uniform(2.0, 5.0);
            assert!((2.0..5.0).contains(&v));
        }
    }

    #[test]
    fn empty_interval_returns_low() {
        let mut rng = seeded_rng(7);
        assert!((rng.uniform(3.0, 3.0) - 3.0).abs() < f64::EPSILON);
        assert!((rng.uniform(3.0, 1.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seeded_rngs_agree() {
        let mut a = seeded_rng(99);
        let mut b = seeded_rng(99);
        for _ in 0..32 {
            assert!((a.uniform(0.0, 10.0) - b.uniform(0.0, 10.0)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn fixed_sequence_cycles() {
        let mut seq = FixedSequence::new([0.0, 0.5, 1.0]);
        assert!((seq.uniform(0.0, 10.0) - 0.0).abs() < 1e-12);
        assert!((seq.uniform(0.0, 10.0) - 5.0).abs() < 1e-12);
        assert!((seq.uniform(0.0, 10.0) - 10.0).abs() < 1e-12);
        assert!((seq.uniform(0.0, 10.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn fixed_sequence_clamps_and_defaults() {
        let mut seq = FixedSequence::new([2.0]);
        assert!((seq.uniform(0.0, 4.0) - 4.0).abs() < 1e-12);
        let mut empty = FixedSequence::new([]);
        assert!((empty.uniform(1.0, 4.0) - 1.0).abs() < 1e-12);
    }
}
