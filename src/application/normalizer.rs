//! Score normalizer: raw estimator score → confidence in [0, 1].

use rand::Rng;

use crate::domain::ScoreRange;

/// How raw scores map onto the confidence scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NormalizationStrategy {
    /// `(clamp(raw, lo, hi) - lo) / (hi - lo)`
    #[default]
    Linear,
    /// Linear, plus a random bump in `[0, jitter]`, clamped into `[floor, ceiling]`.
    ConfidenceFloor { floor: f64, ceiling: f64, jitter: f64 },
}

impl NormalizationStrategy {
    /// Confidence-floor strategy with the usual `[floor, 1.0]` band.
    ///
    /// A non-finite `floor` becomes 0.0 and a non-finite `jitter` becomes 0.0.
    #[must_use]
    pub fn floor(floor: f64, jitter: f64) -> Self {
        let floor = if floor.is_finite() { floor.clamp(0.0, 1.0) } else { 0.0 };
        let jitter = if jitter.is_finite() { jitter.max(0.0) } else { 0.0 };
        Self::ConfidenceFloor {
            floor,
            ceiling: 1.0,
            jitter,
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Normalize a raw score. Output is rounded to two decimals.
///
/// `rng` is only drawn from by the confidence-floor strategy.
pub fn normalize<R>(raw: f64, range: ScoreRange, strategy: &NormalizationStrategy, rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    let raw = if raw.is_finite() { raw } else { range.lo };
    let linear = (raw.clamp(range.lo, range.hi) - range.lo) / (range.hi - range.lo);

    match *strategy {
        NormalizationStrategy::Linear => round2(linear).clamp(0.0, 1.0),
        NormalizationStrategy::ConfidenceFloor {
            floor,
            ceiling,
            jitter,
        } => {
            let bump = if jitter > 0.0 {
                rng.gen_range(0.0..=jitter)
            } else {
                0.0
            };
            round2(linear + bump).clamp(floor, ceiling)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn range() -> ScoreRange {
        ScoreRange { lo: 1.0, hi: 3.0 }
    }

    #[test]
    fn test_linear() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let s = NormalizationStrategy::Linear;
        assert_eq!(normalize(0.0, range(), &s, &mut rng), 0.0);
        assert_eq!(normalize(2.0, range(), &s, &mut rng), 0.5);
        assert_eq!(normalize(2.5, range(), &s, &mut rng), 0.75);
        assert_eq!(normalize(9.0, range(), &s, &mut rng), 1.0);
        assert_eq!(normalize(2.333, range(), &s, &mut rng), 0.67);
    }

    #[test]
    fn test_non_finite_is_lo() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let s = NormalizationStrategy::Linear;
        assert_eq!(normalize(f64::NAN, range(), &s, &mut rng), 0.0);
        assert_eq!(normalize(f64::INFINITY, range(), &s, &mut rng), 0.0);
    }

    #[test]
    fn test_floor_band_and_reproducible() {
        let s = NormalizationStrategy::floor(0.6, 0.1);
        for raw in [-5.0, 1.0, 1.5, 2.9, 3.0, 100.0] {
            let a = normalize(raw, range(), &s, &mut ChaCha20Rng::seed_from_u64(42));
            let b = normalize(raw, range(), &s, &mut ChaCha20Rng::seed_from_u64(42));
            assert_eq!(a, b);
            assert!((0.6..=1.0).contains(&a), "{a} out of band");
        }
    }

    #[test]
    fn test_floor_constructor_rejects_non_finite() {
        let s = NormalizationStrategy::floor(f64::NAN, f64::INFINITY);
        assert_eq!(
            s,
            NormalizationStrategy::ConfidenceFloor {
                floor: 0.0,
                ceiling: 1.0,
                jitter: 0.0
            }
        );
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert_eq!(normalize(2.0, range(), &s, &mut rng), 0.5);
    }

    #[test]
    fn test_floor_without_jitter_is_deterministic() {
        let s = NormalizationStrategy::floor(0.6, 0.0);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(normalize(2.8, range(), &s, &mut rng), 0.9);
        assert_eq!(normalize(1.0, range(), &s, &mut rng), 0.6);
    }
}
