use rand::Rng;
use std::f64::consts::TAU;

/// Maximum redraws before a truncated draw falls back to its mean.
pub const MAX_TRUNCATION_ATTEMPTS: usize = 1_000;

/// Standard normal draw via the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        return mean;
    }
    mean + std * standard_normal(rng)
}

/// Normal draw restricted to `[lo, hi]` by rejection.
///
/// `mean` must lie inside the bounds; it is returned if every attempt misses.
pub fn truncated_normal<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    std: f64,
    lo: f64,
    hi: f64,
) -> f64 {
    debug_assert!((lo..=hi).contains(&mean), "truncation mean outside bounds");
    if std == 0.0 {
        return mean;
    }
    for _ in 0..MAX_TRUNCATION_ATTEMPTS {
        let v = normal(rng, mean, std);
        if (lo..=hi).contains(&v) {
            return v;
        }
    }
    mean
}

/// Grid index drawn around the axis midpoint: rounded to the nearest cell, then clamped.
pub fn clustered_index<R: Rng + ?Sized>(rng: &mut R, dimension: usize, spread: f64) -> usize {
    let mid = (dimension / 2) as f64;
    let v = normal(rng, mid, spread).round();
    v.clamp(0.0, (dimension - 1) as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn standard_normal_has_roughly_unit_moments() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance {var}");
    }

    #[test]
    fn zero_deviation_returns_the_mean_without_drawing() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut untouched = rng.clone();
        assert_eq!(normal(&mut rng, 3.5, 0.0), 3.5);
        assert_eq!(rng.random::<u64>(), untouched.random::<u64>());
    }

    #[test]
    fn truncated_normal_stays_inside_bounds() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        for _ in 0..5_000 {
            let v = truncated_normal(&mut rng, 0.06, 0.5, 0.05, 0.95);
            assert!((0.05..=0.95).contains(&v));
        }
    }

    #[test]
    fn clustered_index_collapses_to_midpoint_without_spread() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(clustered_index(&mut rng, 10, 0.0), 5);
            assert_eq!(clustered_index(&mut rng, 7, 0.0), 3);
        }
    }

    #[test]
    fn clustered_index_is_clamped_to_the_grid() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let mut hit_edges = (false, false);
        for _ in 0..2_000 {
            let idx = clustered_index(&mut rng, 6, 50.0);
            assert!(idx < 6);
            hit_edges.0 |= idx == 0;
            hit_edges.1 |= idx == 5;
        }
        assert!(hit_edges.0 && hit_edges.1, "wide spread should pile up on both edges");
    }
}
