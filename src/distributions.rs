//! Random draws used by the full conditional updates.
//!
//! All primitives take the random source explicitly and report invalid
//! parameters as [`GibbsError::Distribution`] instead of panicking.

use rand::Rng;
use rand_distr::{Distribution, Gamma, Geometric, Normal};

use crate::error::{GibbsError, Result};

fn invalid(name: &'static str, err: impl std::fmt::Display) -> GibbsError {
    GibbsError::Distribution {
        name,
        message: err.to_string(),
    }
}

/// Draw from a normal distribution parameterized by its variance.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, var: f64) -> Result<f64> {
    if !(var >= 0.) || !var.is_finite() {
        return Err(invalid("normal", format!("variance must be finite and >= 0, got {}", var)));
    }
    let dist = Normal::new(mean, var.sqrt()).map_err(|e| invalid("normal", e))?;
    Ok(dist.sample(rng))
}

/// Draw from a gamma distribution with the given shape and rate.
pub fn gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, rate: f64) -> Result<f64> {
    if !(rate > 0.) || !rate.is_finite() {
        return Err(invalid("gamma", format!("rate must be finite and > 0, got {}", rate)));
    }
    let dist = Gamma::new(shape, 1. / rate).map_err(|e| invalid("gamma", e))?;
    Ok(dist.sample(rng))
}

/// Draw from an inverse-gamma distribution.
///
/// If `g ~ Gamma(shape, rate = scale)` then `1 / g` has the requested
/// distribution. A gamma draw that underflows to zero yields `inf`, which
/// the caller is expected to check.
pub fn inv_gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, scale: f64) -> Result<f64> {
    Ok(1. / gamma(rng, shape, scale)?)
}

/// Number of failures before the first success with success probability `p`.
pub fn geometric<R: Rng + ?Sized>(rng: &mut R, p: f64) -> Result<u64> {
    let dist = Geometric::new(p).map_err(|e| invalid("geometric", e))?;
    Ok(dist.sample(rng))
}

/// Draw an index with probability proportional to `exp(log_weights[i])`.
pub fn categorical_log<R: Rng + ?Sized>(rng: &mut R, log_weights: &[f64]) -> Result<usize> {
    let max = log_weights
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Err(invalid(
            "categorical",
            format!("largest log weight is not finite: {}", max),
        ));
    }

    let total: f64 = log_weights.iter().map(|lw| (lw - max).exp()).sum();
    let u: f64 = rng.random::<f64>() * total;
    let mut cum = 0.;
    for (i, lw) in log_weights.iter().enumerate() {
        cum += (lw - max).exp();
        if cum > u {
            return Ok(i);
        }
    }
    Ok(log_weights.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const N: usize = 200_000;

    fn moments(draws: &[f64]) -> (f64, f64) {
        let n = draws.len() as f64;
        let mean = draws.iter().sum::<f64>() / n;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.);
        (mean, var)
    }

    #[test]
    fn normal_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<f64> = (0..N).map(|_| normal(&mut rng, 3., 4.).unwrap()).collect();
        let (mean, var) = moments(&draws);
        assert_abs_diff_eq!(mean, 3., epsilon = 0.03);
        assert_abs_diff_eq!(var, 4., epsilon = 0.1);
    }

    #[test]
    fn normal_zero_variance_is_point_mass() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(normal(&mut rng, 1.5, 0.).unwrap(), 1.5);
        assert!(normal(&mut rng, 0., -1.).is_err());
        assert!(normal(&mut rng, 0., f64::NAN).is_err());
    }

    #[test]
    fn gamma_uses_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<f64> = (0..N).map(|_| gamma(&mut rng, 3., 2.).unwrap()).collect();
        let (mean, var) = moments(&draws);
        assert_abs_diff_eq!(mean, 1.5, epsilon = 0.02);
        assert_abs_diff_eq!(var, 0.75, epsilon = 0.03);
        assert!(gamma(&mut rng, 0., 1.).is_err());
        assert!(gamma(&mut rng, 1., 0.).is_err());
    }

    #[test]
    fn inv_gamma_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..N)
            .map(|_| inv_gamma(&mut rng, 5., 8.).unwrap())
            .collect();
        assert!(draws.iter().all(|&x| x > 0.));
        let (mean, _) = moments(&draws);
        // scale / (shape - 1)
        assert_abs_diff_eq!(mean, 2., epsilon = 0.03);
    }

    #[test]
    fn geometric_mean() {
        let mut rng = StdRng::seed_from_u64(3);
        let draws: Vec<f64> = (0..N)
            .map(|_| geometric(&mut rng, 0.25).unwrap() as f64)
            .collect();
        let (mean, _) = moments(&draws);
        assert_abs_diff_eq!(mean, 3., epsilon = 0.05);
        assert!(geometric(&mut rng, 1.5).is_err());
    }

    #[test]
    fn categorical_frequencies() {
        let mut rng = StdRng::seed_from_u64(11);
        let weights = [0f64.ln(), 1f64.ln(), 3f64.ln()];
        let mut counts = [0usize; 3];
        for _ in 0..N {
            counts[categorical_log(&mut rng, &weights).unwrap()] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_abs_diff_eq!(counts[2] as f64 / N as f64, 0.75, epsilon = 0.01);
    }

    #[test]
    fn categorical_handles_large_log_weights() {
        let mut rng = StdRng::seed_from_u64(11);
        let weights = [-1e6, 1000., 1000.];
        let idx = categorical_log(&mut rng, &weights).unwrap();
        assert!(idx == 1 || idx == 2);
        assert!(categorical_log(&mut rng, &[f64::NEG_INFINITY]).is_err());
        assert!(categorical_log(&mut rng, &[]).is_err());
    }
}
