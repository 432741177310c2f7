// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Bernoulli
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Bernoulli function B(x) = x / (eˣ − 1) for exponential-fitting face
//! coefficients.
//!
//! Three regimes keep the evaluation stable across the full Péclet range:
//! a Taylor series near zero (where the direct form is 0/0), the exact
//! form in the middle, and the asymptotes B(x) → 0 for x → +∞ and
//! B(x) → −x for x → −∞ once eˣ over/underflows any useful precision.

/// Series switch-over point; below this |x| the direct form loses digits.
const SERIES_EPS: f64 = 1e-6;

/// Beyond this magnitude the asymptotic limits are exact to f64.
const ASYMPTOTE_CUTOFF: f64 = 50.0;

/// Stable evaluation of B(x) = x / (eˣ − 1).
pub fn bernoulli(x: f64) -> f64 {
    if x.abs() < SERIES_EPS {
        return 1.0 - 0.5 * x + (x * x) / 12.0;
    }
    if x > ASYMPTOTE_CUTOFF {
        return 0.0;
    }
    if x < -ASYMPTOTE_CUTOFF {
        return -x;
    }
    x / (x.exp() - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bernoulli_at_zero() {
        assert!((bernoulli(0.0) - 1.0).abs() < 1e-12, "B(0) = 1");
    }

    #[test]
    fn test_bernoulli_reference_values() {
        // B(1) = 1 / (e - 1), B(-1) = 1 / (1 - 1/e)
        let e = std::f64::consts::E;
        assert!((bernoulli(1.0) - 1.0 / (e - 1.0)).abs() < 1e-12);
        assert!((bernoulli(-1.0) - 1.0 / (1.0 - 1.0 / e)).abs() < 1e-12);
    }

    #[test]
    fn test_bernoulli_identity() {
        // B(-x) = B(x) + x holds in every regime.
        for &x in &[1e-8, 1e-7, 1e-4, 0.1, 1.0, 5.0, 30.0, 49.9, 60.0, 200.0] {
            let lhs = bernoulli(-x);
            let rhs = bernoulli(x) + x;
            assert!(
                (lhs - rhs).abs() < 1e-9 * (1.0 + x),
                "B(-{x}) = {lhs}, B({x}) + {x} = {rhs}"
            );
        }
    }

    #[test]
    fn test_bernoulli_positive_and_monotone_decreasing() {
        let mut previous = f64::INFINITY;
        for i in 0..100 {
            let x = -10.0 + 0.2 * i as f64;
            let value = bernoulli(x);
            assert!(value >= 0.0, "B({x}) = {value} must be non-negative");
            assert!(value <= previous + 1e-12, "B must decrease, failed at {x}");
            previous = value;
        }
    }

    #[test]
    fn test_bernoulli_asymptotes() {
        assert_eq!(bernoulli(75.0), 0.0);
        assert_eq!(bernoulli(-75.0), 75.0);
    }
}
