//! Damped Gauss-Seidel sweeps over CSR rows.
//!
//! Fallback backend for the drift-diffusion system, whose up/down-wind face
//! weights make the matrix asymmetric. Updates can be floor-clamped so a
//! density solve never walks below its positivity floor mid-iteration.

use crate::csr::CsrMatrix;

/// Residual reported when a sweep aborts on a missing diagonal.
const ABORT_RESIDUAL: f64 = 1e9;

/// Configuration for the Gauss-Seidel solver.
#[derive(Debug, Clone)]
pub struct GsConfig {
    /// Convergence tolerance on the max per-cell update (default: 1e-6).
    pub tol: f64,
    /// Iteration cap (default: 5000).
    pub max_iter: usize,
    /// Lower clamp applied to every update, if any.
    pub floor: Option<f64>,
}

impl Default for GsConfig {
    fn default() -> Self {
        GsConfig {
            tol: 1e-6,
            max_iter: 5000,
            floor: None,
        }
    }
}

/// Result of a Gauss-Seidel solve.
#[derive(Debug, Clone)]
pub struct GsResult {
    pub x: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
    pub warnings: Vec<String>,
}

/// Sweep A·x = b to convergence from the initial guess `x0`.
pub fn gauss_seidel_solve(matrix: &CsrMatrix, b: &[f64], x0: &[f64], config: &GsConfig) -> GsResult {
    let n = matrix.n;
    let mut x = x0.to_vec();
    let mut warnings = Vec::new();
    let mut max_delta = 0.0_f64;

    for iteration in 1..=config.max_iter {
        max_delta = 0.0;
        for i in 0..n {
            let (cols, vals) = matrix.row(i);
            let mut diag = 0.0;
            let mut sigma = 0.0;
            for (&col, &value) in cols.iter().zip(vals) {
                if col == i {
                    diag = value;
                } else {
                    sigma += value * x[col];
                }
            }
            if diag == 0.0 {
                warnings.push(format!("zero diagonal at row {i} in Gauss-Seidel solver"));
                return GsResult {
                    x,
                    converged: false,
                    iterations: iteration,
                    residual: ABORT_RESIDUAL,
                    warnings,
                };
            }
            let mut new_value = (b[i] - sigma) / diag;
            if let Some(floor) = config.floor {
                if new_value < floor {
                    new_value = floor;
                }
            }
            let delta = (new_value - x[i]).abs();
            if delta > max_delta {
                max_delta = delta;
            }
            x[i] = new_value;
        }
        if max_delta < config.tol {
            return GsResult {
                x,
                converged: true,
                iterations: iteration,
                residual: max_delta,
                warnings,
            };
        }
    }

    GsResult {
        x,
        converged: false,
        iterations: config.max_iter,
        residual: max_delta,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::TripletMatrix;

    fn diagonally_dominant(n: usize) -> CsrMatrix {
        let mut triplets = TripletMatrix::new(n);
        for i in 0..n {
            triplets.add(i, i, 3.0);
            if i > 0 {
                triplets.add(i, i - 1, -1.0);
            }
            if i + 1 < n {
                triplets.add(i, i + 1, -1.0);
            }
        }
        triplets.to_csr()
    }

    #[test]
    fn test_gs_converges_on_dominant_system() {
        let matrix = diagonally_dominant(12);
        let b: Vec<f64> = (0..12).map(|i| 1.0 + 0.1 * i as f64).collect();
        let result = gauss_seidel_solve(&matrix, &b, &vec![0.0; 12], &GsConfig::default());
        assert!(result.converged);
        assert!(matrix.residual_inf(&result.x, &b) < 1e-4);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_gs_floor_clamp_holds() {
        let matrix = diagonally_dominant(8);
        // Negative RHS pulls the unclamped solution below zero.
        let b = vec![-5.0; 8];
        let config = GsConfig {
            floor: Some(1e-8),
            ..Default::default()
        };
        let result = gauss_seidel_solve(&matrix, &b, &vec![1.0; 8], &config);
        for &value in &result.x {
            assert!(value >= 1e-8, "floor clamp violated: {value}");
        }
    }

    #[test]
    fn test_gs_zero_diagonal_aborts_with_warning() {
        let mut triplets = TripletMatrix::new(2);
        triplets.add(0, 1, 1.0);
        triplets.add(1, 0, 1.0);
        triplets.add(1, 1, 2.0);
        let result =
            gauss_seidel_solve(&triplets.to_csr(), &[1.0, 1.0], &[0.0, 0.0], &GsConfig::default());
        assert!(!result.converged);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.residual >= 1e9);
    }

    #[test]
    fn test_gs_iteration_cap() {
        let matrix = diagonally_dominant(16);
        let config = GsConfig {
            tol: 1e-30,
            max_iter: 4,
            floor: None,
        };
        let result = gauss_seidel_solve(&matrix, &vec![1.0; 16], &vec![0.0; 16], &config);
        assert!(!result.converged);
        assert_eq!(result.iterations, 4);
    }
}
