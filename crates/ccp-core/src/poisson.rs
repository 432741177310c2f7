// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Poisson
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Electrostatic solve: −∇·(ε∇φ) = 0 on the 5-point stencil.
//!
//! Face permittivities use the harmonic mean, which keeps the normal
//! displacement flux continuous across material interfaces. Dirichlet
//! cells become identity rows with their value moved to the right-hand
//! side of neighbouring rows. Domain-edge cells without a neighbour use
//! the doubled one-sided face coefficient.
//!
//! The linear solve goes through the `ccp-math` seam: banded direct LU
//! under the default `direct-solver` feature, bounded conjugate gradient
//! otherwise (and as the runtime fallback when the factorization reports
//! a bad pivot).

use ndarray::Array2;
use tracing::warn;

use ccp_math::csr::{CsrMatrix, TripletMatrix};
use ccp_math::solver::{ConjugateGradient, LinearSolver};
use ccp_types::error::{CcpError, CcpResult};

use crate::boundary::DirichletSet;

/// Harmonic mean of two face permittivities; zero when either side is
/// non-positive.
fn harmonic(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    2.0 * a * b / (a + b)
}

/// Assemble the sparse system and right-hand side.
pub fn assemble_poisson_system(
    eps: &Array2<f64>,
    dr: f64,
    dz: f64,
    dirichlet: &DirichletSet,
) -> (CsrMatrix, Vec<f64>) {
    let (nz, nr) = eps.dim();
    let total = nz * nr;
    let mut triplets = TripletMatrix::new(total);
    let mut b = vec![0.0; total];

    let idx = |k: usize, j: usize| k * nr + j;

    // One face: the coefficient lands on the diagonal; the neighbour either
    // couples back (free cell) or pushes its known value to the RHS.
    let add_neighbor =
        |triplets: &mut TripletMatrix, b: &mut Vec<f64>, i: usize, k: usize, j: usize, coef: f64| {
            if dirichlet.mask[[k, j]] {
                b[i] += coef * dirichlet.values[[k, j]];
            } else {
                triplets.add(i, idx(k, j), -coef);
            }
            triplets.add(i, i, coef);
        };

    for k in 0..nz {
        for j in 0..nr {
            let i = idx(k, j);
            if dirichlet.mask[[k, j]] {
                triplets.add(i, i, 1.0);
                b[i] = dirichlet.values[[k, j]];
                continue;
            }

            if j == 0 {
                let eps_e = harmonic(eps[[k, j]], eps[[k, j + 1]]);
                add_neighbor(&mut triplets, &mut b, i, k, j + 1, 2.0 * eps_e / (dr * dr));
            } else if j == nr - 1 {
                let eps_w = harmonic(eps[[k, j]], eps[[k, j - 1]]);
                add_neighbor(&mut triplets, &mut b, i, k, j - 1, 2.0 * eps_w / (dr * dr));
            } else {
                let eps_e = harmonic(eps[[k, j]], eps[[k, j + 1]]);
                let eps_w = harmonic(eps[[k, j]], eps[[k, j - 1]]);
                add_neighbor(&mut triplets, &mut b, i, k, j + 1, eps_e / (dr * dr));
                add_neighbor(&mut triplets, &mut b, i, k, j - 1, eps_w / (dr * dr));
            }

            if k == 0 {
                let eps_n = harmonic(eps[[k, j]], eps[[k + 1, j]]);
                add_neighbor(&mut triplets, &mut b, i, k + 1, j, 2.0 * eps_n / (dz * dz));
            } else if k == nz - 1 {
                let eps_s = harmonic(eps[[k, j]], eps[[k - 1, j]]);
                add_neighbor(&mut triplets, &mut b, i, k - 1, j, 2.0 * eps_s / (dz * dz));
            } else {
                let eps_n = harmonic(eps[[k, j]], eps[[k + 1, j]]);
                let eps_s = harmonic(eps[[k, j]], eps[[k - 1, j]]);
                add_neighbor(&mut triplets, &mut b, i, k + 1, j, eps_n / (dz * dz));
                add_neighbor(&mut triplets, &mut b, i, k - 1, j, eps_s / (dz * dz));
            }
        }
    }

    (triplets.to_csr(), b)
}

#[cfg(feature = "direct-solver")]
fn solve_linear(matrix: &CsrMatrix, b: &[f64], warnings: &mut Vec<String>) -> CcpResult<Vec<f64>> {
    match ccp_math::solver::BandLu.solve(matrix, b) {
        Ok(x) => Ok(x),
        Err(err) => {
            warn!(error = %err, "direct electrostatic solve failed, falling back to CG");
            warnings.push(format!("direct solve failed: {err}; using CG"));
            ConjugateGradient::default().solve(matrix, b)
        }
    }
}

#[cfg(not(feature = "direct-solver"))]
fn solve_linear(matrix: &CsrMatrix, b: &[f64], _warnings: &mut Vec<String>) -> CcpResult<Vec<f64>> {
    ConjugateGradient::default().solve(matrix, b)
}

/// Solve for φ and reshape to `[nz, nr]`.
pub fn solve_phi(
    matrix: &CsrMatrix,
    b: &[f64],
    nz: usize,
    nr: usize,
    warnings: &mut Vec<String>,
) -> CcpResult<Array2<f64>> {
    let flat = solve_linear(matrix, b, warnings)?;
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(CcpError::LinAlg("non-finite potential solution".into()));
    }
    Ok(Array2::from_shape_fn((nz, nr), |(k, j)| flat[k * nr + j]))
}

/// (Er, Ez) from φ via centered differences, one-sided at domain edges.
/// Er is forced to zero on the r = 0 symmetry axis.
pub fn compute_e_components(phi: &Array2<f64>, dr: f64, dz: f64) -> (Array2<f64>, Array2<f64>) {
    let (nz, nr) = phi.dim();
    let mut er = Array2::zeros((nz, nr));
    let mut ez = Array2::zeros((nz, nr));

    for k in 0..nz {
        for j in 0..nr {
            er[[k, j]] = if j == 0 {
                0.0
            } else if j == nr - 1 {
                -(phi[[k, j]] - phi[[k, j - 1]]) / dr
            } else {
                -(phi[[k, j + 1]] - phi[[k, j - 1]]) / (2.0 * dr)
            };

            ez[[k, j]] = if nz == 1 {
                0.0
            } else if k == 0 {
                -(phi[[k + 1, j]] - phi[[k, j]]) / dz
            } else if k == nz - 1 {
                -(phi[[k, j]] - phi[[k - 1, j]]) / dz
            } else {
                -(phi[[k + 1, j]] - phi[[k - 1, j]]) / (2.0 * dz)
            };
        }
    }

    (er, ez)
}

/// |E| = √(Er² + Ez²).
pub fn compute_e_magnitude(phi: &Array2<f64>, dr: f64, dz: f64) -> Array2<f64> {
    let (er, ez) = compute_e_components(phi, dr, dz);
    let (nz, nr) = phi.dim();
    Array2::from_shape_fn((nz, nr), |(k, j)| er[[k, j]].hypot(ez[[k, j]]))
}
