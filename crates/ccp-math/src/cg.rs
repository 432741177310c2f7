// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — CG
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Bounded conjugate-gradient iteration for symmetric positive definite
//! systems.
//!
//! Used as the iterative backend for the electrostatic solve. Dirichlet
//! elimination keeps interior face couplings symmetric (known values move
//! to the right-hand side, each remaining face coefficient appears in both
//! coupled rows). Free cells on a domain edge carry a doubled one-sided
//! coefficient that their interior neighbour does not mirror, so exact
//! symmetry holds only when the domain rim is Dirichlet, which is the
//! usual chamber layout. Elsewhere the operator is still strictly diagonally
//! dominant and the bounded iteration is treated as best-effort. The
//! drift-diffusion operator is asymmetric by construction and must not be
//! routed here.

use crate::csr::CsrMatrix;

/// Configuration for the CG solver.
#[derive(Debug, Clone)]
pub struct CgConfig {
    /// Convergence tolerance on the residual L2 norm (default: 1e-10).
    pub tol: f64,
    /// Iteration cap (default: 5000).
    pub max_iter: usize,
}

impl Default for CgConfig {
    fn default() -> Self {
        CgConfig {
            tol: 1e-10,
            max_iter: 5000,
        }
    }
}

/// Result of a CG solve.
#[derive(Debug, Clone)]
pub struct CgResult {
    pub x: Vec<f64>,
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Solve A·x = b from a zero initial guess.
pub fn cg_solve(matrix: &CsrMatrix, b: &[f64], config: &CgConfig) -> CgResult {
    let n = b.len();
    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut rs_old: f64 = r.iter().map(|v| v * v).sum();

    let mut iterations = 0;
    let mut converged = rs_old.sqrt() < config.tol;

    while !converged && iterations < config.max_iter {
        iterations += 1;
        let ap = matrix.matvec(&p);
        let denom: f64 = p.iter().zip(&ap).map(|(pi, api)| pi * api).sum();
        if denom == 0.0 {
            break;
        }
        let alpha = rs_old / denom;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        let rs_new: f64 = r.iter().map(|v| v * v).sum();
        if rs_new.sqrt() < config.tol {
            converged = true;
            rs_old = rs_new;
            break;
        }
        let beta = rs_new / rs_old;
        for i in 0..n {
            p[i] = r[i] + beta * p[i];
        }
        rs_old = rs_new;
    }

    CgResult {
        x,
        iterations,
        residual: rs_old.sqrt(),
        converged,
    }
}
