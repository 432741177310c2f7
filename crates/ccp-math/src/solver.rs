// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Pluggable linear-solver seam.
//!
//! The electrostatic solve is written against [`LinearSolver`] so the
//! direct-vs-iterative choice is made at build time by the consuming crate
//! (a cargo feature selecting [`BandLu`] or [`ConjugateGradient`]), not by
//! probing for an optional dependency at runtime.

use ccp_types::error::{CcpError, CcpResult};

use crate::band::band_lu_solve;
use crate::cg::{cg_solve, CgConfig};
use crate::csr::CsrMatrix;

pub trait LinearSolver {
    fn name(&self) -> &'static str;
    fn solve(&self, matrix: &CsrMatrix, b: &[f64]) -> CcpResult<Vec<f64>>;
}

/// Banded direct LU backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandLu;

impl LinearSolver for BandLu {
    fn name(&self) -> &'static str {
        "band_lu"
    }

    fn solve(&self, matrix: &CsrMatrix, b: &[f64]) -> CcpResult<Vec<f64>> {
        let x = band_lu_solve(matrix, b)?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(CcpError::LinAlg("non-finite direct solution".into()));
        }
        Ok(x)
    }
}

/// Bounded conjugate-gradient backend (SPD systems only).
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    pub config: CgConfig,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        ConjugateGradient {
            config: CgConfig::default(),
        }
    }
}

impl LinearSolver for ConjugateGradient {
    fn name(&self) -> &'static str {
        "conjugate_gradient"
    }

    fn solve(&self, matrix: &CsrMatrix, b: &[f64]) -> CcpResult<Vec<f64>> {
        let result = cg_solve(matrix, b, &self.config);
        if result.x.iter().any(|v| !v.is_finite()) {
            return Err(CcpError::LinAlg(format!(
                "non-finite CG solution after {} iterations",
                result.iterations
            )));
        }
        Ok(result.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::TripletMatrix;

    fn spd_system() -> (CsrMatrix, Vec<f64>) {
        let n = 9;
        let mut triplets = TripletMatrix::new(n);
        for i in 0..n {
            triplets.add(i, i, 4.0);
            if i % 3 != 0 {
                triplets.add(i, i - 1, -1.0);
            }
            if (i + 1) % 3 != 0 {
                triplets.add(i, i + 1, -1.0);
            }
            if i >= 3 {
                triplets.add(i, i - 3, -1.0);
            }
            if i + 3 < n {
                triplets.add(i, i + 3, -1.0);
            }
        }
        let b = (0..n).map(|i| (i as f64).sin()).collect();
        (triplets.to_csr(), b)
    }

    #[test]
    fn test_backends_agree() {
        let (matrix, b) = spd_system();
        let direct = BandLu.solve(&matrix, &b).unwrap();
        let iterative = ConjugateGradient::default().solve(&matrix, &b).unwrap();
        for (d, c) in direct.iter().zip(&iterative) {
            assert!((d - c).abs() < 1e-8, "backends disagree: {d} vs {c}");
        }
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(BandLu.name(), "band_lu");
        assert_eq!(ConjugateGradient::default().name(), "conjugate_gradient");
    }
}
