// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Band
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Banded LU direct solver.
//!
//! The 5-point stencil on an [nz, nr] grid yields a pentadiagonal system
//! with half bandwidth nr, and banded elimination preserves that band with
//! no fill outside it. Factorization runs without pivoting: the assembled
//! systems are diagonally dominant (Dirichlet identity rows, positive face
//! sums on the diagonal), so pivots stay away from zero. A vanishing pivot
//! is reported as a `LinAlg` error for the caller's fallback path rather
//! than panicking.

use ccp_types::error::{CcpError, CcpResult};

use crate::csr::CsrMatrix;

/// Pivot magnitude below which the factorization is treated as singular.
const PIVOT_EPS: f64 = 1e-300;

/// Solve A·x = b by banded LU factorization.
pub fn band_lu_solve(matrix: &CsrMatrix, b: &[f64]) -> CcpResult<Vec<f64>> {
    let n = matrix.n;
    if n == 0 {
        return Ok(Vec::new());
    }
    if b.len() != n {
        return Err(CcpError::LinAlg(format!(
            "rhs length {} does not match system size {n}",
            b.len()
        )));
    }

    let p = matrix.bandwidth().min(n - 1);
    let width = 2 * p + 1;

    // Dense band storage: entry (i, j) lives at band[i * width + (j - i + p)].
    let mut band = vec![0.0; n * width];
    for i in 0..n {
        let (cols, vals) = matrix.row(i);
        for (&j, &value) in cols.iter().zip(vals) {
            band[i * width + (j + p - i)] = value;
        }
    }

    // In-place LU: multipliers overwrite the strictly-lower band.
    for k in 0..n {
        let pivot = band[k * width + p];
        if !pivot.is_finite() || pivot.abs() < PIVOT_EPS {
            return Err(CcpError::LinAlg(format!("zero pivot at row {k}")));
        }
        let i_hi = (k + p).min(n - 1);
        for i in (k + 1)..=i_hi {
            let factor = band[i * width + (k + p - i)] / pivot;
            band[i * width + (k + p - i)] = factor;
            if factor == 0.0 {
                continue;
            }
            let j_hi = (k + p).min(n - 1);
            for j in (k + 1)..=j_hi {
                band[i * width + (j + p - i)] -= factor * band[k * width + (j + p - k)];
            }
        }
    }

    // Forward substitution: L·y = b.
    let mut x = b.to_vec();
    for i in 0..n {
        let j_lo = i.saturating_sub(p);
        let mut acc = x[i];
        for j in j_lo..i {
            acc -= band[i * width + (j + p - i)] * x[j];
        }
        x[i] = acc;
    }

    // Back substitution: U·x = y.
    for i in (0..n).rev() {
        let j_hi = (i + p).min(n - 1);
        let mut acc = x[i];
        for j in (i + 1)..=j_hi {
            acc -= band[i * width + (j + p - i)] * x[j];
        }
        x[i] = acc / band[i * width + p];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::TripletMatrix;

    fn laplacian_1d(n: usize) -> CsrMatrix {
        let mut triplets = TripletMatrix::new(n);
        for i in 0..n {
            triplets.add(i, i, 2.0);
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
    fn test_band_lu_identity() {
        let mut triplets = TripletMatrix::new(5);
        for i in 0..5 {
            triplets.add(i, i, 1.0);
        }
        let b = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x = band_lu_solve(&triplets.to_csr(), &b).unwrap();
        for i in 0..5 {
            assert!((x[i] - b[i]).abs() < 1e-14, "x[{i}] should equal b[{i}]");
        }
    }

    #[test]
    fn test_band_lu_laplacian_residual() {
        let matrix = laplacian_1d(16);
        let b: Vec<f64> = (0..16).map(|i| ((i as f64) * 0.7).sin()).collect();
        let x = band_lu_solve(&matrix, &b).unwrap();
        assert!(
            matrix.residual_inf(&x, &b) < 1e-10,
            "Ax should reproduce b"
        );
    }

    #[test]
    fn test_band_lu_pentadiagonal_residual() {
        // 5-point stencil pattern on a 4x4 grid (half bandwidth 4).
        let nr = 4;
        let n = nr * nr;
        let mut triplets = TripletMatrix::new(n);
        for i in 0..n {
            triplets.add(i, i, 4.5);
            if i % nr != 0 {
                triplets.add(i, i - 1, -1.0);
            }
            if (i + 1) % nr != 0 {
                triplets.add(i, i + 1, -1.0);
            }
            if i >= nr {
                triplets.add(i, i - nr, -1.0);
            }
            if i + nr < n {
                triplets.add(i, i + nr, -1.0);
            }
        }
        let matrix = triplets.to_csr();
        assert_eq!(matrix.bandwidth(), nr);

        let b: Vec<f64> = (0..n).map(|i| 1.0 + (i % 3) as f64).collect();
        let x = band_lu_solve(&matrix, &b).unwrap();
        assert!(matrix.residual_inf(&x, &b) < 1e-10);
    }

    #[test]
    fn test_band_lu_zero_pivot_reported() {
        let mut triplets = TripletMatrix::new(2);
        triplets.add(0, 0, 0.0);
        triplets.add(0, 1, 1.0);
        triplets.add(1, 0, 1.0);
        triplets.add(1, 1, 1.0);
        let err = band_lu_solve(&triplets.to_csr(), &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, CcpError::LinAlg(_)));
    }
}
