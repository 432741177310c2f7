// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Property-Based Tests (proptest) for ccp-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for ccp-types using proptest.
//!
//! Covers: ChamberGrid construction invariants, mask-cell indexing,
//! gas-mixture validation.

use ccp_types::config::{Gas, GasComponent, GeometryGrid};
use ccp_types::state::ChamberGrid;
use proptest::prelude::*;

// ── ChamberGrid Construction Invariants ──────────────────────────────

proptest! {
    /// Grid dimensions and coordinate lengths match constructor arguments.
    #[test]
    fn grid_dimensions_match(
        nr in 2usize..128,
        nz in 2usize..128,
    ) {
        let grid = ChamberGrid::new(nr, nz, 25.0, 40.0);

        prop_assert_eq!(grid.nr, nr);
        prop_assert_eq!(grid.nz, nz);
        prop_assert_eq!(grid.r.len(), nr);
        prop_assert_eq!(grid.z.len(), nz);
    }

    /// Coordinates span [0, max] with uniform spacing.
    #[test]
    fn grid_spans_domain(
        nr in 3usize..64,
        nz in 3usize..64,
        r_max in 1.0f64..200.0,
        z_max in 1.0f64..200.0,
    ) {
        let grid = ChamberGrid::new(nr, nz, r_max, z_max);

        prop_assert!(grid.r[0].abs() < 1e-12);
        prop_assert!((grid.r[nr - 1] - r_max).abs() < 1e-9);
        prop_assert!(grid.z[0].abs() < 1e-12);
        prop_assert!((grid.z[nz - 1] - z_max).abs() < 1e-9);

        for i in 1..nr {
            let delta = grid.r[i] - grid.r[i - 1];
            prop_assert!((delta - grid.dr).abs() < 1e-9,
                "Non-uniform r spacing at {}: delta={}, dr={}", i, delta, grid.dr);
        }
        for i in 1..nz {
            let delta = grid.z[i] - grid.z[i - 1];
            prop_assert!((delta - grid.dz).abs() < 1e-9,
                "Non-uniform z spacing at {}: delta={}, dz={}", i, delta, grid.dz);
        }
    }

    /// r and z coordinates are strictly monotonically increasing.
    #[test]
    fn grid_monotone(nr in 3usize..64, nz in 3usize..64) {
        let grid = ChamberGrid::new(nr, nz, 10.0, 10.0);
        for i in 1..nr {
            prop_assert!(grid.r[i] > grid.r[i - 1]);
        }
        for i in 1..nz {
            prop_assert!(grid.z[i] > grid.z[i - 1]);
        }
    }
}

// ── Mask Indexing Invariants ─────────────────────────────────────────

proptest! {
    /// Out-of-range mask lookups always read as untagged.
    #[test]
    fn mask_cell_out_of_range_is_false(
        nz in 1usize..12,
        nr in 1usize..12,
        iz in 0usize..24,
        ir in 0usize..24,
    ) {
        let mask = vec![vec![true; nr]; nz];
        let inside = iz < nz && ir < nr;
        prop_assert_eq!(GeometryGrid::mask_cell(&mask, iz, ir), inside);
    }
}

// ── Gas Mixture Invariants ───────────────────────────────────────────

proptest! {
    /// Any normalized split between two species sums to one.
    #[test]
    fn gas_fractions_normalized(fraction in 0.0f64..=1.0) {
        let gas = Gas {
            mixture: vec![
                GasComponent { species: "Ar".into(), fraction },
                GasComponent { species: "O2".into(), fraction: 1.0 - fraction },
            ],
        };
        let total: f64 = gas.mixture.iter().map(|c| c.fraction).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }
}
