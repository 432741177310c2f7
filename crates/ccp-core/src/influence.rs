// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Influence
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discrete max-decay influence maps.
//!
//! Seeds a scalar field at tagged cells and relaxes it outward: each step
//! writes `max(4-neighbour values) × decay` into a cell when that beats its
//! current value. The result is a cheap, deterministic proximity field for
//! scaling sink/source terms near pumps, inlets and RF surfaces. This is a
//! bounded fixed-point iteration, not a diffusion solve.

use std::collections::BTreeMap;

use ndarray::Array2;

/// Update threshold: smaller improvements do not count as change.
const RELAX_EPS: f64 = 1e-9;

/// Relax a seeded influence field over at most `steps` sweeps.
///
/// Double-buffered: every sweep reads the previous iteration only, so the
/// result does not depend on cell visit order. Stops early once a full
/// sweep leaves the field unchanged.
pub fn relax_influence(seed: &Array2<f64>, steps: usize, decay: f64) -> Array2<f64> {
    let (nz, nr) = seed.dim();
    if nz == 0 || nr == 0 || steps == 0 {
        return seed.clone();
    }

    let mut influence = seed.clone();
    for _ in 0..steps {
        let mut updated = influence.clone();
        let mut changed = false;
        for k in 0..nz {
            for j in 0..nr {
                let north = if k > 0 { influence[[k - 1, j]] } else { 0.0 };
                let south = if k + 1 < nz { influence[[k + 1, j]] } else { 0.0 };
                let west = if j > 0 { influence[[k, j - 1]] } else { 0.0 };
                let east = if j + 1 < nr { influence[[k, j + 1]] } else { 0.0 };
                let propagated = north.max(south).max(west).max(east) * decay;
                if propagated > updated[[k, j]] + RELAX_EPS {
                    updated[[k, j]] = propagated;
                    changed = true;
                }
            }
        }
        influence = updated;
        if !changed {
            break;
        }
    }
    influence
}

/// Seed map: per-tag weight summed into every cell the tag covers.
/// Missing masks and non-positive weights contribute nothing.
pub fn tag_weight_map(
    tag_mask: Option<&BTreeMap<String, Vec<Vec<bool>>>>,
    tag_weights: &BTreeMap<String, f64>,
    nz: usize,
    nr: usize,
) -> Array2<f64> {
    let mut weighted = Array2::zeros((nz, nr));
    let Some(masks) = tag_mask else {
        return weighted;
    };

    for (tag, &weight) in tag_weights {
        if weight <= 0.0 {
            continue;
        }
        let Some(mask) = masks.get(tag) else {
            continue;
        };
        for (k, row) in mask.iter().enumerate().take(nz) {
            for (j, &cell) in row.iter().enumerate().take(nr) {
                if cell {
                    weighted[[k, j]] += weight;
                }
            }
        }
    }
    weighted
}

/// Boolean union of the named tag masks.
pub fn tag_union_mask<'a, I>(
    tag_mask: Option<&BTreeMap<String, Vec<Vec<bool>>>>,
    tags: I,
    nz: usize,
    nr: usize,
) -> Array2<bool>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut union = Array2::from_elem((nz, nr), false);
    let Some(masks) = tag_mask else {
        return union;
    };

    for tag in tags {
        let key = tag.trim();
        if key.is_empty() {
            continue;
        }
        let Some(mask) = masks.get(key) else {
            continue;
        };
        for (k, row) in mask.iter().enumerate().take(nz) {
            for (j, &cell) in row.iter().enumerate().take(nr) {
                if cell {
                    union[[k, j]] = true;
                }
            }
        }
    }
    union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relax_decays_with_distance() {
        let mut seed = Array2::zeros((5, 5));
        seed[[2, 2]] = 1.0;
        let influence = relax_influence(&seed, 10, 0.9);

        assert!((influence[[2, 2]] - 1.0).abs() < 1e-12, "seed stays fixed");
        assert!((influence[[2, 3]] - 0.9).abs() < 1e-12);
        assert!((influence[[2, 4]] - 0.81).abs() < 1e-12);
        // Manhattan distance 2 via any path
        assert!((influence[[3, 3]] - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_relax_zero_steps_is_identity() {
        let mut seed = Array2::zeros((3, 3));
        seed[[0, 0]] = 2.0;
        let influence = relax_influence(&seed, 0, 0.9);
        assert_eq!(influence, seed);
    }

    #[test]
    fn test_relax_early_exit_matches_long_run() {
        let mut seed = Array2::zeros((4, 4));
        seed[[0, 0]] = 1.0;
        // 6 steps are enough to cover a 4x4 grid; 50 must give the same field.
        let short = relax_influence(&seed, 6, 0.85);
        let long = relax_influence(&seed, 50, 0.85);
        assert_eq!(short, long);
    }

    #[test]
    fn test_relax_keeps_stronger_existing_values() {
        let mut seed = Array2::zeros((1, 3));
        seed[[0, 0]] = 1.0;
        seed[[0, 1]] = 0.95;
        let influence = relax_influence(&seed, 4, 0.5);
        // 1.0 * 0.5 would be weaker than the existing 0.95
        assert!((influence[[0, 1]] - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_tag_weight_map_sums_overlaps() {
        let mut masks = BTreeMap::new();
        masks.insert("a".to_string(), vec![vec![true, false], vec![true, false]]);
        masks.insert("b".to_string(), vec![vec![true, true], vec![false, false]]);
        let mut weights = BTreeMap::new();
        weights.insert("a".to_string(), 1.5);
        weights.insert("b".to_string(), 2.0);
        weights.insert("missing".to_string(), 4.0);

        let map = tag_weight_map(Some(&masks), &weights, 2, 2);
        assert!((map[[0, 0]] - 3.5).abs() < 1e-12);
        assert!((map[[0, 1]] - 2.0).abs() < 1e-12);
        assert!((map[[1, 0]] - 1.5).abs() < 1e-12);
        assert_eq!(map[[1, 1]], 0.0);
    }

    #[test]
    fn test_tag_union_mask() {
        let mut masks = BTreeMap::new();
        masks.insert("a".to_string(), vec![vec![true, false]]);
        masks.insert("b".to_string(), vec![vec![false, true]]);

        let union = tag_union_mask(Some(&masks), ["a", "b", "absent"], 1, 2);
        assert!(union[[0, 0]] && union[[0, 1]]);

        let none = tag_union_mask(None, ["a"], 1, 2);
        assert!(!none[[0, 0]] && !none[[0, 1]]);
    }
}
