// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Materials
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-cell material maps seeded from region types, overridden per tag.
//!
//! Computed once per request and reused unchanged by the perturbed
//! baseline re-solve.

use std::collections::BTreeMap;

use ndarray::Array2;

use ccp_types::config::{GeometryGrid, MaterialConfig, RegionKind};
use ccp_types::state::GridSummary;

/// Relative permittivity map: 1.0 except dielectric regions, which take
/// the default material value; per-tag overrides win where masked.
pub fn build_epsilon_map(
    grid: &GeometryGrid,
    regions: &Array2<RegionKind>,
    material: &MaterialConfig,
) -> Array2<f64> {
    let mut eps = Array2::from_elem((grid.nz, grid.nr), 1.0);
    for k in 0..grid.nz {
        for j in 0..grid.nr {
            if regions[[k, j]] == RegionKind::Dielectric {
                eps[[k, j]] = material.default.epsilon_r;
            }
        }
    }

    for region_override in &material.regions {
        let Some(epsilon_r) = region_override.epsilon_r else {
            continue;
        };
        let Some(mask) = grid.tag(&region_override.target_tag) else {
            continue;
        };
        for k in 0..grid.nz {
            for j in 0..grid.nr {
                if GeometryGrid::mask_cell(mask, k, j) {
                    eps[[k, j]] = epsilon_r;
                }
            }
        }
    }

    eps
}

/// Wall-loss map: clamped default everywhere, per-tag overrides where masked.
pub fn build_wall_loss_map(grid: &GeometryGrid, material: &MaterialConfig) -> Array2<f64> {
    let default_loss = material.default.wall_loss_e.clamp(0.0, 1.0);
    let mut wall_loss = Array2::from_elem((grid.nz, grid.nr), default_loss);

    for region_override in &material.regions {
        let Some(wall_loss_e) = region_override.wall_loss_e else {
            continue;
        };
        let Some(mask) = grid.tag(&region_override.target_tag) else {
            continue;
        };
        let loss_value = wall_loss_e.clamp(0.0, 1.0);
        for k in 0..grid.nz {
            for j in 0..grid.nr {
                if GeometryGrid::mask_cell(mask, k, j) {
                    wall_loss[[k, j]] = loss_value;
                }
            }
        }
    }

    wall_loss
}

/// Tags that never restrict the absorbed-power-density proxy: chamber-wide
/// tags, pump/exhaust surfaces, and the generic region-type names.
fn is_excluded_power_tag(tag: &str) -> bool {
    let normalized = tag.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized.contains("chamber") {
        return true;
    }
    if normalized.contains("pump")
        || normalized.contains("outlet")
        || normalized.contains("exhaust")
    {
        return true;
    }
    matches!(
        normalized.as_str(),
        "plasma" | "solid_wall" | "powered_electrode" | "ground_electrode" | "dielectric"
    )
}

/// Union of explicit geometry tags the absorbed-power proxy is allowed on.
/// `None` when there is no tag mask or no tag survives the exclusions.
pub fn power_geometry_mask(grid: &GeometryGrid) -> Option<Array2<bool>> {
    let masks = grid.tag_mask.as_ref()?;
    let mut union = Array2::from_elem((grid.nz, grid.nr), false);
    let mut any = false;
    for (tag, mask) in masks {
        if is_excluded_power_tag(tag) {
            continue;
        }
        any = true;
        for (k, row) in mask.iter().enumerate().take(grid.nz) {
            for (j, &cell) in row.iter().enumerate().take(grid.nr) {
                if cell {
                    union[[k, j]] = true;
                }
            }
        }
    }
    if any {
        Some(union)
    } else {
        None
    }
}

/// Region-type and tag cell counts for solver metadata.
pub fn grid_summary(grid: &GeometryGrid, regions: &Array2<RegionKind>) -> GridSummary {
    let mut region_type_counts: BTreeMap<String, usize> = BTreeMap::new();
    for kind in grid.region_legend.values() {
        region_type_counts.entry(kind.as_str().to_string()).or_insert(0);
    }
    for kind in regions.iter() {
        *region_type_counts
            .entry(kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    let tag_counts = grid.tag_mask.as_ref().map(|masks| {
        masks
            .iter()
            .map(|(tag, mask)| {
                let count = mask
                    .iter()
                    .map(|row| row.iter().filter(|&&cell| cell).count())
                    .sum();
                (tag.clone(), count)
            })
            .collect()
    });

    GridSummary {
        region_type_counts,
        tag_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccp_types::config::{MaterialOverride, MaterialProps};

    fn test_grid() -> (GeometryGrid, Array2<RegionKind>) {
        let mut tag_mask = BTreeMap::new();
        tag_mask.insert(
            "window".to_string(),
            vec![
                vec![false, false, false],
                vec![false, true, false],
                vec![false, false, false],
            ],
        );
        tag_mask.insert(
            "bottom_pump".to_string(),
            vec![
                vec![true, false, false],
                vec![false, false, false],
                vec![false, false, false],
            ],
        );
        let grid = GeometryGrid {
            nr: 3,
            nz: 3,
            region_id: vec![vec![0, 0, 1], vec![0, 4, 1], vec![2, 2, 2]],
            region_legend: [
                ("0".to_string(), RegionKind::Plasma),
                ("1".to_string(), RegionKind::SolidWall),
                ("2".to_string(), RegionKind::PoweredElectrode),
                ("4".to_string(), RegionKind::Dielectric),
            ]
            .into_iter()
            .collect(),
            tag_mask: Some(tag_mask),
        };
        let regions = grid.region_map().unwrap();
        (grid, regions)
    }

    fn material(epsilon_override: Option<f64>, loss_override: Option<f64>) -> MaterialConfig {
        MaterialConfig {
            name: None,
            default: MaterialProps {
                epsilon_r: 4.0,
                wall_loss_e: 0.2,
            },
            regions: vec![MaterialOverride {
                target_tag: "window".to_string(),
                epsilon_r: epsilon_override,
                wall_loss_e: loss_override,
            }],
        }
    }

    #[test]
    fn test_epsilon_map_dielectric_and_override() {
        let (grid, regions) = test_grid();
        let eps = build_epsilon_map(&grid, &regions, &material(Some(6.0), None));
        assert!((eps[[0, 0]] - 1.0).abs() < 1e-12, "plasma cell stays 1.0");
        assert!((eps[[1, 1]] - 6.0).abs() < 1e-12, "tag override wins");
        assert!((eps[[2, 0]] - 1.0).abs() < 1e-12, "electrode stays 1.0");
    }

    #[test]
    fn test_epsilon_map_default_dielectric_without_override() {
        let (grid, regions) = test_grid();
        let eps = build_epsilon_map(&grid, &regions, &material(None, None));
        assert!((eps[[1, 1]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_wall_loss_map_default_and_override() {
        let (grid, _) = test_grid();
        let wall_loss = build_wall_loss_map(&grid, &material(None, Some(0.7)));
        assert!((wall_loss[[0, 0]] - 0.2).abs() < 1e-12);
        assert!((wall_loss[[1, 1]] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_power_geometry_mask_excludes_pump_tags() {
        let (grid, _) = test_grid();
        let mask = power_geometry_mask(&grid).expect("window tag should survive");
        assert!(mask[[1, 1]], "window cell kept");
        assert!(!mask[[0, 0]], "pump cell excluded");
    }

    #[test]
    fn test_power_geometry_mask_none_without_explicit_tags() {
        let (mut grid, _) = test_grid();
        grid.tag_mask = None;
        assert!(power_geometry_mask(&grid).is_none());
    }

    #[test]
    fn test_grid_summary_counts() {
        let (grid, regions) = test_grid();
        let summary = grid_summary(&grid, &regions);
        assert_eq!(summary.region_type_counts["plasma"], 3);
        assert_eq!(summary.region_type_counts["powered_electrode"], 3);
        assert_eq!(summary.region_type_counts["dielectric"], 1);
        let tags = summary.tag_counts.unwrap();
        assert_eq!(tags["window"], 1);
        assert_eq!(tags["bottom_pump"], 1);
    }
}
