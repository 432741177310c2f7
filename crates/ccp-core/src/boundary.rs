// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Boundary
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dirichlet boundary assembly for electrodes and grounded walls.
//!
//! Powered cells superpose the phasors of the RF sources that reach them
//! (by tag match, with untagged and all-source fallbacks), are rescaled so
//! the hottest cell equals the requested drive amplitude, then shifted by
//! the global and per-tag DC offsets. Ground and wall cells carry only
//! their local per-tag offset.

use std::collections::BTreeMap;

use ndarray::Array2;
use num_complex::Complex64;

use ccp_types::config::{GeometryGrid, RegionKind, SimulationRequest};

use crate::rf_drive::{boundary_drive_components, dc_bias_region_offsets, BoundaryDriveComponent};

/// Fixed-value cells for the electrostatic solve.
#[derive(Debug, Clone)]
pub struct DirichletSet {
    pub mask: Array2<bool>,
    pub values: Array2<f64>,
}

fn cell_matches_source_tag(
    grid: &GeometryGrid,
    k: usize,
    j: usize,
    surface_tag: Option<&str>,
) -> bool {
    let Some(tag) = surface_tag else {
        // Untagged sources reach every powered cell.
        return true;
    };
    let Some(mask) = grid.tag(tag) else {
        return false;
    };
    GeometryGrid::mask_cell(mask, k, j)
}

fn local_region_offset(
    grid: &GeometryGrid,
    offsets: &BTreeMap<String, f64>,
    k: usize,
    j: usize,
) -> f64 {
    if offsets.is_empty() {
        return 0.0;
    }
    let mut offset = 0.0;
    for (tag, tag_offset) in offsets {
        let Some(mask) = grid.tag(tag) else {
            continue;
        };
        if GeometryGrid::mask_cell(mask, k, j) {
            offset += tag_offset;
        }
    }
    offset
}

/// Build the Dirichlet mask and values.
pub fn build_dirichlet(
    request: &SimulationRequest,
    grid: &GeometryGrid,
    regions: &Array2<RegionKind>,
    powered_voltage: f64,
    dc_offset: f64,
) -> DirichletSet {
    let nz = grid.nz;
    let nr = grid.nr;
    let mut mask = Array2::from_elem((nz, nr), false);
    let mut values = Array2::zeros((nz, nr));

    let rf_components = boundary_drive_components(request);
    let any_tagged_source = rf_components.iter().any(|c| c.surface_tag.is_some());
    let untagged_components: Vec<&BoundaryDriveComponent> = rf_components
        .iter()
        .filter(|c| c.surface_tag.is_none())
        .collect();
    let region_offsets = dc_bias_region_offsets(request);

    let mut powered_cells: Vec<(usize, usize)> = Vec::new();
    let mut powered_local_offsets: BTreeMap<(usize, usize), f64> = BTreeMap::new();

    for k in 0..nz {
        for j in 0..nr {
            match regions[[k, j]] {
                RegionKind::PoweredElectrode => {
                    mask[[k, j]] = true;
                    powered_cells.push((k, j));

                    let matched: Vec<&BoundaryDriveComponent> = rf_components
                        .iter()
                        .filter(|c| {
                            cell_matches_source_tag(grid, k, j, c.surface_tag.as_deref())
                        })
                        .collect();
                    let matched = if !matched.is_empty() {
                        matched
                    } else if any_tagged_source && !untagged_components.is_empty() {
                        untagged_components.clone()
                    } else {
                        rf_components.iter().collect()
                    };

                    values[[k, j]] = if matched.is_empty() {
                        powered_voltage
                    } else {
                        let resultant: Complex64 = matched.iter().map(|c| c.phasor).sum();
                        resultant.norm()
                    };
                    powered_local_offsets
                        .insert((k, j), local_region_offset(grid, &region_offsets, k, j));
                }
                RegionKind::GroundElectrode | RegionKind::SolidWall => {
                    mask[[k, j]] = true;
                    values[[k, j]] = local_region_offset(grid, &region_offsets, k, j);
                }
                RegionKind::Plasma | RegionKind::Dielectric => {}
            }
        }
    }

    if !powered_cells.is_empty() {
        let max_drive = powered_cells
            .iter()
            .map(|&(k, j)| values[[k, j]])
            .fold(0.0_f64, f64::max);
        if max_drive > 0.0 {
            let scale = powered_voltage / max_drive;
            for &(k, j) in &powered_cells {
                values[[k, j]] = values[[k, j]] * scale
                    + dc_offset
                    + powered_local_offsets.get(&(k, j)).copied().unwrap_or(0.0);
            }
        } else {
            for &(k, j) in &powered_cells {
                values[[k, j]] =
                    dc_offset + powered_local_offsets.get(&(k, j)).copied().unwrap_or(0.0);
            }
        }
    }

    DirichletSet { mask, values }
}
