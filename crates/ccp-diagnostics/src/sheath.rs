// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Sheath
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sheath boundary extraction and metrics.
//!
//! Each radial column is scanned from z = 0 (electrode side) upward; the
//! sheath edge is the first height where the potential has collapsed below
//! a fixed fraction of the drive scale, or where |E| falls under a fraction
//! of its column peak. The electrode surface estimate prefers an explicit
//! powered-electrode-surface tag over scanning the region grid.

use ndarray::Array2;

use ccp_types::config::{GeometryGrid, RegionKind};
use ccp_types::state::{Point2D, Sheath, SheathMetrics};

/// Potential-drop fraction for the default extraction method.
const PHI_DROP_FRACTION: f64 = 0.9;

/// Column-max fraction for the |E|-threshold method.
const EMAG_THRESHOLD_FRACTION: f64 = 0.2;

/// Sheath boundary extraction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheathMethod {
    /// First z where φ ≤ (1 − fraction) of the normalized drive scale.
    #[default]
    PhiDropFraction,
    /// First z where |E| ≤ fraction × column max.
    EMagThreshold,
}

fn boundary_to_sheath(
    z_boundary: Vec<f64>,
    r_values: &[f64],
    z_values: &[f64],
) -> Sheath {
    let nr = z_boundary.len();
    let nz = z_values.len();
    let polyline_mm = (0..nr)
        .map(|j| Point2D {
            r_mm: r_values[j],
            z_mm: z_boundary[j],
        })
        .collect();
    let mask = Array2::from_shape_fn((nz, nr), |(k, j)| z_values[k] <= z_boundary[j]);
    Sheath { polyline_mm, mask }
}

fn sheath_from_phi_drop(
    phi: &Array2<f64>,
    r_values: &[f64],
    z_values: &[f64],
    fraction: f64,
) -> Sheath {
    let (nz, nr) = phi.dim();
    let threshold = (1.0 - fraction) * 1.0;
    let mut z_boundary = vec![z_values[nz - 1]; nr];

    for j in 0..nr {
        for k in 0..nz {
            if phi[[k, j]] <= threshold {
                z_boundary[j] = z_values[k];
                break;
            }
        }
    }

    boundary_to_sheath(z_boundary, r_values, z_values)
}

fn sheath_from_emag_threshold(
    e_mag: &Array2<f64>,
    r_values: &[f64],
    z_values: &[f64],
    threshold: f64,
) -> Sheath {
    let (nz, nr) = e_mag.dim();
    let mut z_boundary = vec![z_values[nz - 1]; nr];

    for j in 0..nr {
        let column_max = (0..nz).map(|k| e_mag[[k, j]]).fold(0.0_f64, f64::max);
        let cutoff = column_max * threshold;
        for k in 0..nz {
            if e_mag[[k, j]] <= cutoff {
                z_boundary[j] = z_values[k];
                break;
            }
        }
    }

    boundary_to_sheath(z_boundary, r_values, z_values)
}

/// Extract the sheath boundary polyline and below-boundary mask.
pub fn build_sheath(
    phi: &Array2<f64>,
    e_mag: &Array2<f64>,
    r_values: &[f64],
    z_values: &[f64],
    method: SheathMethod,
) -> Sheath {
    match method {
        SheathMethod::PhiDropFraction => {
            sheath_from_phi_drop(phi, r_values, z_values, PHI_DROP_FRACTION)
        }
        SheathMethod::EMagThreshold => {
            sheath_from_emag_threshold(e_mag, r_values, z_values, EMAG_THRESHOLD_FRACTION)
        }
    }
}

/// Sheath z per radial column, straight from the polyline.
pub fn extract_sheath_z_by_r(sheath: &Sheath) -> Vec<f64> {
    sheath.polyline_mm.iter().map(|point| point.z_mm).collect()
}

fn format_index_list(indices: &[usize], limit: usize) -> String {
    let shown: Vec<String> = indices.iter().take(limit).map(|i| i.to_string()).collect();
    if indices.len() > limit {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

/// Powered-electrode surface tags, preferring explicit surface/face/boundary
/// tags. Returns the sorted candidates and whether the implicit fallback set
/// was used.
fn select_powered_surface_tags(grid: &GeometryGrid) -> (Vec<String>, bool) {
    let mut candidates: Vec<String> = Vec::new();
    let mut fallback: Vec<String> = Vec::new();
    if let Some(masks) = &grid.tag_mask {
        for tag in masks.keys() {
            let normalized = tag.trim().to_ascii_lowercase();
            if normalized.contains("powered") && normalized.contains("electrode") {
                if ["surface", "face", "boundary"]
                    .iter()
                    .any(|token| normalized.contains(token))
                {
                    candidates.push(tag.clone());
                } else {
                    fallback.push(tag.clone());
                }
            }
        }
    }
    if !candidates.is_empty() {
        candidates.sort();
        return (candidates, false);
    }
    fallback.sort();
    let used_fallback = !fallback.is_empty();
    (fallback, used_fallback)
}

/// Estimate the powered-electrode surface height per radial column.
///
/// Prefers an explicit surface tag; otherwise scans the region grid for the
/// topmost powered cell in each column, flagging disconnected segments.
/// Columns with no powered cell default to z = 0 with a warning.
pub fn estimate_electrode_surface_z(
    grid: &GeometryGrid,
    regions: &Array2<RegionKind>,
    z_values: &[f64],
) -> (Vec<f64>, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let nr = grid.nr;
    let nz = grid.nz;
    let mut electrode_z = vec![z_values[0]; nr];

    let (candidate_tags, used_fallback) = select_powered_surface_tags(grid);
    if let Some(chosen_tag) = candidate_tags.first() {
        if candidate_tags.len() > 1 {
            warnings.push(format!(
                "multiple powered electrode surface tags found; using '{chosen_tag}'"
            ));
        }
        if used_fallback {
            warnings.push(format!(
                "no explicit powered electrode surface tag; using '{chosen_tag}'"
            ));
        }
        if let Some(mask) = grid.tag(chosen_tag) {
            let mut missing_cols: Vec<usize> = Vec::new();
            for (j, electrode) in electrode_z.iter_mut().enumerate() {
                let top = (0..nz)
                    .filter(|&k| GeometryGrid::mask_cell(mask, k, j))
                    .max();
                match top {
                    Some(k) => *electrode = z_values[k],
                    None => {
                        *electrode = z_values[0];
                        missing_cols.push(j);
                    }
                }
            }
            if !missing_cols.is_empty() {
                warnings.push(format!(
                    "no powered electrode surface mask in columns {}; defaulted electrode_z to z0",
                    format_index_list(&missing_cols, 6)
                ));
            }
            return (electrode_z, warnings);
        }
    } else if grid.tag_mask.is_some() {
        warnings.push(
            "no powered electrode surface tag found in geometry.grid.tag_mask; \
             falling back to region scan"
                .to_string(),
        );
    }

    let mut missing_cols: Vec<usize> = Vec::new();
    let mut disconnected_cols: Vec<usize> = Vec::new();
    for (j, electrode) in electrode_z.iter_mut().enumerate() {
        let powered: Vec<usize> = (0..nz)
            .filter(|&k| regions[[k, j]] == RegionKind::PoweredElectrode)
            .collect();
        if powered.is_empty() {
            *electrode = z_values[0];
            missing_cols.push(j);
            continue;
        }
        let segments = 1 + powered.windows(2).filter(|pair| pair[1] - pair[0] > 1).count();
        if segments > 1 {
            disconnected_cols.push(j);
        }
        *electrode = z_values[*powered.last().unwrap_or(&0)];
    }

    if !disconnected_cols.is_empty() {
        warnings.push(format!(
            "powered electrode has disconnected segments in columns {}; using max z",
            format_index_list(&disconnected_cols, 6)
        ));
    }
    if !missing_cols.is_empty() {
        warnings.push(format!(
            "no powered electrode in columns {}; defaulted electrode_z to z0",
            format_index_list(&missing_cols, 6)
        ));
    }

    (electrode_z, warnings)
}

/// (mean, min, max) over a slice; zeros for an empty slice.
pub fn summary_stats(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (mean, min, max)
}

/// (mean, min, max) over the finite entries; `None` when nothing is finite.
pub fn summary_stats_optional(
    values: Option<&Vec<f64>>,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    let Some(values) = values else {
        return (None, None, None);
    };
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return (None, None, None);
    }
    let (mean, min, max) = summary_stats(&finite);
    (Some(mean), Some(min), Some(max))
}

/// Per-column sheath z, electrode surface z and sheath thickness.
pub fn compute_sheath_metrics(
    grid: &GeometryGrid,
    regions: &Array2<RegionKind>,
    sheath: &Sheath,
    z_values: &[f64],
) -> SheathMetrics {
    let z_mm_by_r = extract_sheath_z_by_r(sheath);
    let (electrode_z_mm_by_r, warnings) = estimate_electrode_surface_z(grid, regions, z_values);
    let thickness_mm_by_r: Vec<f64> = z_mm_by_r
        .iter()
        .zip(&electrode_z_mm_by_r)
        .map(|(sheath_z, electrode_z)| (sheath_z - electrode_z).abs())
        .collect();

    let (thickness_mean, thickness_min, thickness_max) = summary_stats(&thickness_mm_by_r);
    let (z_mean, z_min, z_max) = summary_stats(&z_mm_by_r);

    SheathMetrics {
        z_mm_by_r,
        electrode_z_mm_by_r: Some(electrode_z_mm_by_r),
        thickness_mm_by_r: Some(thickness_mm_by_r),
        thickness_mean_mm: Some(thickness_mean),
        thickness_min_mm: Some(thickness_min),
        thickness_max_mm: Some(thickness_max),
        z_mean_mm: z_mean,
        z_min_mm: z_min,
        z_max_mm: z_max,
        warnings,
    }
}

/// Delta metrics (perturbed − baseline) with warning provenance.
pub fn compute_delta_sheath_metrics(
    baseline: &SheathMetrics,
    perturbed: &SheathMetrics,
) -> SheathMetrics {
    let z_delta: Vec<f64> = baseline
        .z_mm_by_r
        .iter()
        .zip(&perturbed.z_mm_by_r)
        .map(|(base, pert)| pert - base)
        .collect();

    let thickness_delta = match (&baseline.thickness_mm_by_r, &perturbed.thickness_mm_by_r) {
        (Some(base), Some(pert)) if base.len() == pert.len() => {
            Some(base.iter().zip(pert).map(|(b, p)| p - b).collect::<Vec<f64>>())
        }
        _ => None,
    };

    let (thickness_mean, thickness_min, thickness_max) = match &thickness_delta {
        Some(delta) => {
            let (mean, min, max) = summary_stats(delta);
            (Some(mean), Some(min), Some(max))
        }
        None => (None, None, None),
    };

    let (z_mean, z_min, z_max) = summary_stats(&z_delta);
    let warnings = baseline
        .warnings
        .iter()
        .map(|msg| format!("baseline: {msg}"))
        .chain(perturbed.warnings.iter().map(|msg| format!("perturbed: {msg}")))
        .collect();

    SheathMetrics {
        z_mm_by_r: z_delta,
        electrode_z_mm_by_r: None,
        thickness_mm_by_r: thickness_delta,
        thickness_mean_mm: thickness_mean,
        thickness_min_mm: thickness_min,
        thickness_max_mm: thickness_max,
        z_mean_mm: z_mean,
        z_min_mm: z_min,
        z_max_mm: z_max,
        warnings,
    }
}
