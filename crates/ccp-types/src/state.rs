// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Computational grid and result payload types.
//!
//! All 2D fields are `[nz, nr]` arrays: row index `iz` walks the axial
//! direction from the powered electrode (z = 0) upward, column index `ir`
//! walks outward from the symmetry axis (r = 0).

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Uniform axisymmetric r-z grid with precomputed coordinates.
#[derive(Debug, Clone)]
pub struct ChamberGrid {
    pub nr: usize,
    pub nz: usize,
    pub r: Array1<f64>, // r coordinates [nr], 0 .. r_max_mm
    pub z: Array1<f64>, // z coordinates [nz], 0 .. z_max_mm
    pub dr: f64,
    pub dz: f64,
}

impl ChamberGrid {
    pub fn new(nr: usize, nz: usize, r_max_mm: f64, z_max_mm: f64) -> Self {
        let r = Array1::linspace(0.0, r_max_mm, nr);
        let z = Array1::linspace(0.0, z_max_mm, nz);
        let dr = if nr > 1 { r[1] - r[0] } else { r_max_mm };
        let dz = if nz > 1 { z[1] - z[0] } else { z_max_mm };
        ChamberGrid { nr, nz, r, z, dr, dz }
    }
}

/// A point on the sheath polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub r_mm: f64,
    pub z_mm: f64,
}

/// Selected output field grids, each `[nz, nr]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(rename = "E_mag")]
    pub e_mag: Option<Array2<f64>>,
    pub ne: Option<Array2<f64>>,
    /// Relative absorbed-power-density proxy (per unit volume).
    pub volume_loss_density: Option<Array2<f64>>,
}

impl FieldSet {
    pub fn is_empty(&self) -> bool {
        self.e_mag.is_none() && self.ne.is_none() && self.volume_loss_density.is_none()
    }
}

/// Sheath boundary: one polyline point per radial column plus the mask of
/// cells at or below the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheath {
    pub polyline_mm: Vec<Point2D>,
    pub mask: Array2<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheathMetrics {
    pub z_mm_by_r: Vec<f64>,
    pub electrode_z_mm_by_r: Option<Vec<f64>>,
    pub thickness_mm_by_r: Option<Vec<f64>>,
    pub thickness_mean_mm: Option<f64>,
    pub thickness_min_mm: Option<f64>,
    pub thickness_max_mm: Option<f64>,
    pub z_mean_mm: f64,
    pub z_min_mm: f64,
    pub z_max_mm: f64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightSummary {
    pub e_on_sheath_mean: Option<f64>,
    pub e_on_sheath_min: Option<f64>,
    pub e_on_sheath_max: Option<f64>,
    pub ne_on_sheath_mean: Option<f64>,
    pub ne_on_sheath_min: Option<f64>,
    pub ne_on_sheath_max: Option<f64>,
    pub thickness_mean_mm: Option<f64>,
    pub thickness_min_mm: Option<f64>,
    pub thickness_max_mm: Option<f64>,
}

/// 1D curves sampled along the sheath boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheathInsights {
    pub r_mm: Vec<f64>,
    pub sheath_z_mm_by_r: Vec<f64>,
    pub sheath_thickness_mm_by_r: Option<Vec<f64>>,
    #[serde(rename = "E_on_sheath_by_r")]
    pub e_on_sheath_by_r: Option<Vec<f64>>,
    pub ne_on_sheath_by_r: Option<Vec<f64>>,
    pub summary: InsightSummary,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IonProxyCurves {
    pub ion_energy_proxy_rel_by_r: Option<Vec<f64>>,
    pub ion_flux_proxy_rel_by_r: Option<Vec<f64>>,
    #[serde(rename = "Te_eV_used")]
    pub te_ev_used: f64,
    #[serde(rename = "Mi_amu_used")]
    pub mi_amu_used: f64,
    pub warnings: Vec<String>,
}

/// Plot-ready per-column curves for the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizCurves {
    pub r_mm: Vec<f64>,
    pub sheath_z_mm_by_r: Vec<f64>,
    pub sheath_thickness_mm_by_r: Option<Vec<f64>>,
    pub delta_sheath_z_mm_by_r: Option<Vec<f64>>,
    pub delta_sheath_thickness_mm_by_r: Option<Vec<f64>>,
    pub warnings: Vec<String>,
}

/// Electron-density solver metadata: method, coefficients and convergence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeSolverMetadata {
    pub method: String,
    pub mu_e: f64,
    #[serde(rename = "D_e")]
    pub d_e: f64,
    #[serde(rename = "Te_norm")]
    pub te_norm: f64,
    #[serde(rename = "Te_eV")]
    pub te_ev: f64,
    pub k_s_wall: f64,
    pub k_s_powered: f64,
    pub lambda_relax: f64,
    pub ionization_gain: f64,
    pub bulk_loss: f64,
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
    pub fallback_used: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSummary {
    pub region_type_counts: BTreeMap<String, usize>,
    pub tag_counts: Option<BTreeMap<String, usize>>,
}

/// Output grid coordinates in millimetres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputGrid {
    pub r_mm: Vec<f64>,
    pub z_mm: Vec<f64>,
}

/// Baseline-vs-perturbed deltas (perturbed − baseline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareBlock {
    pub enabled: bool,
    pub delta_fields: Option<FieldSet>,
    pub delta_sheath_thickness_mm: Option<f64>,
    pub delta_sheath_metrics: Option<SheathMetrics>,
    pub delta_insights: Option<SheathInsights>,
    pub delta_ion_proxy: Option<IonProxyCurves>,
}

/// Complete engine output for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub grid: OutputGrid,
    pub grid_summary: Option<GridSummary>,
    pub fields: Option<FieldSet>,
    pub sheath: Sheath,
    pub sheath_metrics: Option<SheathMetrics>,
    pub insights: Option<SheathInsights>,
    pub viz: Option<VizCurves>,
    pub ion_proxy: Option<IonProxyCurves>,
    pub ne_solver: Option<NeSolverMetadata>,
    pub compare: Option<CompareBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = ChamberGrid::new(4, 5, 10.0, 20.0);
        assert_eq!(grid.nr, 4);
        assert_eq!(grid.nz, 5);
        assert!((grid.r[0] - 0.0).abs() < 1e-12);
        assert!((grid.r[3] - 10.0).abs() < 1e-12);
        assert!((grid.z[4] - 20.0).abs() < 1e-12);
        assert!((grid.dr - 10.0 / 3.0).abs() < 1e-12);
        assert!((grid.dz - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_spacing_uniform() {
        let grid = ChamberGrid::new(9, 7, 18.0, 12.0);
        for i in 1..grid.nr {
            assert!((grid.r[i] - grid.r[i - 1] - grid.dr).abs() < 1e-12);
        }
        for i in 1..grid.nz {
            assert!((grid.z[i] - grid.z[i - 1] - grid.dz).abs() < 1e-12);
        }
    }

    #[test]
    fn test_field_set_empty() {
        let fields = FieldSet::default();
        assert!(fields.is_empty());
        let fields = FieldSet {
            e_mag: Some(Array2::zeros((2, 2))),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }
}
