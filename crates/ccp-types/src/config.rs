// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Simulation request model.
//!
//! Field names follow the JSON request schema of the upstream API layer
//! (`pressure_Pa`, `rf_power_W`, ...). The engine receives a request that
//! already passed API validation; [`SimulationRequest::validate`] re-checks
//! the structural invariants the solvers rely on.

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{CcpError, CcpResult};

/// Cell classification used to seed materials and boundary conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Plasma,
    SolidWall,
    PoweredElectrode,
    GroundElectrode,
    Dielectric,
}

impl RegionKind {
    /// True for cells that receive a Dirichlet boundary value.
    pub fn is_dirichlet(self) -> bool {
        matches!(
            self,
            RegionKind::PoweredElectrode | RegionKind::GroundElectrode | RegionKind::SolidWall
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegionKind::Plasma => "plasma",
            RegionKind::SolidWall => "solid_wall",
            RegionKind::PoweredElectrode => "powered_electrode",
            RegionKind::GroundElectrode => "ground_electrode",
            RegionKind::Dielectric => "dielectric",
        }
    }
}

/// Physical extent and resolution of the axisymmetric r-z domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryDomain {
    pub r_max_mm: f64,
    pub z_max_mm: f64,
    #[serde(default = "default_grid_n")]
    pub nr: usize,
    #[serde(default = "default_grid_n")]
    pub nz: usize,
}

fn default_grid_n() -> usize {
    8
}

/// Per-cell region ids plus the legend resolving them to [`RegionKind`].
///
/// JSON object keys are strings, so the legend arrives keyed by the decimal
/// form of the region id; [`GeometryGrid::region_map`] resolves it once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryGrid {
    pub nr: usize,
    pub nz: usize,
    pub region_id: Vec<Vec<i64>>,
    pub region_legend: BTreeMap<String, RegionKind>,
    #[serde(default)]
    pub tag_mask: Option<BTreeMap<String, Vec<Vec<bool>>>>,
}

impl GeometryGrid {
    /// Resolve every cell through the legend into a dense region map.
    pub fn region_map(&self) -> CcpResult<Array2<RegionKind>> {
        let mut legend: BTreeMap<i64, RegionKind> = BTreeMap::new();
        for (key, kind) in &self.region_legend {
            let id: i64 = key.trim().parse().map_err(|_| {
                CcpError::ConfigError(format!("region legend key '{key}' is not an integer"))
            })?;
            legend.insert(id, *kind);
        }

        let mut map = Array2::from_elem((self.nz, self.nr), RegionKind::Plasma);
        for (iz, row) in self.region_id.iter().enumerate() {
            for (ir, id) in row.iter().enumerate() {
                let kind = legend.get(id).copied().ok_or(CcpError::UnknownRegionId {
                    id: *id,
                    iz,
                    ir,
                })?;
                map[[iz, ir]] = kind;
            }
        }
        Ok(map)
    }

    /// Look up a tag mask by name.
    pub fn tag(&self, name: &str) -> Option<&Vec<Vec<bool>>> {
        self.tag_mask.as_ref().and_then(|masks| masks.get(name))
    }

    /// Ragged-safe mask lookup: out-of-range cells read as untagged.
    pub fn mask_cell(mask: &[Vec<bool>], iz: usize, ir: usize) -> bool {
        mask.get(iz).map_or(false, |row| row.get(ir).copied().unwrap_or(false))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default = "default_true")]
    pub axisymmetric: bool,
    pub domain: GeometryDomain,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub grid: Option<GeometryGrid>,
}

/// One RF generator feeding a tagged electrode surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surface_tag: Option<String>,
    #[serde(rename = "rf_power_W")]
    pub rf_power_w: f64,
    #[serde(rename = "frequency_Hz")]
    pub frequency_hz: f64,
    #[serde(default)]
    pub phase_deg: f64,
}

/// A per-tag DC bias contribution on top of the global chuck bias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcBiasRegion {
    pub target_tag: String,
    #[serde(rename = "dc_bias_V", default)]
    pub dc_bias_v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    #[serde(rename = "pressure_Pa")]
    pub pressure_pa: f64,
    #[serde(rename = "rf_power_W")]
    pub rf_power_w: f64,
    #[serde(rename = "frequency_Hz")]
    pub frequency_hz: f64,
    #[serde(rename = "dc_bias_V", default)]
    pub dc_bias_v: f64,
    #[serde(default)]
    pub rf_sources: Option<Vec<RfSource>>,
    #[serde(default)]
    pub dc_bias_regions: Option<Vec<DcBiasRegion>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasComponent {
    pub species: String,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gas {
    pub mixture: Vec<GasComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InletDirection {
    NormalInward,
    RadialInward,
    RadialOutward,
    Diffuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitSide {
    Left,
    Center,
    Right,
}

/// Gas feed through a tagged surface (showerhead or ring inlet).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inlet {
    pub surface_tag: String,
    pub total_flow_sccm: f64,
    #[serde(default = "default_inlet_direction")]
    pub direction: InletDirection,
    #[serde(default = "default_emit_side")]
    pub emit_side: EmitSide,
    #[serde(default = "default_active_width_percent")]
    pub active_width_percent: f64,
}

fn default_inlet_direction() -> InletDirection {
    InletDirection::NormalInward
}

fn default_emit_side() -> EmitSide {
    EmitSide::Center
}

fn default_active_width_percent() -> f64 {
    28.0
}

/// Pump port acting as a particle sink on a tagged surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlet {
    pub surface_tag: String,
    #[serde(default = "default_outlet_strength")]
    pub strength: f64,
    #[serde(default)]
    pub throttle_percent: Option<f64>,
    #[serde(default)]
    pub conductance_lps: Option<f64>,
    #[serde(rename = "target_pressure_Pa", default)]
    pub target_pressure_pa: Option<f64>,
}

fn default_outlet_strength() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowBoundary {
    #[serde(default)]
    pub inlet: Option<Inlet>,
    #[serde(default)]
    pub outlet: Option<Outlet>,
    #[serde(default)]
    pub outlets: Option<Vec<Outlet>>,
}

impl FlowBoundary {
    /// All pump sinks: the `outlets` list wins over the single legacy field.
    pub fn sinks(&self) -> Vec<&Outlet> {
        match &self.outlets {
            Some(list) if !list.is_empty() => list.iter().collect(),
            _ => self.outlet.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialProps {
    pub epsilon_r: f64,
    pub wall_loss_e: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialOverride {
    pub target_tag: String,
    #[serde(default)]
    pub epsilon_r: Option<f64>,
    #[serde(default)]
    pub wall_loss_e: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub default: MaterialProps,
    #[serde(default)]
    pub regions: Vec<MaterialOverride>,
}

/// Which output blocks the caller wants computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSelection {
    #[serde(default = "default_true")]
    pub efield: bool,
    #[serde(default = "default_true")]
    pub ne: bool,
    #[serde(default = "default_true")]
    pub volume_loss_density: bool,
    #[serde(default = "default_true")]
    pub sheath: bool,
}

impl Default for OutputSelection {
    fn default() -> Self {
        OutputSelection {
            efield: true,
            ne: true,
            volume_loss_density: true,
            sheath: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub geometry: Geometry,
    pub process: Process,
    pub gas: Gas,
    #[serde(default)]
    pub flow_boundary: FlowBoundary,
    pub material: MaterialConfig,
    #[serde(default)]
    pub outputs: Option<OutputSelection>,
    #[serde(default)]
    pub baseline: Baseline,
}

impl SimulationRequest {
    /// Load a request from a JSON file.
    pub fn from_file(path: &str) -> CcpResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let request: Self = serde_json::from_str(&contents)?;
        Ok(request)
    }

    /// Effective output selection (all blocks on when unspecified).
    pub fn outputs(&self) -> OutputSelection {
        self.outputs.clone().unwrap_or_default()
    }

    /// Re-check the structural invariants the solvers assume.
    ///
    /// Tag references by inlets/outlets/sources are deliberately NOT checked
    /// here: a missing tag degrades to a documented fallback plus a warning
    /// at the point of use, never a hard failure.
    pub fn validate(&self) -> CcpResult<()> {
        if self.process.pressure_pa <= 0.0 || !self.process.pressure_pa.is_finite() {
            return Err(CcpError::ConfigError(format!(
                "pressure_Pa must be finite and > 0, got {}",
                self.process.pressure_pa
            )));
        }
        if let Some(sources) = &self.process.rf_sources {
            if sources.len() > 3 {
                return Err(CcpError::ConfigError(format!(
                    "at most 3 rf_sources supported, got {}",
                    sources.len()
                )));
            }
            for source in sources {
                if source.rf_power_w < 0.0 || source.frequency_hz <= 0.0 {
                    return Err(CcpError::ConfigError(
                        "rf_sources entries need rf_power_W >= 0 and frequency_Hz > 0".into(),
                    ));
                }
            }
        }

        let total: f64 = self.gas.mixture.iter().map(|c| c.fraction).sum();
        if !self.gas.mixture.is_empty() && (total - 1.0).abs() > 1e-6 {
            return Err(CcpError::ConfigError(format!(
                "gas mixture fractions must sum to 1 (got {total})"
            )));
        }

        if self.material.default.epsilon_r <= 0.0 {
            return Err(CcpError::ConfigError(
                "material.default.epsilon_r must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.material.default.wall_loss_e) {
            return Err(CcpError::ConfigError(
                "material.default.wall_loss_e must be in [0, 1]".into(),
            ));
        }

        let domain = &self.geometry.domain;
        if domain.nr < 2 || domain.nz < 2 {
            return Err(CcpError::ConfigError(format!(
                "domain resolution must be at least 2x2, got {}x{}",
                domain.nz, domain.nr
            )));
        }

        if let Some(grid) = &self.geometry.grid {
            if grid.nr != domain.nr || grid.nz != domain.nz {
                return Err(CcpError::GridShapeMismatch {
                    declared_nz: domain.nz,
                    declared_nr: domain.nr,
                    got_nz: grid.nz,
                    got_nr: grid.nr,
                });
            }
            if grid.region_id.len() != grid.nz
                || grid.region_id.iter().any(|row| row.len() != grid.nr)
            {
                return Err(CcpError::GridShapeMismatch {
                    declared_nz: grid.nz,
                    declared_nr: grid.nr,
                    got_nz: grid.region_id.len(),
                    got_nr: grid.region_id.first().map_or(0, |row| row.len()),
                });
            }
            // Every cell must resolve through the legend.
            grid.region_map()?;
            if let Some(masks) = &grid.tag_mask {
                for (tag, mask) in masks {
                    if mask.len() != grid.nz || mask.iter().any(|row| row.len() != grid.nr) {
                        return Err(CcpError::ConfigError(format!(
                            "tag_mask '{tag}' shape does not match the {}x{} grid",
                            grid.nz, grid.nr
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_json() -> serde_json::Value {
        serde_json::json!({
            "geometry": {
                "axisymmetric": true,
                "domain": {"r_max_mm": 10.0, "z_max_mm": 20.0, "nr": 4, "nz": 4},
                "grid": {
                    "nr": 4,
                    "nz": 4,
                    "region_id": [
                        [2, 2, 1, 1],
                        [0, 0, 1, 1],
                        [4, 4, 3, 3],
                        [4, 4, 3, 3]
                    ],
                    "region_legend": {
                        "0": "plasma",
                        "1": "solid_wall",
                        "2": "powered_electrode",
                        "3": "ground_electrode",
                        "4": "dielectric"
                    },
                    "tag_mask": {
                        "dielectric_block": [
                            [false, false, false, false],
                            [false, false, false, false],
                            [true, true, false, false],
                            [true, true, false, false]
                        ]
                    }
                }
            },
            "process": {"pressure_Pa": 10.0, "rf_power_W": 100.0, "frequency_Hz": 13560000.0},
            "gas": {"mixture": [{"species": "Ar", "fraction": 1.0}]},
            "flow_boundary": {
                "inlet": {"surface_tag": "showerhead", "total_flow_sccm": 10.0},
                "outlet": {"surface_tag": "bottom_pump", "strength": 1.0}
            },
            "material": {
                "default": {"epsilon_r": 4.0, "wall_loss_e": 0.2},
                "regions": [{"target_tag": "dielectric_block", "epsilon_r": 5.0}]
            },
            "baseline": {"enabled": false}
        })
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: SimulationRequest = serde_json::from_value(request_json()).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.process.dc_bias_v, 0.0);
        assert!(request.process.rf_sources.is_none());
        let inlet = request.flow_boundary.inlet.as_ref().unwrap();
        assert_eq!(inlet.direction, InletDirection::NormalInward);
        assert_eq!(inlet.emit_side, EmitSide::Center);
        assert!((inlet.active_width_percent - 28.0).abs() < 1e-12);
        let outputs = request.outputs();
        assert!(outputs.efield && outputs.ne && outputs.volume_loss_density && outputs.sheath);
    }

    #[test]
    fn test_region_map_resolves_legend() {
        let request: SimulationRequest = serde_json::from_value(request_json()).unwrap();
        let grid = request.geometry.grid.as_ref().unwrap();
        let map = grid.region_map().unwrap();
        assert_eq!(map[[0, 0]], RegionKind::PoweredElectrode);
        assert_eq!(map[[1, 0]], RegionKind::Plasma);
        assert_eq!(map[[2, 0]], RegionKind::Dielectric);
        assert_eq!(map[[3, 3]], RegionKind::GroundElectrode);
    }

    #[test]
    fn test_unknown_region_id_rejected() {
        let mut value = request_json();
        value["geometry"]["grid"]["region_id"][1][1] = serde_json::json!(9);
        let request: SimulationRequest = serde_json::from_value(value).unwrap();
        let err = request.validate().unwrap_err();
        assert!(matches!(err, CcpError::UnknownRegionId { id: 9, iz: 1, ir: 1 }));
    }

    #[test]
    fn test_grid_shape_mismatch_rejected() {
        let mut value = request_json();
        value["geometry"]["domain"]["nr"] = serde_json::json!(5);
        let request: SimulationRequest = serde_json::from_value(value).unwrap();
        assert!(matches!(
            request.validate(),
            Err(CcpError::GridShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_gas_fractions_must_sum_to_one() {
        let mut value = request_json();
        value["gas"]["mixture"] = serde_json::json!([
            {"species": "Ar", "fraction": 0.5},
            {"species": "O2", "fraction": 0.4}
        ]);
        let request: SimulationRequest = serde_json::from_value(value).unwrap();
        assert!(matches!(request.validate(), Err(CcpError::ConfigError(_))));
    }

    #[test]
    fn test_sinks_prefers_outlets_list() {
        let mut value = request_json();
        value["flow_boundary"]["outlets"] = serde_json::json!([
            {"surface_tag": "side_pump", "strength": 2.0},
            {"surface_tag": "bottom_pump", "strength": 1.0}
        ]);
        let request: SimulationRequest = serde_json::from_value(value).unwrap();
        let sinks = request.flow_boundary.sinks();
        assert_eq!(sinks.len(), 2);
        assert_eq!(sinks[0].surface_tag, "side_pump");
    }

    #[test]
    fn test_roundtrip_serialization() {
        let request: SimulationRequest = serde_json::from_value(request_json()).unwrap();
        let json = serde_json::to_string_pretty(&request).unwrap();
        let request2: SimulationRequest = serde_json::from_str(&json).unwrap();
        assert!(request2.validate().is_ok());
        assert_eq!(
            request.geometry.domain.nr,
            request2.geometry.domain.nr
        );
        assert!((request.process.pressure_pa - request2.process.pressure_pa).abs() < 1e-12);
    }
}
