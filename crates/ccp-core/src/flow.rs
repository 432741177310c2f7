// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Flow
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gas feed and pump-sink closures.
//!
//! Inlets seed a source map from their tagged surface restricted to the
//! requested emit-side window; outlets seed a strength map scaled by
//! throttle, conductance and target pressure. A tag that is referenced but
//! absent from the mask set degrades to a documented fallback plus a
//! warning, never an error.

use std::collections::BTreeMap;

use ndarray::Array2;

use ccp_types::config::{
    EmitSide, GeometryGrid, Inlet, InletDirection, Outlet, SimulationRequest,
};
use ccp_types::constants::{PUMP_CONDUCTANCE_REF_LPS, PUMP_TARGET_PRESSURE_REF_PA, RF_REF_FREQ_HZ};

/// Ionization gain of the inlet jet direction.
pub fn direction_ion_gain(direction: InletDirection) -> f64 {
    match direction {
        InletDirection::NormalInward => 1.0,
        InletDirection::RadialInward => 1.08,
        InletDirection::RadialOutward => 0.92,
        InletDirection::Diffuse => 0.95,
    }
}

/// Loss gain of the inlet jet direction (outward flow sweeps electrons out).
pub fn direction_loss_gain(direction: InletDirection) -> f64 {
    match direction {
        InletDirection::NormalInward => 1.0,
        InletDirection::RadialInward => 0.94,
        InletDirection::RadialOutward => 1.08,
        InletDirection::Diffuse => 0.98,
    }
}

pub fn inlet_direction(request: &SimulationRequest) -> InletDirection {
    request
        .flow_boundary
        .inlet
        .as_ref()
        .map_or(InletDirection::NormalInward, |inlet| inlet.direction)
}

pub fn inlet_total_flow_sccm(request: &SimulationRequest) -> f64 {
    request
        .flow_boundary
        .inlet
        .as_ref()
        .map_or(0.0, |inlet| inlet.total_flow_sccm.max(0.0))
}

fn inlet_emit_side(inlet: &Inlet) -> EmitSide {
    inlet.emit_side
}

fn inlet_active_width_percent(inlet: &Inlet) -> f64 {
    inlet.active_width_percent.clamp(5.0, 100.0)
}

/// Radial column window `[start, end)` covered by the active inlet width.
pub fn inlet_radial_window(nr: usize, emit_side: EmitSide, active_width_percent: f64) -> (usize, usize) {
    if nr <= 1 {
        return (0, 1);
    }
    let width_fraction = (active_width_percent / 100.0).clamp(0.05, 1.0);
    let active_count = ((width_fraction * nr as f64).round() as usize).clamp(1, nr);
    let start = match emit_side {
        EmitSide::Left => 0,
        EmitSide::Right => nr - active_count,
        EmitSide::Center => (nr - active_count) / 2,
    };
    let end = (start + active_count).min(nr);
    (start, end)
}

/// Inlet source map plus its grid-coverage fraction.
///
/// Seeds the tagged inlet surface restricted to the emit-side window. When
/// the window misses the tag entirely the full surface is used; when the
/// tag is missing (or no mask set exists) the top boundary row stands in.
/// Every fallback is reported through `warnings`.
pub fn build_inlet_source_map(
    request: &SimulationRequest,
    grid: &GeometryGrid,
    warnings: &mut Vec<String>,
) -> (Array2<f64>, f64) {
    let nz = grid.nz;
    let nr = grid.nr;
    let mut source_map = Array2::zeros((nz, nr));

    let Some(inlet) = &request.flow_boundary.inlet else {
        return (source_map, 0.0);
    };
    if inlet.total_flow_sccm <= 0.0 {
        return (source_map, 0.0);
    }

    let emit_side = inlet_emit_side(inlet);
    let active_width_percent = inlet_active_width_percent(inlet);
    let (j_start, j_end) = inlet_radial_window(nr, emit_side, active_width_percent);
    let inlet_tag = inlet.surface_tag.trim();

    let mut touched = 0usize;

    if let Some(masks) = &grid.tag_mask {
        if !inlet_tag.is_empty() {
            match masks.get(inlet_tag) {
                None => {
                    warnings.push(format!("inlet tag '{inlet_tag}' missing in geometry.tag_mask"));
                }
                Some(mask) => {
                    let mut masked_cells = 0usize;
                    for (k, row) in mask.iter().enumerate().take(nz) {
                        for (j, &cell) in row.iter().enumerate().take(nr) {
                            if !cell {
                                continue;
                            }
                            masked_cells += 1;
                            if j >= j_start && j < j_end {
                                source_map[[k, j]] = 1.0;
                                touched += 1;
                            }
                        }
                    }
                    if masked_cells > 0 && touched == 0 {
                        // Keep the solve stable when the requested window
                        // misses the tagged surface completely.
                        for (k, row) in mask.iter().enumerate().take(nz) {
                            for (j, &cell) in row.iter().enumerate().take(nr) {
                                if cell {
                                    source_map[[k, j]] = 1.0;
                                    touched += 1;
                                }
                            }
                        }
                        warnings.push(
                            "inlet active window did not overlap inlet surface; \
                             fell back to full inlet surface"
                                .to_string(),
                        );
                    }
                }
            }
        }
    } else {
        warnings.push("flow inlet defined but geometry.tag_mask is missing".to_string());
    }

    if touched == 0 {
        let top_k = nz - 1;
        for j in j_start..j_end {
            source_map[[top_k, j]] = 1.0;
            touched += 1;
        }
        warnings.push("inlet source map used top-boundary fallback".to_string());
    }

    let coverage = touched as f64 / (nr * nz).max(1) as f64;
    (source_map, coverage)
}

/// Radial ionization profile of the inlet jet direction, clamped per column.
pub fn inlet_radial_profile(direction: InletDirection, nr: usize) -> Vec<f64> {
    if nr <= 1 {
        return vec![1.0];
    }
    let center = 0.5 * (nr - 1) as f64;
    let span = center.max(1.0);
    (0..nr)
        .map(|j| {
            let radial = (j as f64 - center).abs() / span;
            let gain = match direction {
                InletDirection::RadialInward => 1.16 - 0.34 * radial,
                InletDirection::RadialOutward => 0.84 + 0.34 * radial,
                InletDirection::Diffuse => 0.97 + 0.06 * (1.0 - radial),
                InletDirection::NormalInward => 1.05 - 0.10 * radial,
            };
            gain.clamp(0.68, 1.35)
        })
        .collect()
}

/// Axial ionization profile of the inlet jet direction, clamped per row.
pub fn inlet_axial_profile(direction: InletDirection, nz: usize) -> Vec<f64> {
    if nz <= 1 {
        return vec![1.0];
    }
    let denom = (nz - 1).max(1) as f64;
    (0..nz)
        .map(|k| {
            let topness = k as f64 / denom;
            let gain = match direction {
                InletDirection::Diffuse => 1.0,
                InletDirection::RadialOutward => 0.92 + 0.12 * topness,
                InletDirection::RadialInward => 0.97 + 0.16 * topness,
                InletDirection::NormalInward => 0.94 + 0.20 * topness,
            };
            gain.clamp(0.75, 1.35)
        })
        .collect()
}

/// Radial sheath-coupling profile of the effective drive frequency: high
/// frequencies favor the radial edge, low frequencies the bulk center.
pub fn frequency_radial_profile(nr: usize, frequency_hz: f64) -> Vec<f64> {
    if nr <= 1 {
        return vec![1.0];
    }
    let freq_ratio = frequency_hz.max(1.0) / RF_REF_FREQ_HZ;
    let high_freq_weight = (freq_ratio + 1.0).log10().clamp(0.0, 0.8);
    let low_freq_weight = (1.0 / freq_ratio.max(1e-6) + 1.0).log10().clamp(0.0, 0.8);
    let center = 0.5 * (nr - 1) as f64;
    let span = center.max(1.0);
    (0..nr)
        .map(|j| {
            let radial = (j as f64 - center).abs() / span;
            let edge_gain = 0.28 * high_freq_weight * radial.powf(1.35);
            let center_gain = 0.18 * low_freq_weight * (1.0 - radial).powf(1.2);
            (1.0 + edge_gain + center_gain).clamp(0.72, 1.75)
        })
        .collect()
}

/// Axial sheath-coupling profile of the effective drive frequency.
pub fn frequency_axial_profile(nz: usize, frequency_hz: f64) -> Vec<f64> {
    if nz <= 1 {
        return vec![1.0];
    }
    let freq_ratio = frequency_hz.max(1.0) / RF_REF_FREQ_HZ;
    let high_freq_weight = (freq_ratio + 1.0).log10().clamp(0.0, 0.8);
    let low_freq_weight = (1.0 / freq_ratio.max(1e-6) + 1.0).log10().clamp(0.0, 0.8);
    let denom = (nz - 1).max(1) as f64;
    (0..nz)
        .map(|k| {
            let topness = k as f64 / denom;
            (1.0 + 0.24 * high_freq_weight * topness + 0.16 * low_freq_weight * (1.0 - topness))
                .clamp(0.72, 1.65)
        })
        .collect()
}

/// Effective sink strength of one outlet: nominal strength scaled by
/// throttle opening, conductance relative to the reference pump, and how
/// aggressively it targets below the reference pressure.
pub fn effective_outlet_strength(outlet: &Outlet) -> f64 {
    let raw_strength = outlet.strength.max(0.0);
    let throttle = outlet
        .throttle_percent
        .map_or(1.0, |percent| percent.max(0.0) / 100.0);
    let conductance = outlet
        .conductance_lps
        .map_or(PUMP_CONDUCTANCE_REF_LPS, |lps| lps.max(0.0));
    let target_pressure = outlet
        .target_pressure_pa
        .map_or(PUMP_TARGET_PRESSURE_REF_PA, |pa| pa.max(0.2));

    let conductance_factor = (conductance / PUMP_CONDUCTANCE_REF_LPS)
        .powf(0.5)
        .clamp(0.3, 2.2);
    let pressure_factor = (PUMP_TARGET_PRESSURE_REF_PA / target_pressure)
        .powf(0.5)
        .clamp(0.35, 2.4);
    raw_strength * throttle * conductance_factor * pressure_factor
}

/// Outlet strength map plus the total configured pump strength.
///
/// The total counts every configured sink even when its tag mask is
/// missing, so bulk pump losses survive a mis-tagged geometry; only the
/// spatial localization degrades (with warnings).
pub fn build_outlet_strength_map(
    request: &SimulationRequest,
    grid: &GeometryGrid,
    warnings: &mut Vec<String>,
) -> (Array2<f64>, f64) {
    let nz = grid.nz;
    let nr = grid.nr;
    let mut strength_map = Array2::zeros((nz, nr));

    let outlets = request.flow_boundary.sinks();
    if outlets.is_empty() {
        return (strength_map, 0.0);
    }

    let mut strength_by_tag: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_strength = 0.0;
    for outlet in outlets {
        let tag = outlet.surface_tag.trim();
        if tag.is_empty() {
            continue;
        }
        let strength = effective_outlet_strength(outlet);
        if strength <= 0.0 {
            continue;
        }
        *strength_by_tag.entry(tag.to_string()).or_insert(0.0) += strength;
        total_strength += strength;
    }

    if strength_by_tag.is_empty() {
        return (strength_map, 0.0);
    }

    let Some(masks) = &grid.tag_mask else {
        warnings.push("flow outlets defined but geometry.tag_mask is missing".to_string());
        return (strength_map, total_strength);
    };

    let mut missing_tags: Vec<String> = Vec::new();
    let mut touched = false;
    for (tag, strength) in &strength_by_tag {
        let Some(mask) = masks.get(tag) else {
            missing_tags.push(tag.clone());
            continue;
        };
        for (k, row) in mask.iter().enumerate().take(nz) {
            for (j, &cell) in row.iter().enumerate().take(nr) {
                if cell {
                    strength_map[[k, j]] += strength;
                    touched = true;
                }
            }
        }
    }

    if !missing_tags.is_empty() {
        missing_tags.sort();
        warnings.push(format!(
            "pump outlet tags missing in geometry.tag_mask: {}",
            missing_tags.join(", ")
        ));
    }
    if !touched {
        warnings.push("pump outlet masks did not overlap the geometry grid".to_string());
    }
    (strength_map, total_strength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outlet(strength: f64) -> Outlet {
        Outlet {
            surface_tag: "bottom_pump".into(),
            strength,
            throttle_percent: None,
            conductance_lps: None,
            target_pressure_pa: None,
        }
    }

    #[test]
    fn test_radial_window_sides() {
        assert_eq!(inlet_radial_window(8, EmitSide::Left, 50.0), (0, 4));
        assert_eq!(inlet_radial_window(8, EmitSide::Right, 50.0), (4, 8));
        assert_eq!(inlet_radial_window(8, EmitSide::Center, 50.0), (2, 6));
        assert_eq!(inlet_radial_window(8, EmitSide::Center, 100.0), (0, 8));
        // Width floor keeps at least one active column
        assert_eq!(inlet_radial_window(4, EmitSide::Left, 5.0), (0, 1));
    }

    #[test]
    fn test_outlet_strength_scales_with_conductance() {
        let weak = Outlet {
            conductance_lps: Some(55.0),
            ..outlet(1.0)
        };
        let strong = Outlet {
            conductance_lps: Some(880.0),
            ..outlet(1.0)
        };
        assert!(effective_outlet_strength(&strong) > effective_outlet_strength(&weak));
        // Reference conductance and pressure leave the nominal strength as is
        assert!((effective_outlet_strength(&outlet(1.5)) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_outlet_strength_throttle() {
        let half = Outlet {
            throttle_percent: Some(50.0),
            ..outlet(2.0)
        };
        assert!((effective_outlet_strength(&half) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_outlet_target_pressure_boosts_strength() {
        let aggressive = Outlet {
            target_pressure_pa: Some(2.0),
            ..outlet(1.0)
        };
        assert!(effective_outlet_strength(&aggressive) > 1.0);
    }

    #[test]
    fn test_profiles_are_bounded_and_sized() {
        for &direction in &[
            InletDirection::NormalInward,
            InletDirection::RadialInward,
            InletDirection::RadialOutward,
            InletDirection::Diffuse,
        ] {
            let radial = inlet_radial_profile(direction, 9);
            let axial = inlet_axial_profile(direction, 7);
            assert_eq!(radial.len(), 9);
            assert_eq!(axial.len(), 7);
            assert!(radial.iter().all(|g| (0.68..=1.35).contains(g)));
            assert!(axial.iter().all(|g| (0.75..=1.35).contains(g)));
        }
    }

    #[test]
    fn test_frequency_profiles_favor_edge_at_high_frequency() {
        let profile = frequency_radial_profile(11, 60.0e6);
        assert!(profile[0] > profile[5], "edge gain above center at 60 MHz");
        let low = frequency_radial_profile(11, 2.0e6);
        assert!(low[5] > low[0], "center gain above edge at 2 MHz");
    }

    #[test]
    fn test_direction_gains_cover_all_variants() {
        assert!((direction_ion_gain(InletDirection::RadialInward) - 1.08).abs() < 1e-12);
        assert!((direction_loss_gain(InletDirection::RadialOutward) - 1.08).abs() < 1e-12);
    }
}
