// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Power
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Relative absorbed-power-density proxy.
//!
//! Scores each cell by its interface field strength (relative to a
//! contact-driven reference), local plasma coupling, material loss and
//! permittivity coupling, drive-level gains, and RF/pump proximity gates
//! from the influence maps. Restricted to explicit geometry tags; pump and
//! outlet surfaces are excluded outright. Every factor is clamped, so the
//! score stays in a fixed relative range.

use std::collections::BTreeMap;

use ndarray::Array2;

use ccp_core::flow::effective_outlet_strength;
use ccp_core::influence::{relax_influence, tag_union_mask, tag_weight_map};
use ccp_core::rf_drive::{dc_bias_voltage, effective_rf_drive};
use ccp_types::config::{GeometryGrid, SimulationRequest};
use ccp_types::constants::RF_REF_FREQ_HZ;

/// Spread steps / decay for the RF-source influence map.
const RF_SPREAD_STEPS: usize = 8;
const RF_SPREAD_DECAY: f64 = 0.84;

/// Spread steps / decay for the pump influence map.
const OUTLET_SPREAD_STEPS: usize = 7;
const OUTLET_SPREAD_DECAY: f64 = 0.82;

/// Cells whose RF influence falls below this fraction of the map peak have
/// no RF contact and score zero.
const RF_CONTACT_THRESHOLD: f64 = 1e-9;

/// Upper clamp of the per-cell score.
const POWER_SCORE_MAX: f64 = 3.6;

/// Max and mean of the finite positive values in a (2·radius+1)² window.
fn neighbor_max_mean(field: Option<&Array2<f64>>, k: usize, j: usize, radius: usize) -> (f64, f64) {
    let Some(field) = field else {
        return (0.0, 0.0);
    };
    let (nz, nr) = field.dim();
    if nz == 0 || nr == 0 {
        return (0.0, 0.0);
    }

    let k_lo = k.saturating_sub(radius);
    let k_hi = (k + radius).min(nz - 1);
    let j_lo = j.saturating_sub(radius);
    let j_hi = (j + radius).min(nr - 1);

    let mut total = 0.0;
    let mut count = 0usize;
    let mut vmax = 0.0_f64;
    for kk in k_lo..=k_hi {
        for jj in j_lo..=j_hi {
            let value = field[[kk, jj]];
            if !value.is_finite() || value <= 0.0 {
                continue;
            }
            total += value;
            count += 1;
            vmax = vmax.max(value);
        }
    }
    if count == 0 {
        (0.0, 0.0)
    } else {
        (vmax, total / count as f64)
    }
}

/// Interface field estimate: the local value, or a discounted neighbourhood
/// max/mean when the cell itself sits just off the strong-field region.
fn interface_field(field: &Array2<f64>, k: usize, j: usize) -> f64 {
    let here = {
        let value = field[[k, j]];
        if value.is_finite() {
            value
        } else {
            0.0
        }
    };
    let (nbr_max, nbr_mean) = neighbor_max_mean(Some(field), k, j, 2);
    here.max(0.90 * nbr_max).max(0.65 * nbr_mean)
}

/// Compute the absorbed-power-density proxy, or `None` when the E-field is
/// unavailable.
pub fn compute_absorbed_power_density(
    ne: Option<&Array2<f64>>,
    e_mag: Option<&Array2<f64>>,
    wall_loss_map: &Array2<f64>,
    epsilon_map: &Array2<f64>,
    request: &SimulationRequest,
    grid: &GeometryGrid,
    geometry_mask: Option<&Array2<bool>>,
) -> Option<Array2<f64>> {
    let e_mag = e_mag?;
    let (nz, nr) = e_mag.dim();
    if nz == 0 || nr == 0 {
        return None;
    }

    let rf_drive = effective_rf_drive(request);
    let power_gain = ((rf_drive.total_power_w + 30.0) / 530.0)
        .powf(0.55)
        .clamp(0.45, 3.8);
    let freq_gain = (rf_drive.effective_frequency_hz / RF_REF_FREQ_HZ)
        .powf(0.15)
        .clamp(0.75, 1.9);
    let dc_bias_gain = (1.0 + dc_bias_voltage(request).abs() / 1700.0)
        .powf(0.18)
        .clamp(1.0, 1.6);
    let multi_source_gain = rf_drive.multi_source_factor.powf(0.2).clamp(0.85, 1.3);

    let tag_mask = grid.tag_mask.as_ref();

    // RF contact: tagged sources seed the influence map; with no tagged
    // source, any powered/rf/source tag stands in at unit weight.
    let mut rf_tag_weights: BTreeMap<String, f64> = BTreeMap::new();
    for source in &rf_drive.sources {
        let Some(tag) = &source.surface_tag else {
            continue;
        };
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        *rf_tag_weights.entry(tag.to_string()).or_insert(0.0) += source.power_w.max(1.0);
    }
    if rf_tag_weights.is_empty() {
        if let Some(masks) = tag_mask {
            for tag in masks.keys() {
                let normalized = tag.trim().to_ascii_lowercase();
                if normalized.contains("powered")
                    || normalized.contains("rf")
                    || normalized.contains("source")
                {
                    rf_tag_weights.insert(tag.clone(), 1.0);
                }
            }
        }
    }

    let rf_seed = tag_weight_map(tag_mask, &rf_tag_weights, nz, nr);
    let rf_influence = relax_influence(&rf_seed, RF_SPREAD_STEPS, RF_SPREAD_DECAY);
    let rf_ref = rf_influence.iter().copied().fold(0.0_f64, f64::max);

    let mut outlet_tag_weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut outlet_tags: Vec<String> = Vec::new();
    for outlet in request.flow_boundary.sinks() {
        let tag = outlet.surface_tag.trim();
        if tag.is_empty() {
            continue;
        }
        outlet_tags.push(tag.to_string());
        let weight = effective_outlet_strength(outlet);
        if weight > 0.0 {
            *outlet_tag_weights.entry(tag.to_string()).or_insert(0.0) += weight;
        }
    }
    let outlet_exclusion =
        tag_union_mask(tag_mask, outlet_tags.iter().map(String::as_str), nz, nr);
    let outlet_seed = tag_weight_map(tag_mask, &outlet_tag_weights, nz, nr);
    let outlet_influence = relax_influence(&outlet_seed, OUTLET_SPREAD_STEPS, OUTLET_SPREAD_DECAY);
    let outlet_ref = outlet_influence.iter().copied().fold(0.0_f64, f64::max);

    let cell_allowed = |k: usize, j: usize| -> bool {
        if outlet_exclusion[[k, j]] {
            return false;
        }
        if let Some(mask) = geometry_mask {
            if !mask[[k, j]] {
                return false;
            }
        }
        if rf_ref > 1e-12 && rf_influence[[k, j]] <= RF_CONTACT_THRESHOLD * rf_ref {
            return false;
        }
        true
    };

    // Contact-driven field reference over the allowed cells.
    let mut e_ref = 0.0_f64;
    for k in 0..nz {
        for j in 0..nr {
            if !cell_allowed(k, j) {
                continue;
            }
            let e_interface = interface_field(e_mag, k, j);
            if e_interface > 0.0 {
                e_ref = e_ref.max(e_interface);
            }
        }
    }
    let e_ref = e_ref.max(1e-9);

    let mut result = Array2::zeros((nz, nr));
    for k in 0..nz {
        for j in 0..nr {
            if !cell_allowed(k, j) {
                continue;
            }
            let e_interface = interface_field(e_mag, k, j);
            if e_interface <= 0.0 {
                continue;
            }

            let ne_here = ne
                .map(|field| {
                    let value = field[[k, j]];
                    if value.is_finite() {
                        value.max(0.0)
                    } else {
                        0.0
                    }
                })
                .unwrap_or(0.0);
            let (ne_nbr_max, ne_nbr_mean) = neighbor_max_mean(ne, k, j, 1);
            let ne_interface = ne_here.max(0.72 * ne_nbr_max).max(0.45 * ne_nbr_mean);
            let plasma_coupling = (0.22 + 0.78 * ne_interface.sqrt()).clamp(0.22, 1.0);

            let wall_loss = wall_loss_map[[k, j]].clamp(0.0, 1.0);
            let eps_r = {
                let value = epsilon_map[[k, j]];
                if value.is_finite() {
                    value.max(1.0)
                } else {
                    1.0
                }
            };
            let loss_tangent_proxy = (0.08 + 0.92 * wall_loss).clamp(0.08, 1.0);
            let eps_coupling = eps_r.powf(0.22).clamp(1.0, 2.1);
            let material_coupling = loss_tangent_proxy * eps_coupling;

            let source_factor = if rf_ref > 1e-12 {
                (0.72 + 0.88 * (rf_influence[[k, j]] / rf_ref)).clamp(0.72, 1.6)
            } else {
                1.0
            };
            let sink_factor = if outlet_ref > 1e-12 {
                (1.0 - 0.32 * (outlet_influence[[k, j]] / outlet_ref)).clamp(0.58, 1.0)
            } else {
                1.0
            };

            let e_rel = (e_interface / e_ref).clamp(0.0, 1.0);
            let scaled = e_rel.powi(2)
                * (0.55 + 0.45 * plasma_coupling)
                * material_coupling
                * power_gain
                * freq_gain
                * dc_bias_gain
                * multi_source_gain
                * source_factor
                * sink_factor;
            result[[k, j]] = scaled.clamp(0.0, POWER_SCORE_MAX);
        }
    }

    Some(result)
}
