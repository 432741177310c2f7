// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — RF Drive
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Effective RF drive and DC bias.
//!
//! Multiple generators driving tagged electrode surfaces combine as
//! phasors, not as summed power: each source contributes a complex
//! amplitude ∝ √P at its phase, and incoherence between sources shows up
//! as a reduced resultant. The trend-level `multi_source_factor` captures
//! the residual penalty of source count, phase incoherence and frequency
//! spread on the cycle-averaged closures.

use std::collections::BTreeMap;

use num_complex::Complex64;

use ccp_types::config::{Process, SimulationRequest};
use ccp_types::constants::DC_BIAS_LIMIT_V;

/// One RF generator after normalization (non-negative power, positive
/// frequency).
#[derive(Debug, Clone)]
pub struct RfDriveSource {
    pub surface_tag: Option<String>,
    pub power_w: f64,
    pub frequency_hz: f64,
    pub phase_deg: f64,
}

/// Multi-source drive collapsed to trend-level parameters.
#[derive(Debug, Clone)]
pub struct EffectiveRfDrive {
    pub total_power_w: f64,
    pub effective_frequency_hz: f64,
    /// Incoherence/spread penalty, clamped to [1.0, 1.35].
    pub multi_source_factor: f64,
    pub source_count: usize,
    pub sources: Vec<RfDriveSource>,
}

/// Normalized phasor of one source for boundary superposition.
#[derive(Debug, Clone)]
pub struct BoundaryDriveComponent {
    pub surface_tag: Option<String>,
    pub phasor: Complex64,
}

/// Explicit `rf_sources` when present, else the legacy single-source
/// power/frequency fields.
pub fn collect_rf_sources(process: &Process) -> Vec<RfDriveSource> {
    if let Some(sources) = &process.rf_sources {
        if !sources.is_empty() {
            return sources
                .iter()
                .map(|source| RfDriveSource {
                    surface_tag: source.surface_tag.clone(),
                    power_w: source.rf_power_w.max(0.0),
                    frequency_hz: source.frequency_hz.max(1.0),
                    phase_deg: source.phase_deg,
                })
                .collect();
        }
    }
    vec![RfDriveSource {
        surface_tag: None,
        power_w: process.rf_power_w.max(0.0),
        frequency_hz: process.frequency_hz.max(1.0),
        phase_deg: 0.0,
    }]
}

/// Collapse the configured sources into an [`EffectiveRfDrive`].
pub fn effective_rf_drive(request: &SimulationRequest) -> EffectiveRfDrive {
    let sources = collect_rf_sources(&request.process);
    let total_power_w: f64 = sources.iter().map(|s| s.power_w).sum();
    let effective_frequency_hz = if total_power_w > 0.0 {
        sources
            .iter()
            .map(|s| s.power_w * s.frequency_hz)
            .sum::<f64>()
            / total_power_w
    } else {
        sources.iter().map(|s| s.frequency_hz).sum::<f64>() / sources.len().max(1) as f64
    };

    if sources.len() <= 1 {
        return EffectiveRfDrive {
            total_power_w,
            effective_frequency_hz: effective_frequency_hz.max(1.0),
            multi_source_factor: 1.0,
            source_count: sources.len(),
            sources,
        };
    }

    let coherence = if total_power_w > 0.0 {
        let resultant: Complex64 = sources
            .iter()
            .map(|s| Complex64::from_polar(s.power_w, s.phase_deg.to_radians()))
            .sum();
        (resultant.norm() / total_power_w).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let freq_min = sources.iter().map(|s| s.frequency_hz).fold(f64::INFINITY, f64::min);
    let freq_max = sources
        .iter()
        .map(|s| s.frequency_hz)
        .fold(f64::NEG_INFINITY, f64::max);
    let spread_norm = ((freq_max - freq_min) / effective_frequency_hz.max(1.0)).clamp(0.0, 1.0);

    let multi_source_factor = ((1.0 + 0.07 * (sources.len() - 1) as f64)
        * (1.0 + 0.10 * (1.0 - coherence))
        * (1.0 + 0.08 * spread_norm))
        .clamp(1.0, 1.35);

    EffectiveRfDrive {
        total_power_w,
        effective_frequency_hz: effective_frequency_hz.max(1.0),
        multi_source_factor,
        source_count: sources.len(),
        sources,
    }
}

/// Normalized phasor components for boundary superposition. Amplitudes
/// scale with √(P / P_total), so a single source always has unit amplitude;
/// powerless configurations fall back to uniform amplitudes.
pub fn boundary_drive_components(request: &SimulationRequest) -> Vec<BoundaryDriveComponent> {
    let sources = collect_rf_sources(&request.process);
    if sources.is_empty() {
        return Vec::new();
    }

    let total_power_w: f64 = sources.iter().map(|s| s.power_w).sum();
    if total_power_w > 0.0 {
        let amp_norm = total_power_w.sqrt();
        sources
            .into_iter()
            .map(|source| {
                let amp = if source.power_w > 0.0 {
                    source.power_w.sqrt() / amp_norm
                } else {
                    0.0
                };
                BoundaryDriveComponent {
                    phasor: Complex64::from_polar(amp, source.phase_deg.to_radians()),
                    surface_tag: source.surface_tag,
                }
            })
            .collect()
    } else {
        let uniform_amp = 1.0 / sources.len() as f64;
        sources
            .into_iter()
            .map(|source| BoundaryDriveComponent {
                phasor: Complex64::from_polar(uniform_amp, source.phase_deg.to_radians()),
                surface_tag: source.surface_tag,
            })
            .collect()
    }
}

/// Global DC bias, saturated to the supported range.
pub fn dc_bias_voltage(request: &SimulationRequest) -> f64 {
    let value = request.process.dc_bias_v;
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(-DC_BIAS_LIMIT_V, DC_BIAS_LIMIT_V)
}

/// Map a bias voltage onto the solver-scale boundary offset. Negative bias
/// couples slightly harder (polarity gain 1.12); the offset saturates at
/// ±3.2 on the normalized potential scale.
pub fn bias_voltage_to_offset(dc_bias_v: f64) -> f64 {
    if !dc_bias_v.is_finite() {
        return 0.0;
    }
    let clamped = dc_bias_v.clamp(-DC_BIAS_LIMIT_V, DC_BIAS_LIMIT_V);
    if clamped.abs() < 1e-9 {
        return 0.0;
    }
    let polarity_gain = if clamped < 0.0 { 1.12 } else { 1.0 };
    ((clamped / 500.0) * polarity_gain).clamp(-3.2, 3.2)
}

/// Solver-scale offset of the global chuck bias.
pub fn derive_dc_bias_offset(request: &SimulationRequest) -> f64 {
    bias_voltage_to_offset(dc_bias_voltage(request))
}

/// Per-tag offsets of the configured DC-bias regions (summed per tag).
pub fn dc_bias_region_offsets(request: &SimulationRequest) -> BTreeMap<String, f64> {
    let mut offsets = BTreeMap::new();
    let Some(regions) = &request.process.dc_bias_regions else {
        return offsets;
    };
    for region in regions {
        let tag = region.target_tag.trim();
        if tag.is_empty() {
            continue;
        }
        *offsets.entry(tag.to_string()).or_insert(0.0) += bias_voltage_to_offset(region.dc_bias_v);
    }
    offsets
}
