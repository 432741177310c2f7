// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Transport
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Empirically parameterized transport coefficients.
//!
//! Derived once per request from pressure, effective RF drive, DC bias and
//! gas mixture. Every coefficient is clamped to a bounded range so a single
//! extreme input cannot destabilize the transport solve. The scalings are
//! calibrated trend fits, not cross-section physics.

use ccp_types::config::SimulationRequest;
use ccp_types::constants::{
    D_E, K_S_WALL, LAMBDA_RELAX, MU_E, PA_PER_TORR, RF_REF_FREQ_HZ, TE_EV_DEFAULT,
};

use crate::rf_drive::{dc_bias_voltage, effective_rf_drive};
use crate::species::{
    attachment_factor, ionization_factor, mobility_factor, te_factor, weighted_factor,
};

/// Transport closure set; all members strictly positive.
#[derive(Debug, Clone, Copy)]
pub struct TransportCoefficients {
    pub mu_e: f64,
    pub d_e: f64,
    pub te_norm: f64,
    pub te_ev: f64,
    pub k_s_wall: f64,
    pub k_s_powered: f64,
    pub lambda_relax: f64,
    pub ionization_gain: f64,
    pub bulk_loss: f64,
}

/// Chamber pressure in Torr with a floor that keeps power-law factors
/// bounded.
pub fn pressure_torr(request: &SimulationRequest) -> f64 {
    (request.process.pressure_pa / PA_PER_TORR).max(0.005)
}

/// Effective electron temperature [eV] estimated from process conditions.
pub fn estimate_te_ev(request: &SimulationRequest) -> f64 {
    let rf_drive = effective_rf_drive(request);
    let pressure = pressure_torr(request);
    let power_w = rf_drive.total_power_w.max(0.0);
    let frequency_hz = rf_drive.effective_frequency_hz.max(1.0);

    let gas_factor = weighted_factor(&request.gas, te_factor, 1.0);
    let power_factor = ((power_w + 40.0) / 540.0).powf(0.35);
    let pressure_factor = (0.12 / pressure).powf(0.22);
    let freq_factor = (frequency_hz / RF_REF_FREQ_HZ).powf(0.08);
    let multi_source_factor = rf_drive.multi_source_factor.powf(0.16);

    (TE_EV_DEFAULT * power_factor * pressure_factor * gas_factor * freq_factor
        * multi_source_factor)
        .clamp(1.0, 8.5)
}

/// Powered-electrode boundary amplitude on the normalized potential scale.
pub fn derive_powered_boundary_voltage(request: &SimulationRequest) -> f64 {
    let rf_drive = effective_rf_drive(request);
    let pressure = pressure_torr(request);
    let power_w = rf_drive.total_power_w.max(0.0);
    let frequency_hz = rf_drive.effective_frequency_hz.max(1.0);
    let dc_bias_v = dc_bias_voltage(request);

    if power_w <= 0.0 {
        return 0.0;
    }

    let power_factor = (power_w / 500.0).powf(0.5);
    let pressure_factor = (0.12 / pressure).powf(0.22);
    let freq_factor = (frequency_hz / RF_REF_FREQ_HZ).powf(0.08);
    let gas_factor = weighted_factor(&request.gas, ionization_factor, 1.0).powf(0.6);
    let multi_source_factor = rf_drive.multi_source_factor.powf(0.18);
    let dc_gain = (1.0 + dc_bias_v.abs() / 650.0).powf(0.08).clamp(0.92, 1.35);

    (power_factor * pressure_factor * freq_factor * gas_factor * multi_source_factor * dc_gain)
        .clamp(0.0, 4.5)
}

/// Mean of the default wall-loss coefficient and all configured overrides.
pub fn mean_wall_loss(request: &SimulationRequest) -> f64 {
    let mut values = vec![request.material.default.wall_loss_e.clamp(0.0, 1.0)];
    for region in &request.material.regions {
        if let Some(wall_loss_e) = region.wall_loss_e {
            values.push(wall_loss_e.clamp(0.0, 1.0));
        }
    }
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Derive the full transport closure set for one request.
pub fn derive_transport_coefficients(request: &SimulationRequest) -> TransportCoefficients {
    let rf_drive = effective_rf_drive(request);
    let pressure = pressure_torr(request);
    let power_w = rf_drive.total_power_w.max(0.0);
    let power_norm =
        ((power_w + 40.0) / 540.0).powf(0.5) * rf_drive.multi_source_factor.powf(0.25);
    let frequency_hz = rf_drive.effective_frequency_hz.max(1.0);

    let gas_mu_factor = weighted_factor(&request.gas, mobility_factor, 1.0);
    let gas_ionization_factor = weighted_factor(&request.gas, ionization_factor, 1.0);
    let gas_attachment_factor = weighted_factor(&request.gas, attachment_factor, 0.45);
    let te_ev = estimate_te_ev(request);
    let te_norm = te_ev / TE_EV_DEFAULT;

    let mu_scale = (0.1 / pressure).powf(0.65) * gas_mu_factor;
    let mu_e = (MU_E * mu_scale).clamp(0.08, 4.0);
    let d_e = D_E * (mu_e / MU_E) * te_norm;

    let wall_scale = 1.0 + 0.45 * pressure / (pressure + 0.15);
    let k_s_wall = (K_S_WALL * wall_scale).clamp(0.015, 0.35);
    let k_s_powered = (k_s_wall
        * (1.2 + 0.6 * power_norm)
        * (1.0 + 0.18 * (rf_drive.multi_source_factor - 1.0)))
        .clamp(0.02, 0.45);
    let lambda_relax = (LAMBDA_RELAX
        * (0.7 + 0.9 * power_norm)
        * (1.0 + 0.08 * (rf_drive.multi_source_factor - 1.0)))
        .clamp(0.002, 0.04);

    let freq_factor =
        (frequency_hz / RF_REF_FREQ_HZ).powf(0.2) * rf_drive.multi_source_factor.powf(0.12);
    let ionization_gain = (0.014
        * power_norm
        * te_norm
        * freq_factor
        * rf_drive.multi_source_factor
        * gas_ionization_factor
        * (0.12 / pressure).powf(0.3))
    .clamp(0.002, 0.09);

    let attachment_loss =
        (0.008 * gas_attachment_factor * (pressure / 0.1).powf(0.35)).clamp(0.001, 0.06);
    let geometric_loss = (0.006 + 0.012 * pressure / (pressure + 0.15)).clamp(0.004, 0.03);
    let bulk_loss = (attachment_loss + geometric_loss).clamp(0.005, 0.08);

    TransportCoefficients {
        mu_e,
        d_e,
        te_norm,
        te_ev,
        k_s_wall,
        k_s_powered,
        lambda_relax,
        ionization_gain,
        bulk_loss,
    }
}
