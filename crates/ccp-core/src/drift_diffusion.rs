// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Drift Diffusion
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Steady electron-density solve with Scharfetter-Gummel faces.
//!
//! Every plasma cell balances drift-diffusion fluxes (exponential-fitting
//! face coefficients driven by the frozen electric field) against wall and
//! electrode sinks, a relaxation toward the potential-derived reference
//! density, and an empirically parameterized ionization source. Each gain
//! in the source product is clamped to a bounded range, and the product
//! itself saturates, so the right-hand side stays finite for any input.
//!
//! Solve order: direct banded LU → damped Gauss-Seidel → closed-form
//! proxy. Every downgrade is recorded in the outcome and the warning list.

use ndarray::Array2;
use tracing::{debug, warn};

use ccp_math::bernoulli::bernoulli;
use ccp_math::csr::TripletMatrix;
use ccp_math::gauss_seidel::{gauss_seidel_solve, GsConfig};
use ccp_types::config::{GeometryGrid, RegionKind, SimulationRequest};
use ccp_types::constants::{NE_MAX_ITER, NE_TOL, N_FLOOR, RF_REF_FREQ_HZ};
use ccp_types::state::{ChamberGrid, NeSolverMetadata};

use crate::flow::{
    build_inlet_source_map, build_outlet_strength_map, direction_ion_gain, direction_loss_gain,
    frequency_axial_profile, frequency_radial_profile, inlet_axial_profile, inlet_direction,
    inlet_radial_profile, inlet_total_flow_sccm,
};
use crate::influence::relax_influence;
use crate::poisson::compute_e_magnitude;
use crate::rf_drive::{dc_bias_voltage, effective_rf_drive};
use crate::species::{attachment_factor, ionization_factor, weighted_factor};
use crate::transport::{
    derive_powered_boundary_voltage, mean_wall_loss, pressure_torr, TransportCoefficients,
};

/// Solver identifier reported in metadata.
pub const NE_METHOD: &str = "drift_diffusion_sg_v1";

/// Upper clamp on the per-cell ionization source.
const ION_SOURCE_MAX: f64 = 20.0;

/// How the density field was obtained.
#[derive(Debug, Clone)]
pub enum NeOutcome {
    /// Direct sparse solve succeeded.
    Solved { residual: f64 },
    /// Direct solve unavailable or failed; damped Gauss-Seidel ran instead.
    GaussSeidelFallback {
        converged: bool,
        iterations: usize,
        residual: f64,
    },
    /// No linear solve produced a usable field; the potential-derived proxy
    /// density stands in.
    Proxy {
        reason: String,
        iterations: usize,
        residual: f64,
    },
}

impl NeOutcome {
    pub fn converged(&self) -> bool {
        match self {
            NeOutcome::Solved { .. } => true,
            NeOutcome::GaussSeidelFallback { converged, .. } => *converged,
            NeOutcome::Proxy { .. } => false,
        }
    }

    /// True only when the closed-form proxy replaced a linear solve.
    pub fn proxy_used(&self) -> bool {
        matches!(self, NeOutcome::Proxy { .. })
    }

    pub fn iterations(&self) -> usize {
        match self {
            NeOutcome::Solved { .. } => 1,
            NeOutcome::GaussSeidelFallback { iterations, .. } => *iterations,
            NeOutcome::Proxy { iterations, .. } => *iterations,
        }
    }

    pub fn residual(&self) -> f64 {
        match self {
            NeOutcome::Solved { residual } => *residual,
            NeOutcome::GaussSeidelFallback { residual, .. } => *residual,
            NeOutcome::Proxy { residual, .. } => *residual,
        }
    }
}

/// Density solve result: normalized field plus solver metadata.
#[derive(Debug, Clone)]
pub struct NeSolve {
    pub ne: Array2<f64>,
    pub outcome: NeOutcome,
    pub metadata: NeSolverMetadata,
}

/// Deterministic reference density from φ: Boltzmann-like exponential of
/// the potential above its minimum, normalized to [0, 1].
pub fn build_ne_proxy_from_phi(phi: &Array2<f64>) -> Array2<f64> {
    let phi_ref = phi.iter().copied().fold(f64::INFINITY, f64::min);
    if !phi_ref.is_finite() {
        return Array2::zeros(phi.dim());
    }
    let raw = phi.mapv(|v| (v - phi_ref).exp());
    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return Array2::zeros(phi.dim());
    }
    raw.mapv(|v| (v - min) / (max - min))
}

/// Map the raw solved density onto the [0, 1] observable through a fixed
/// saturating transfer curve. The saturation level is a function of the
/// request alone (pressure, flow, pumping, gas, RF drive), never of the
/// solved grid, so baseline and perturbed solves share one scale.
fn to_density_observable(
    ne_raw: &Array2<f64>,
    request: &SimulationRequest,
    total_pump_strength: f64,
) -> Array2<f64> {
    let pressure = pressure_torr(request);
    let inlet_flow_sccm = inlet_total_flow_sccm(request);
    let direction = inlet_direction(request);
    let ion_gain_dir = direction_ion_gain(direction);
    let loss_gain_dir = direction_loss_gain(direction);
    let gas_ionization = weighted_factor(&request.gas, ionization_factor, 1.0);
    let gas_attachment = weighted_factor(&request.gas, attachment_factor, 0.45);
    let rf_drive = effective_rf_drive(request);
    let power_w = rf_drive.total_power_w.max(0.0);
    let frequency_hz = rf_drive.effective_frequency_hz.max(1.0);
    let dc_bias_v = dc_bias_voltage(request);

    let rf_power_gain = ((power_w + 40.0) / 540.0).powf(0.58).clamp(0.5, 4.8);
    let rf_freq_gain = (frequency_hz / RF_REF_FREQ_HZ).powf(0.14).clamp(0.75, 1.8);
    let dc_gain = (1.0 + dc_bias_v.abs() / 700.0).powf(0.22).clamp(0.9, 1.7);
    let dc_polarity_gain = (1.0 + (-dc_bias_v / 2000.0)).clamp(0.82, 1.24);
    let rf_gain = (rf_power_gain
        * rf_freq_gain
        * dc_gain
        * dc_polarity_gain
        * rf_drive.multi_source_factor.powf(0.14))
    .clamp(0.45, 5.5);

    let mut n_sat = 0.08 * ((pressure + 0.04) / 0.14).powf(0.32);
    n_sat *= (1.0 + inlet_flow_sccm / 520.0).powf(0.42);
    n_sat *= 1.0 + 0.16 * total_pump_strength * loss_gain_dir;
    n_sat /= gas_ionization.max(0.35).powf(0.28);
    n_sat *= gas_attachment.max(0.15).powf(0.18);
    n_sat /= rf_gain.clamp(0.65, 2.9).powf(0.45);
    n_sat /= ion_gain_dir.clamp(0.8, 1.2).powf(0.2);
    let n_sat = n_sat.clamp(0.03, 0.55);

    let rf_nonlin_gain = rf_gain.powf(0.78).clamp(0.45, 4.2);
    let gas_reactivity_gain = (gas_ionization / gas_attachment.max(0.2))
        .powf(0.22)
        .clamp(0.65, 1.75);
    let pump_damping =
        (1.0 / (1.0 + 0.14 * total_pump_strength * loss_gain_dir)).clamp(0.45, 1.0);

    ne_raw.mapv(|value| {
        if !value.is_finite() || value <= 0.0 {
            return 0.0;
        }
        let value_eff = value * rf_nonlin_gain * gas_reactivity_gain * pump_damping;
        (value_eff / (value_eff + n_sat)).clamp(0.0, 1.0)
    })
}

fn metadata_from(
    coeff: &TransportCoefficients,
    effective_bulk_loss: f64,
    outcome: &NeOutcome,
    warnings: Vec<String>,
) -> NeSolverMetadata {
    NeSolverMetadata {
        method: NE_METHOD.to_string(),
        mu_e: coeff.mu_e,
        d_e: coeff.d_e,
        te_norm: coeff.te_norm,
        te_ev: coeff.te_ev,
        k_s_wall: coeff.k_s_wall,
        k_s_powered: coeff.k_s_powered,
        lambda_relax: coeff.lambda_relax,
        ionization_gain: coeff.ionization_gain,
        bulk_loss: effective_bulk_loss,
        converged: outcome.converged(),
        iterations: outcome.iterations(),
        residual: outcome.residual(),
        fallback_used: outcome.proxy_used(),
        warnings,
    }
}

/// Solve the steady drift-diffusion balance for the normalized electron
/// density on the plasma region.
pub fn solve_ne(
    phi: &Array2<f64>,
    request: &SimulationRequest,
    chamber: &ChamberGrid,
    grid: &GeometryGrid,
    regions: &Array2<RegionKind>,
    coeff: &TransportCoefficients,
) -> NeSolve {
    let mut warnings: Vec<String> = Vec::new();
    let mu_e = coeff.mu_e;
    let d_e = coeff.d_e;

    if d_e <= 0.0 {
        warn!("non-positive electron diffusion coefficient, using proxy density");
        warnings.push("D_e must be positive; using proxy ne".to_string());
        let outcome = NeOutcome::Proxy {
            reason: "non-positive D_e".to_string(),
            iterations: 0,
            residual: 0.0,
        };
        let metadata = metadata_from(coeff, coeff.bulk_loss, &outcome, warnings);
        return NeSolve {
            ne: build_ne_proxy_from_phi(phi),
            outcome,
            metadata,
        };
    }

    let nr = grid.nr;
    let nz = grid.nz;
    let dr = chamber.dr;
    let dz = chamber.dz;
    let pressure = pressure_torr(request);
    let inlet_flow_sccm = inlet_total_flow_sccm(request);
    let direction = inlet_direction(request);
    let ion_gain_dir = direction_ion_gain(direction);
    let loss_gain_dir = direction_loss_gain(direction);
    let radial_profile = inlet_radial_profile(direction, nr);
    let axial_profile = inlet_axial_profile(direction, nz);

    let (inlet_source_map, inlet_coverage) = build_inlet_source_map(request, grid, &mut warnings);
    let inlet_spread_steps = (0.08 * (nr + nz) as f64) as usize;
    let inlet_influence = relax_influence(
        &inlet_source_map,
        inlet_spread_steps.clamp(6, 28),
        0.9,
    );

    let rf_drive = effective_rf_drive(request);
    let frequency_hz = rf_drive.effective_frequency_hz.max(1.0);
    let dc_bias_v = dc_bias_voltage(request);
    let dc_abs_norm = (dc_bias_v.abs() / 650.0).clamp(0.0, 6.0);
    let dc_sheath_gain = (1.0 + 0.12 * dc_abs_norm).clamp(1.0, 1.85);
    let dc_loss_gain = (1.0 + 0.07 * dc_abs_norm).clamp(1.0, 1.45);
    let dc_polarity_ion_gain = (1.0 + (-dc_bias_v / 2400.0)).clamp(0.8, 1.35);
    let freq_radial = frequency_radial_profile(nr, frequency_hz);
    let freq_axial = frequency_axial_profile(nz, frequency_hz);

    let gas_ionization = weighted_factor(&request.gas, ionization_factor, 1.0);
    let gas_attachment = weighted_factor(&request.gas, attachment_factor, 0.45);
    let gas_reactivity_gain = (gas_ionization / gas_attachment.max(0.2))
        .powf(0.32)
        .clamp(0.62, 2.2);
    let wall_loss_mean = mean_wall_loss(request);
    let powered_voltage = derive_powered_boundary_voltage(request);

    let (outlet_strength_map, total_pump_strength) =
        build_outlet_strength_map(request, grid, &mut warnings);
    let outlet_spread_steps = (0.06 * (nr + nz) as f64) as usize;
    let outlet_influence = relax_influence(
        &outlet_strength_map,
        outlet_spread_steps.clamp(6, 24),
        0.88,
    );

    let pump_bulk_loss = (0.018 * total_pump_strength).clamp(0.0, 0.16);
    let flow_residence_loss =
        (0.0012 * inlet_flow_sccm / pressure.max(0.2)).clamp(0.0, 0.12);
    let wall_quench_loss = (0.05 * wall_loss_mean).clamp(0.0, 0.08);
    let attachment_bulk_gain = (0.72 + 0.42 * gas_attachment).clamp(0.65, 1.75);
    let effective_bulk_loss = ((coeff.bulk_loss
        + pump_bulk_loss
        + flow_residence_loss
        + wall_quench_loss)
        * attachment_bulk_gain
        * dc_loss_gain
        * loss_gain_dir)
        .clamp(0.003, 0.34);

    let pump_face_sink_gain = (0.06 * total_pump_strength).clamp(0.0, 1.1);
    let pump_local_sink_gain = (0.035 * total_pump_strength).clamp(0.0, 0.65);
    let convective_sink_gain =
        (0.018 + 0.008 * inlet_flow_sccm / pressure.max(0.2)).clamp(0.01, 0.22);
    let power_coupling_gain = ((powered_voltage.max(0.0) + 0.08).powf(0.9)
        * dc_sheath_gain
        * dc_polarity_ion_gain)
        .clamp(0.3, 4.6);
    let power_trend_gain = ((rf_drive.total_power_w.max(0.0) + 40.0) / 540.0)
        .powf(0.62)
        .clamp(0.35, 6.5);
    let frequency_trend_gain = (frequency_hz / RF_REF_FREQ_HZ).powf(0.25).clamp(0.55, 2.1);
    let inlet_flow_gain =
        (0.35 + 0.0038 * inlet_flow_sccm / pressure.max(0.2)).clamp(0.25, 2.6);
    let inlet_coverage_gain = (0.8 + 3.5 * inlet_coverage).clamp(0.8, 1.9);
    let frequency_sheath_gain = ((frequency_hz / RF_REF_FREQ_HZ).powf(0.18)
        * (1.0 + 0.08 * dc_abs_norm))
        .clamp(0.76, 2.25);
    let flow_residence_factor =
        (1.0 / (1.0 + 0.0045 * inlet_flow_sccm / pressure.max(0.2))).clamp(0.35, 1.0);
    let pump_exhaust_factor = (1.0 / (1.0 + 0.22 * total_pump_strength)).clamp(0.45, 1.0);
    let radial_center = 0.5 * (nr - 1) as f64;
    let radial_span = radial_center.max(1.0);

    let n_ref = build_ne_proxy_from_phi(phi);
    let e_mag = compute_e_magnitude(phi, dr, dz);
    let e_ref = (0.07 + 0.26 * (pressure / (pressure + 0.6))).clamp(0.05, 0.38);

    let coef_r = d_e / (dr * dr);
    let coef_z = d_e / (dz * dz);

    let total = nz * nr;
    let mut triplets = TripletMatrix::new(total);
    let mut b = vec![0.0; total];
    let idx = |k: usize, j: usize| k * nr + j;
    let outlet_strength = |k: usize, j: usize| outlet_strength_map[[k, j]];

    debug!(nz, nr, "assembling drift-diffusion system");

    for k in 0..nz {
        for j in 0..nr {
            let i = idx(k, j);
            if regions[[k, j]] != RegionKind::Plasma {
                triplets.add(i, i, 1.0);
                b[i] = N_FLOOR;
                continue;
            }

            let local_outlet = outlet_influence[[k, j]];
            let inlet_local = inlet_influence[[k, j]];
            let local_convective_sink = convective_sink_gain
                * (0.55 * local_outlet + 0.25 * inlet_local + 0.20 * (1.0 - axial_profile[k]));
            let mut a_p = coeff.lambda_relax
                + effective_bulk_loss
                + pump_local_sink_gain * local_outlet
                + local_convective_sink;

            // East face
            if j < nr - 1 {
                match regions[[k, j + 1]] {
                    RegionKind::Plasma => {
                        let pe = mu_e * (phi[[k, j + 1]] - phi[[k, j]]) / d_e;
                        a_p += coef_r * bernoulli(pe);
                        triplets.add(i, idx(k, j + 1), -coef_r * bernoulli(-pe));
                    }
                    neighbor => {
                        let mut sink = if neighbor == RegionKind::PoweredElectrode {
                            coeff.k_s_powered
                        } else {
                            coeff.k_s_wall
                        };
                        sink += pump_face_sink_gain * outlet_strength(k, j + 1);
                        a_p += sink / dr;
                    }
                }
            } else {
                let sink = coeff.k_s_wall + pump_face_sink_gain * outlet_strength(k, j);
                a_p += sink / dr;
            }

            // West face; no flux across the r = 0 axis
            if j > 0 {
                match regions[[k, j - 1]] {
                    RegionKind::Plasma => {
                        let pe = mu_e * (phi[[k, j]] - phi[[k, j - 1]]) / d_e;
                        a_p += coef_r * bernoulli(-pe);
                        triplets.add(i, idx(k, j - 1), -coef_r * bernoulli(pe));
                    }
                    neighbor => {
                        let mut sink = if neighbor == RegionKind::PoweredElectrode {
                            coeff.k_s_powered
                        } else {
                            coeff.k_s_wall
                        };
                        sink += pump_face_sink_gain * outlet_strength(k, j - 1);
                        a_p += sink / dr;
                    }
                }
            }

            // North face
            if k < nz - 1 {
                match regions[[k + 1, j]] {
                    RegionKind::Plasma => {
                        let pe = mu_e * (phi[[k + 1, j]] - phi[[k, j]]) / d_e;
                        a_p += coef_z * bernoulli(pe);
                        triplets.add(i, idx(k + 1, j), -coef_z * bernoulli(-pe));
                    }
                    neighbor => {
                        let mut sink = if neighbor == RegionKind::PoweredElectrode {
                            coeff.k_s_powered
                        } else {
                            coeff.k_s_wall
                        };
                        sink += pump_face_sink_gain * outlet_strength(k + 1, j);
                        a_p += sink / dz;
                    }
                }
            } else {
                let sink = coeff.k_s_wall + pump_face_sink_gain * outlet_strength(k, j);
                a_p += sink / dz;
            }

            // South face
            if k > 0 {
                match regions[[k - 1, j]] {
                    RegionKind::Plasma => {
                        let pe = mu_e * (phi[[k, j]] - phi[[k - 1, j]]) / d_e;
                        a_p += coef_z * bernoulli(-pe);
                        triplets.add(i, idx(k - 1, j), -coef_z * bernoulli(pe));
                    }
                    neighbor => {
                        let mut sink = if neighbor == RegionKind::PoweredElectrode {
                            coeff.k_s_powered
                        } else {
                            coeff.k_s_wall
                        };
                        sink += pump_face_sink_gain * outlet_strength(k - 1, j);
                        a_p += sink / dz;
                    }
                }
            } else {
                let sink = coeff.k_s_wall + pump_face_sink_gain * outlet_strength(k, j);
                a_p += sink / dz;
            }

            triplets.add(i, i, a_p);

            let e_local = {
                let value = e_mag[[k, j]];
                if value.is_finite() && value > 0.0 {
                    value
                } else {
                    0.0
                }
            };
            let inlet_gain = ion_gain_dir
                * radial_profile[j]
                * axial_profile[k]
                * (1.0 + inlet_flow_gain * inlet_coverage_gain * inlet_local);
            let frequency_gain = frequency_trend_gain * freq_radial[j] * freq_axial[k];
            let edge_ratio = (j as f64 - radial_center).abs() / radial_span;
            let sheath_coupling_gain = (1.0
                + 0.32
                    * (frequency_sheath_gain - 1.0)
                    * (0.45 + 0.55 * edge_ratio)
                    * (0.35 + 0.65 * axial_profile[k]))
                .clamp(0.72, 1.95);
            let local_feed_exhaust_gain =
                ((1.0 + 0.85 * inlet_local) / (1.0 + 0.65 * local_outlet)).clamp(0.35, 2.6);
            let local_attachment_gain = (1.0
                / (1.0 + 0.32 * gas_attachment * (0.25 + local_outlet)))
            .clamp(0.45, 1.08);
            let e_source_gain = (e_local / (e_local + e_ref)).powf(0.78);

            let ion_source = (coeff.ionization_gain
                * power_coupling_gain
                * power_trend_gain
                * flow_residence_factor
                * pump_exhaust_factor
                * gas_reactivity_gain
                * inlet_gain
                * frequency_gain
                * sheath_coupling_gain
                * local_feed_exhaust_gain
                * local_attachment_gain
                * e_source_gain)
                .clamp(0.0, ION_SOURCE_MAX);
            b[i] = coeff.lambda_relax * n_ref[[k, j]] + ion_source;
        }
    }

    let matrix = triplets.to_csr();
    let x0: Vec<f64> = (0..total).map(|i| n_ref[[i / nr, i % nr]]).collect();

    #[cfg(feature = "direct-solver")]
    let direct: Option<(Vec<f64>, NeOutcome)> = match ccp_math::band::band_lu_solve(&matrix, &b) {
        Ok(x) if x.iter().all(|v| v.is_finite()) => {
            let clamped: Vec<f64> = x.into_iter().map(|v| v.max(N_FLOOR)).collect();
            let residual = matrix.residual_inf(&clamped, &b);
            Some((clamped, NeOutcome::Solved { residual }))
        }
        Ok(_) => {
            warn!("direct drift-diffusion solve returned non-finite values");
            warnings.push("direct solve non-finite; using Gauss-Seidel".to_string());
            None
        }
        Err(err) => {
            warn!(error = %err, "direct drift-diffusion solve failed");
            warnings.push(format!("direct solve failed: {err}; using Gauss-Seidel"));
            None
        }
    };
    #[cfg(not(feature = "direct-solver"))]
    let direct: Option<(Vec<f64>, NeOutcome)> = None;

    let (solution, outcome) = match direct {
        Some(result) => result,
        None => {
            let gs_config = GsConfig {
                tol: NE_TOL,
                max_iter: NE_MAX_ITER,
                floor: Some(N_FLOOR),
            };
            let gs = gauss_seidel_solve(&matrix, &b, &x0, &gs_config);
            warnings.extend(gs.warnings);
            if gs.converged {
                (
                    gs.x,
                    NeOutcome::GaussSeidelFallback {
                        converged: true,
                        iterations: gs.iterations,
                        residual: gs.residual,
                    },
                )
            } else {
                warn!(
                    iterations = gs.iterations,
                    residual = gs.residual,
                    "drift-diffusion did not converge, using proxy density"
                );
                warnings.push("drift-diffusion did not converge; using proxy ne".to_string());
                (
                    x0,
                    NeOutcome::Proxy {
                        reason: "Gauss-Seidel did not converge".to_string(),
                        iterations: gs.iterations,
                        residual: gs.residual,
                    },
                )
            }
        }
    };

    let ne_raw = Array2::from_shape_fn((nz, nr), |(k, j)| solution[idx(k, j)]);
    let ne = to_density_observable(&ne_raw, request, total_pump_strength);
    let metadata = metadata_from(coeff, effective_bulk_loss, &outcome, warnings);

    NeSolve { ne, outcome, metadata }
}
