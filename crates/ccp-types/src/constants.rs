// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Normalized solver constants.
//!
//! Transport coefficients are solver-scale (dimensionless), not SI: the
//! electrostatic drive is rescaled so the hottest powered cell sits at the
//! requested boundary amplitude, and the density observable is mapped onto
//! [0, 1] through a fixed saturating transfer curve.

/// Base electron mobility (normalized units).
pub const MU_E: f64 = 1.0;

/// Base normalized electron temperature.
pub const TE_NORM: f64 = 1.0;

/// Base electron diffusion coefficient: D_e = mu_e * Te (Einstein relation).
pub const D_E: f64 = MU_E * TE_NORM;

/// Relaxation rate toward the potential-derived reference density.
pub const LAMBDA_RELAX: f64 = 1e-2;

/// Base wall sink coefficient for grounded/dielectric faces.
pub const K_S_WALL: f64 = 0.05;

/// Base sink coefficient for powered-electrode faces.
pub const K_S_POWERED: f64 = 0.05;

/// Density floor to keep downstream ratios non-singular.
pub const N_FLOOR: f64 = 1e-8;

/// Iteration cap for the drift-diffusion Gauss-Seidel fallback.
pub const NE_MAX_ITER: usize = 5000;

/// Convergence tolerance for the drift-diffusion Gauss-Seidel fallback.
pub const NE_TOL: f64 = 1e-6;

/// Default effective electron temperature [eV].
pub const TE_EV_DEFAULT: f64 = 3.0;

/// Default mean ion mass [amu] (argon) when the mixture is unrecognized.
pub const MI_AMU_DEFAULT: f64 = 40.0;

/// Industrial RF reference frequency [Hz] (13.56 MHz).
pub const RF_REF_FREQ_HZ: f64 = 13_560_000.0;

/// Reference pump conductance [L/s] for outlet-strength scaling.
pub const PUMP_CONDUCTANCE_REF_LPS: f64 = 220.0;

/// Reference pump target pressure [Pa] for outlet-strength scaling.
pub const PUMP_TARGET_PRESSURE_REF_PA: f64 = 8.0;

/// Pascal per Torr.
pub const PA_PER_TORR: f64 = 133.322;

/// DC bias clamp [V]; inputs beyond this are saturated, not rejected.
pub const DC_BIAS_LIMIT_V: f64 = 5000.0;
