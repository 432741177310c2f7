// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Ion
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Ion-energy and ion-flux proxy curves.
//!
//! Energy proxy: potential drop between the sheath boundary and the
//! electrode surface per column. Flux proxy: Bohm-like
//! `ne · √(Te_eV / Mi_amu)` with a mixture-weighted mean ion mass.

use ndarray::Array2;

use ccp_core::species::{ion_mass_amu, normalize_species};
use ccp_types::config::Gas;
use ccp_types::constants::MI_AMU_DEFAULT;
use ccp_types::state::{IonProxyCurves, SheathMetrics};

use crate::insights::sample_field_by_z;

/// Mixture-weighted mean ion mass [amu]; falls back to the argon default
/// (with a warning string) when the mixture is missing or unrecognized.
pub fn infer_mi_amu(gas: &Gas) -> (f64, Option<String>) {
    if gas.mixture.is_empty() {
        return (MI_AMU_DEFAULT, Some("gas mixture missing; using Mi_amu=40".into()));
    }

    let mut weighted_mass = 0.0;
    let mut known_fraction = 0.0;
    for component in &gas.mixture {
        let fraction = component.fraction.max(0.0);
        if let Some(mass) = ion_mass_amu(&normalize_species(&component.species)) {
            weighted_mass += fraction * mass;
            known_fraction += fraction;
        }
    }

    if known_fraction <= 0.0 {
        let dominant = gas
            .mixture
            .iter()
            .max_by(|a, b| {
                a.fraction
                    .partial_cmp(&b.fraction)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|c| c.species.clone())
            .unwrap_or_default();
        return (
            MI_AMU_DEFAULT,
            Some(format!("unknown dominant gas '{dominant}'; using Mi_amu=40")),
        );
    }

    let mi_amu = weighted_mass / known_fraction;
    let warning = (known_fraction < 0.9)
        .then(|| "gas includes unknown species; Mi_amu inferred from known components".to_string());
    (mi_amu, warning)
}

/// Compute the ion proxy curves from φ, the sheath metrics and the density.
pub fn compute_ion_proxy(
    gas: &Gas,
    phi: &Array2<f64>,
    sheath_metrics: &SheathMetrics,
    ne: Option<&Array2<f64>>,
    z_values: &[f64],
    te_ev_used: f64,
) -> IonProxyCurves {
    let mut warnings: Vec<String> = Vec::new();
    let te_ev = te_ev_used.clamp(0.5, 15.0);

    let mut ion_energy_proxy: Option<Vec<f64>> = None;
    match &sheath_metrics.electrode_z_mm_by_r {
        None => {
            warnings.push("electrode_z_mm_by_r missing; ion_energy_proxy unavailable".to_string());
        }
        Some(electrode_z) => {
            let sampled = sample_field_by_z(phi, &sheath_metrics.z_mm_by_r, z_values)
                .and_then(|phi_sheath| {
                    sample_field_by_z(phi, electrode_z, z_values)
                        .map(|phi_electrode| (phi_sheath, phi_electrode))
                });
            match sampled {
                Ok((phi_sheath, phi_electrode)) => {
                    let mut energy = Vec::with_capacity(phi_sheath.len());
                    for (ps, pe) in phi_sheath.iter().zip(&phi_electrode) {
                        if !ps.is_finite() || !pe.is_finite() {
                            energy.push(0.0);
                            warnings.push(
                                "non-finite phi sample; ion_energy_proxy clamped to 0".to_string(),
                            );
                        } else {
                            energy.push((ps - pe).abs().max(0.0));
                        }
                    }
                    ion_energy_proxy = Some(energy);

                    let max_phi = phi.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    if max_phi <= 2.0 {
                        warnings.push(
                            "phi appears normalized; ion_energy_proxy is relative, not absolute eV"
                                .to_string(),
                        );
                    }
                }
                Err(err) => {
                    warnings.push(format!("failed to sample phi for ion_energy_proxy: {err}"));
                }
            }
        }
    }

    let (mi_used, mi_warning) = infer_mi_amu(gas);
    if let Some(warning) = mi_warning {
        warnings.push(warning);
    }

    let mut ion_flux_proxy: Option<Vec<f64>> = None;
    match ne {
        None => warnings.push("ne missing; ion_flux_proxy unavailable".to_string()),
        Some(ne_field) => {
            match sample_field_by_z(ne_field, &sheath_metrics.z_mm_by_r, z_values) {
                Ok(ne_on_sheath) => {
                    let flux_factor = (te_ev / mi_used).sqrt();
                    let mut flux = Vec::with_capacity(ne_on_sheath.len());
                    for value in ne_on_sheath {
                        if !value.is_finite() {
                            flux.push(0.0);
                            warnings.push(
                                "non-finite ne sample; ion_flux_proxy clamped to 0".to_string(),
                            );
                        } else {
                            flux.push(value.max(0.0) * flux_factor);
                        }
                    }
                    ion_flux_proxy = Some(flux);
                }
                Err(err) => {
                    warnings.push(format!("failed to compute ion_flux_proxy: {err}"));
                }
            }
        }
    }

    IonProxyCurves {
        ion_energy_proxy_rel_by_r: ion_energy_proxy,
        ion_flux_proxy_rel_by_r: ion_flux_proxy,
        te_ev_used: te_ev,
        mi_amu_used: mi_used,
        warnings,
    }
}

/// Delta ion proxies (perturbed − baseline) with warning provenance.
pub fn compute_delta_ion_proxy(
    baseline: &IonProxyCurves,
    perturbed: &IonProxyCurves,
) -> IonProxyCurves {
    let mut warnings: Vec<String> = baseline
        .warnings
        .iter()
        .map(|msg| format!("baseline: {msg}"))
        .chain(perturbed.warnings.iter().map(|msg| format!("perturbed: {msg}")))
        .collect();

    let mut delta_list = |base: Option<&Vec<f64>>, pert: Option<&Vec<f64>>, label: &str| {
        let (Some(base), Some(pert)) = (base, pert) else {
            warnings.push(format!("{label} missing for delta"));
            return None;
        };
        if base.len() != pert.len() {
            warnings.push(format!("{label} length mismatch for delta"));
            return None;
        }
        Some(base.iter().zip(pert).map(|(b, p)| p - b).collect::<Vec<f64>>())
    };

    let energy_delta = delta_list(
        baseline.ion_energy_proxy_rel_by_r.as_ref(),
        perturbed.ion_energy_proxy_rel_by_r.as_ref(),
        "ion_energy_proxy_rel_by_r",
    );
    let flux_delta = delta_list(
        baseline.ion_flux_proxy_rel_by_r.as_ref(),
        perturbed.ion_flux_proxy_rel_by_r.as_ref(),
        "ion_flux_proxy_rel_by_r",
    );

    IonProxyCurves {
        ion_energy_proxy_rel_by_r: energy_delta,
        ion_flux_proxy_rel_by_r: flux_delta,
        te_ev_used: baseline.te_ev_used,
        mi_amu_used: baseline.mi_amu_used,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccp_types::config::GasComponent;

    fn gas(components: &[(&str, f64)]) -> Gas {
        Gas {
            mixture: components
                .iter()
                .map(|(species, fraction)| GasComponent {
                    species: (*species).into(),
                    fraction: *fraction,
                })
                .collect(),
        }
    }

    fn metrics(z_by_r: Vec<f64>, electrode: Option<Vec<f64>>) -> SheathMetrics {
        SheathMetrics {
            z_mm_by_r: z_by_r,
            electrode_z_mm_by_r: electrode,
            thickness_mm_by_r: None,
            thickness_mean_mm: None,
            thickness_min_mm: None,
            thickness_max_mm: None,
            z_mean_mm: 0.0,
            z_min_mm: 0.0,
            z_max_mm: 0.0,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_mi_amu_pure_argon() {
        let (mi, warning) = infer_mi_amu(&gas(&[("Ar", 1.0)]));
        assert!((mi - 40.0).abs() < 1e-12);
        assert!(warning.is_none());
    }

    #[test]
    fn test_mi_amu_mixture_weighted() {
        let (mi, warning) = infer_mi_amu(&gas(&[("Ar", 0.5), ("He", 0.5)]));
        assert!((mi - 22.0).abs() < 1e-12);
        assert!(warning.is_none());
    }

    #[test]
    fn test_mi_amu_unknown_dominant_falls_back() {
        let (mi, warning) = infer_mi_amu(&gas(&[("xe", 1.0)]));
        assert!((mi - MI_AMU_DEFAULT).abs() < 1e-12);
        assert!(warning.unwrap().contains("unknown dominant gas"));
    }

    #[test]
    fn test_mi_amu_partially_known_mixture_warns() {
        let (mi, warning) = infer_mi_amu(&gas(&[("Ar", 0.5), ("xe", 0.5)]));
        assert!((mi - 40.0).abs() < 1e-12, "inferred from the known half");
        assert!(warning.unwrap().contains("unknown species"));
    }

    #[test]
    fn test_ion_proxy_energy_and_flux() {
        // φ falls linearly from 1 at k=0 to 0 at k=3.
        let phi = Array2::from_shape_fn((4, 2), |(k, _)| 1.0 - k as f64 / 3.0);
        let ne = Array2::from_elem((4, 2), 0.5);
        let z = vec![0.0, 1.0, 2.0, 3.0];
        let m = metrics(vec![3.0, 3.0], Some(vec![0.0, 0.0]));

        let proxy = compute_ion_proxy(&gas(&[("Ar", 1.0)]), &phi, &m, Some(&ne), &z, 3.0);
        let energy = proxy.ion_energy_proxy_rel_by_r.unwrap();
        assert_eq!(energy.len(), 2);
        assert!(energy.iter().all(|e| *e > 0.0));
        let flux = proxy.ion_flux_proxy_rel_by_r.unwrap();
        let expected = 0.5 * (3.0_f64 / 40.0).sqrt();
        assert!(flux.iter().all(|f| (f - expected).abs() < 1e-12));
        assert!(proxy.warnings.iter().any(|w| w.contains("phi appears normalized")));
    }

    #[test]
    fn test_ion_proxy_without_electrode_or_ne() {
        let phi = Array2::from_elem((3, 2), 0.5);
        let z = vec![0.0, 1.0, 2.0];
        let m = metrics(vec![1.0, 1.0], None);
        let proxy = compute_ion_proxy(&gas(&[("Ar", 1.0)]), &phi, &m, None, &z, 3.0);
        assert!(proxy.ion_energy_proxy_rel_by_r.is_none());
        assert!(proxy.ion_flux_proxy_rel_by_r.is_none());
        assert!(proxy
            .warnings
            .iter()
            .any(|w| w.contains("electrode_z_mm_by_r missing")));
        assert!(proxy.warnings.iter().any(|w| w.contains("ne missing")));
    }

    #[test]
    fn test_te_clamped_into_supported_band() {
        let phi = Array2::from_elem((3, 2), 0.5);
        let z = vec![0.0, 1.0, 2.0];
        let m = metrics(vec![1.0, 1.0], None);
        let proxy = compute_ion_proxy(&gas(&[("Ar", 1.0)]), &phi, &m, None, &z, 99.0);
        assert!((proxy.te_ev_used - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_delta_ion_proxy() {
        let base = IonProxyCurves {
            ion_energy_proxy_rel_by_r: Some(vec![1.0, 2.0]),
            ion_flux_proxy_rel_by_r: None,
            te_ev_used: 3.0,
            mi_amu_used: 40.0,
            warnings: vec!["note".into()],
        };
        let pert = IonProxyCurves {
            ion_energy_proxy_rel_by_r: Some(vec![1.5, 2.25]),
            ion_flux_proxy_rel_by_r: None,
            te_ev_used: 3.0,
            mi_amu_used: 40.0,
            warnings: Vec::new(),
        };
        let delta = compute_delta_ion_proxy(&base, &pert);
        let energy = delta.ion_energy_proxy_rel_by_r.unwrap();
        assert!((energy[0] - 0.5).abs() < 1e-12);
        assert!((energy[1] - 0.25).abs() < 1e-12);
        assert!(delta.ion_flux_proxy_rel_by_r.is_none());
        assert!(delta.warnings.iter().any(|w| w == "baseline: note"));
        assert!(delta
            .warnings
            .iter()
            .any(|w| w.contains("ion_flux_proxy_rel_by_r missing for delta")));
    }
}
