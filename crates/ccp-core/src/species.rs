// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Species
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Empirical per-species scaling factors, relative to argon = 1.0.
//!
//! Pure lookup data for the transport closures. Species names accept both
//! formula and spelled-out forms ("o2" / "oxygen"); unknown species fall
//! back to the caller-supplied default.

use ccp_types::config::Gas;

/// Electron-temperature factor.
pub fn te_factor(species: &str) -> Option<f64> {
    match species {
        "ar" | "argon" => Some(1.0),
        "o2" | "oxygen" => Some(0.86),
        "n2" | "nitrogen" => Some(0.93),
        "he" | "helium" => Some(1.18),
        "h2" | "hydrogen" => Some(1.12),
        "sih4" => Some(0.72),
        "n2o" => Some(0.82),
        "nh3" => Some(0.8),
        _ => None,
    }
}

/// Electron-mobility factor.
pub fn mobility_factor(species: &str) -> Option<f64> {
    match species {
        "ar" | "argon" => Some(1.0),
        "o2" | "oxygen" => Some(0.74),
        "n2" | "nitrogen" => Some(0.82),
        "he" | "helium" => Some(1.32),
        "h2" | "hydrogen" => Some(1.24),
        "sih4" => Some(0.62),
        "n2o" => Some(0.68),
        "nh3" => Some(0.7),
        _ => None,
    }
}

/// Ionization-efficiency factor.
pub fn ionization_factor(species: &str) -> Option<f64> {
    match species {
        "ar" | "argon" => Some(1.0),
        "o2" | "oxygen" => Some(0.72),
        "n2" | "nitrogen" => Some(0.8),
        "he" | "helium" => Some(1.14),
        "h2" | "hydrogen" => Some(1.08),
        "sih4" => Some(0.68),
        "n2o" => Some(0.74),
        "nh3" => Some(0.76),
        _ => None,
    }
}

/// Electron-attachment factor (electronegative gases run high).
pub fn attachment_factor(species: &str) -> Option<f64> {
    match species {
        "ar" | "argon" => Some(0.22),
        "o2" | "oxygen" => Some(1.25),
        "n2" | "nitrogen" => Some(0.58),
        "he" | "helium" => Some(0.2),
        "h2" | "hydrogen" => Some(0.32),
        "sih4" => Some(0.95),
        "n2o" => Some(1.08),
        "nh3" => Some(0.9),
        _ => None,
    }
}

/// Ion mass [amu].
pub fn ion_mass_amu(species: &str) -> Option<f64> {
    match species {
        "ar" | "argon" => Some(40.0),
        "o2" | "oxygen" => Some(32.0),
        "n2" | "nitrogen" => Some(28.0),
        "he" | "helium" => Some(4.0),
        "h2" | "hydrogen" => Some(2.0),
        "sih4" => Some(32.1),
        "n2o" => Some(44.0),
        "nh3" => Some(17.0),
        _ => None,
    }
}

/// Canonical species key: trimmed, lowercased.
pub fn normalize_species(species: &str) -> String {
    species.trim().to_ascii_lowercase()
}

/// Fraction-weighted mean of a species factor over the gas mixture.
/// Unknown species contribute the fallback value at their fraction weight;
/// an empty or zero-weight mixture returns the fallback outright.
pub fn weighted_factor(gas: &Gas, table: fn(&str) -> Option<f64>, fallback: f64) -> f64 {
    if gas.mixture.is_empty() {
        return fallback;
    }
    let mut value = 0.0;
    let mut weight_total = 0.0;
    for component in &gas.mixture {
        let fraction = component.fraction.max(0.0);
        let factor = table(&normalize_species(&component.species)).unwrap_or(fallback);
        value += factor * fraction;
        weight_total += fraction;
    }
    if weight_total <= 0.0 {
        return fallback;
    }
    value / weight_total
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

    #[test]
    fn test_argon_is_reference() {
        assert_eq!(te_factor("argon"), Some(1.0));
        assert_eq!(mobility_factor("ar"), Some(1.0));
        assert_eq!(ionization_factor("ar"), Some(1.0));
        assert_eq!(ion_mass_amu("argon"), Some(40.0));
    }

    #[test]
    fn test_normalize_species() {
        assert_eq!(normalize_species("  Ar "), "ar");
        assert_eq!(normalize_species("O2"), "o2");
    }

    #[test]
    fn test_weighted_factor_mixes_fractions() {
        let mixture = gas(&[("Ar", 0.5), ("O2", 0.5)]);
        let value = weighted_factor(&mixture, ionization_factor, 1.0);
        assert!((value - 0.86).abs() < 1e-12, "0.5*1.0 + 0.5*0.72 = 0.86");
    }

    #[test]
    fn test_weighted_factor_unknown_species_uses_fallback() {
        let mixture = gas(&[("xe", 1.0)]);
        assert!((weighted_factor(&mixture, te_factor, 0.9) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_factor_empty_mixture() {
        let mixture = gas(&[]);
        assert!((weighted_factor(&mixture, attachment_factor, 0.45) - 0.45).abs() < 1e-12);
    }
}
