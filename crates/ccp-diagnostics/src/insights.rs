// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Insights
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! On-sheath insight curves and plot-ready viz curves.
//!
//! Field samples along the sheath use a nearest-z-index lookup with a
//! 3-point axial average, which smooths the staircase of the discrete
//! boundary without a full interpolation pass.

use ndarray::Array2;

use ccp_types::error::{CcpError, CcpResult};
use ccp_types::state::{InsightSummary, SheathInsights, SheathMetrics, VizCurves};

use crate::sheath::{summary_stats, summary_stats_optional};

/// Index of the grid height nearest to `target` (z_values ascending).
fn nearest_z_index(z_values: &[f64], target: f64) -> usize {
    let nz = z_values.len();
    let pos = z_values.partition_point(|&z| z < target);
    if pos == 0 {
        return 0;
    }
    if pos >= nz {
        return nz - 1;
    }
    if (target - z_values[pos - 1]).abs() <= (z_values[pos] - target).abs() {
        pos - 1
    } else {
        pos
    }
}

/// Sample a field at the given per-column heights: nearest z index plus a
/// 3-point average over the axial neighbours.
pub fn sample_field_by_z(
    field: &Array2<f64>,
    z_by_r: &[f64],
    z_values: &[f64],
) -> CcpResult<Vec<f64>> {
    let (nz, nr) = field.dim();
    if z_values.len() != nz {
        return Err(CcpError::ConfigError(
            "z_values length must match field nz".into(),
        ));
    }
    if z_by_r.len() != nr {
        return Err(CcpError::ConfigError(
            "z_by_r length must match field nr".into(),
        ));
    }

    let samples = (0..nr)
        .map(|j| {
            let k = nearest_z_index(z_values, z_by_r[j]);
            let mut total = field[[k, j]];
            let mut count = 1.0;
            if k > 0 {
                total += field[[k - 1, j]];
                count += 1.0;
            }
            if k + 1 < nz {
                total += field[[k + 1, j]];
                count += 1.0;
            }
            total / count
        })
        .collect();
    Ok(samples)
}

/// Sample a field along the sheath boundary.
pub fn sample_field_on_sheath(
    field: &Array2<f64>,
    sheath_z_by_r: &[f64],
    z_values: &[f64],
) -> CcpResult<Vec<f64>> {
    sample_field_by_z(field, sheath_z_by_r, z_values)
}

/// Build the on-sheath insight curves from the selected fields.
pub fn compute_insights(
    e_mag: Option<&Array2<f64>>,
    ne: Option<&Array2<f64>>,
    sheath_metrics: &SheathMetrics,
    z_values: &[f64],
    r_values: &[f64],
) -> SheathInsights {
    let mut warnings = sheath_metrics.warnings.clone();
    let mut e_on_sheath: Option<Vec<f64>> = None;
    let mut ne_on_sheath: Option<Vec<f64>> = None;

    match e_mag {
        None => warnings.push("E_mag missing; E_on_sheath_by_r omitted".to_string()),
        Some(field) => {
            match sample_field_on_sheath(field, &sheath_metrics.z_mm_by_r, z_values) {
                Ok(samples) => e_on_sheath = Some(samples),
                Err(err) => warnings.push(format!("failed to sample E_mag on sheath: {err}")),
            }
        }
    }

    match ne {
        None => warnings.push("ne field missing; ne_on_sheath_by_r omitted".to_string()),
        Some(field) => match sample_field_on_sheath(field, &sheath_metrics.z_mm_by_r, z_values) {
            Ok(samples) => ne_on_sheath = Some(samples),
            Err(err) => warnings.push(format!("failed to sample ne on sheath: {err}")),
        },
    }

    let thickness = sheath_metrics.thickness_mm_by_r.clone();

    let (e_mean, e_min, e_max) = summary_stats_optional(e_on_sheath.as_ref());
    let (ne_mean, ne_min, ne_max) = summary_stats_optional(ne_on_sheath.as_ref());
    let (t_mean, t_min, t_max) = summary_stats_optional(thickness.as_ref());

    let summary = InsightSummary {
        e_on_sheath_mean: e_mean,
        e_on_sheath_min: e_min,
        e_on_sheath_max: e_max,
        ne_on_sheath_mean: ne_mean,
        ne_on_sheath_min: ne_min,
        ne_on_sheath_max: ne_max,
        thickness_mean_mm: t_mean,
        thickness_min_mm: t_min,
        thickness_max_mm: t_max,
    };

    SheathInsights {
        r_mm: r_values.to_vec(),
        sheath_z_mm_by_r: sheath_metrics.z_mm_by_r.clone(),
        sheath_thickness_mm_by_r: thickness,
        e_on_sheath_by_r: e_on_sheath,
        ne_on_sheath_by_r: ne_on_sheath,
        summary,
        warnings,
    }
}

fn delta_series(
    baseline: Option<&Vec<f64>>,
    perturbed: Option<&Vec<f64>>,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<Vec<f64>> {
    let (Some(base), Some(pert)) = (baseline, perturbed) else {
        warnings.push(format!("{label} missing for delta"));
        return None;
    };
    if base.len() != pert.len() {
        warnings.push(format!("{label} length mismatch for delta"));
        return None;
    }
    Some(base.iter().zip(pert).map(|(b, p)| p - b).collect())
}

fn delta_value(baseline: Option<f64>, perturbed: Option<f64>) -> Option<f64> {
    match (baseline, perturbed) {
        (Some(base), Some(pert)) if base.is_finite() && pert.is_finite() => Some(pert - base),
        _ => None,
    }
}

/// Delta insights (perturbed − baseline) with warning provenance.
pub fn compute_delta_insights(
    baseline: &SheathInsights,
    perturbed: &SheathInsights,
) -> SheathInsights {
    let mut warnings: Vec<String> = baseline
        .warnings
        .iter()
        .map(|msg| format!("baseline: {msg}"))
        .chain(perturbed.warnings.iter().map(|msg| format!("perturbed: {msg}")))
        .collect();

    let e_delta = delta_series(
        baseline.e_on_sheath_by_r.as_ref(),
        perturbed.e_on_sheath_by_r.as_ref(),
        "E_on_sheath_by_r",
        &mut warnings,
    );
    let ne_delta = delta_series(
        baseline.ne_on_sheath_by_r.as_ref(),
        perturbed.ne_on_sheath_by_r.as_ref(),
        "ne_on_sheath_by_r",
        &mut warnings,
    );
    let thickness_delta = delta_series(
        baseline.sheath_thickness_mm_by_r.as_ref(),
        perturbed.sheath_thickness_mm_by_r.as_ref(),
        "sheath_thickness_mm_by_r",
        &mut warnings,
    );
    let sheath_z_delta = delta_series(
        Some(&baseline.sheath_z_mm_by_r),
        Some(&perturbed.sheath_z_mm_by_r),
        "sheath_z_mm_by_r",
        &mut warnings,
    );

    let summary = InsightSummary {
        e_on_sheath_mean: delta_value(
            baseline.summary.e_on_sheath_mean,
            perturbed.summary.e_on_sheath_mean,
        ),
        e_on_sheath_min: delta_value(
            baseline.summary.e_on_sheath_min,
            perturbed.summary.e_on_sheath_min,
        ),
        e_on_sheath_max: delta_value(
            baseline.summary.e_on_sheath_max,
            perturbed.summary.e_on_sheath_max,
        ),
        ne_on_sheath_mean: delta_value(
            baseline.summary.ne_on_sheath_mean,
            perturbed.summary.ne_on_sheath_mean,
        ),
        ne_on_sheath_min: delta_value(
            baseline.summary.ne_on_sheath_min,
            perturbed.summary.ne_on_sheath_min,
        ),
        ne_on_sheath_max: delta_value(
            baseline.summary.ne_on_sheath_max,
            perturbed.summary.ne_on_sheath_max,
        ),
        thickness_mean_mm: delta_value(
            baseline.summary.thickness_mean_mm,
            perturbed.summary.thickness_mean_mm,
        ),
        thickness_min_mm: delta_value(
            baseline.summary.thickness_min_mm,
            perturbed.summary.thickness_min_mm,
        ),
        thickness_max_mm: delta_value(
            baseline.summary.thickness_max_mm,
            perturbed.summary.thickness_max_mm,
        ),
    };

    if baseline.r_mm.len() != perturbed.r_mm.len() {
        warnings.push("r_mm length mismatch; using baseline r_mm".to_string());
    }

    SheathInsights {
        r_mm: baseline.r_mm.clone(),
        sheath_z_mm_by_r: sheath_z_delta.unwrap_or_default(),
        sheath_thickness_mm_by_r: thickness_delta,
        e_on_sheath_by_r: e_delta,
        ne_on_sheath_by_r: ne_delta,
        summary,
        warnings,
    }
}

/// Plot-ready per-column curves, with deltas when a perturbed solve ran.
pub fn compute_viz_curves(
    r_values: &[f64],
    sheath_metrics: &SheathMetrics,
    perturbed_metrics: Option<&SheathMetrics>,
) -> VizCurves {
    let mut warnings = sheath_metrics.warnings.clone();
    let thickness = sheath_metrics.thickness_mm_by_r.clone();
    if thickness.is_none() {
        warnings.push("sheath thickness missing; sheath_thickness_mm_by_r unavailable".to_string());
    }

    let mut delta_z = None;
    let mut delta_thickness = None;
    if let Some(perturbed) = perturbed_metrics {
        delta_z = Some(
            sheath_metrics
                .z_mm_by_r
                .iter()
                .zip(&perturbed.z_mm_by_r)
                .map(|(base, pert)| pert - base)
                .collect::<Vec<f64>>(),
        );
        match (&thickness, &perturbed.thickness_mm_by_r) {
            (Some(base), Some(pert)) => {
                delta_thickness =
                    Some(base.iter().zip(pert).map(|(b, p)| p - b).collect::<Vec<f64>>());
            }
            _ => {
                warnings.push("sheath thickness missing; delta thickness unavailable".to_string());
            }
        }
    }

    VizCurves {
        r_mm: r_values.to_vec(),
        sheath_z_mm_by_r: sheath_metrics.z_mm_by_r.clone(),
        sheath_thickness_mm_by_r: thickness,
        delta_sheath_z_mm_by_r: delta_z,
        delta_sheath_thickness_mm_by_r: delta_thickness,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(z_by_r: Vec<f64>, thickness: Option<Vec<f64>>) -> SheathMetrics {
        let (z_mean, z_min, z_max) = summary_stats(&z_by_r);
        SheathMetrics {
            z_mm_by_r: z_by_r,
            electrode_z_mm_by_r: None,
            thickness_mm_by_r: thickness,
            thickness_mean_mm: None,
            thickness_min_mm: None,
            thickness_max_mm: None,
            z_mean_mm: z_mean,
            z_min_mm: z_min,
            z_max_mm: z_max,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_nearest_index_rounds_to_closest() {
        let z = vec![0.0, 5.0, 10.0, 15.0];
        assert_eq!(nearest_z_index(&z, -2.0), 0);
        assert_eq!(nearest_z_index(&z, 2.4), 0);
        assert_eq!(nearest_z_index(&z, 2.6), 1);
        assert_eq!(nearest_z_index(&z, 14.0), 3);
        assert_eq!(nearest_z_index(&z, 99.0), 3);
    }

    #[test]
    fn test_sample_three_point_average() {
        // Field varies only in z: 0, 10, 20, 30 per row.
        let field = Array2::from_shape_fn((4, 2), |(k, _)| 10.0 * k as f64);
        let z = vec![0.0, 1.0, 2.0, 3.0];
        let samples = sample_field_on_sheath(&field, &[1.0, 2.0], &z).unwrap();
        // k = 1: (0 + 10 + 20)/3; k = 2: (10 + 20 + 30)/3
        assert!((samples[0] - 10.0).abs() < 1e-12);
        assert!((samples[1] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_rejects_shape_mismatch() {
        let field = Array2::zeros((3, 2));
        let z = vec![0.0, 1.0];
        assert!(sample_field_on_sheath(&field, &[0.0, 0.0], &z).is_err());
        let z = vec![0.0, 1.0, 2.0];
        assert!(sample_field_on_sheath(&field, &[0.0], &z).is_err());
    }

    #[test]
    fn test_insights_warn_on_missing_fields() {
        let m = metrics(vec![1.0, 2.0], Some(vec![1.0, 1.0]));
        let insights = compute_insights(None, None, &m, &[0.0, 1.0, 2.0], &[0.0, 10.0]);
        assert!(insights.e_on_sheath_by_r.is_none());
        assert!(insights.ne_on_sheath_by_r.is_none());
        assert!(insights.warnings.iter().any(|w| w.contains("E_mag missing")));
        assert!(insights.warnings.iter().any(|w| w.contains("ne field missing")));
        assert!(insights.summary.thickness_mean_mm.is_some());
    }

    #[test]
    fn test_delta_insights_subtracts() {
        let field_a = Array2::from_elem((3, 2), 1.0);
        let field_b = Array2::from_elem((3, 2), 1.5);
        let z = vec![0.0, 1.0, 2.0];
        let r = vec![0.0, 10.0];
        let m_a = metrics(vec![1.0, 1.0], Some(vec![1.0, 1.0]));
        let m_b = metrics(vec![2.0, 2.0], Some(vec![2.0, 2.0]));
        let insights_a = compute_insights(Some(&field_a), None, &m_a, &z, &r);
        let insights_b = compute_insights(Some(&field_b), None, &m_b, &z, &r);
        let delta = compute_delta_insights(&insights_a, &insights_b);

        let e_delta = delta.e_on_sheath_by_r.unwrap();
        assert!(e_delta.iter().all(|d| (d - 0.5).abs() < 1e-12));
        assert!(delta.ne_on_sheath_by_r.is_none());
        assert!(delta
            .warnings
            .iter()
            .any(|w| w.contains("ne_on_sheath_by_r missing for delta")));
        assert!(delta.sheath_z_mm_by_r.iter().all(|d| (d - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_viz_curves_with_and_without_deltas() {
        let m_a = metrics(vec![1.0, 2.0], Some(vec![0.5, 0.5]));
        let m_b = metrics(vec![1.5, 2.5], Some(vec![0.75, 0.25]));
        let r = vec![0.0, 10.0];

        let solo = compute_viz_curves(&r, &m_a, None);
        assert!(solo.delta_sheath_z_mm_by_r.is_none());
        assert!(solo.sheath_thickness_mm_by_r.is_some());

        let paired = compute_viz_curves(&r, &m_a, Some(&m_b));
        let dz = paired.delta_sheath_z_mm_by_r.unwrap();
        assert!((dz[0] - 0.5).abs() < 1e-12);
        let dt = paired.delta_sheath_thickness_mm_by_r.unwrap();
        assert!((dt[1] + 0.25).abs() < 1e-12);
    }
}
