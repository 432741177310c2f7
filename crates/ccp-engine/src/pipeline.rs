// ─────────────────────────────────────────────────────────────────────
// SCPN CCP Core — Pipeline
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Single-request simulation pipeline.
//!
//! Stage order: material maps (once) → Dirichlet boundary → Poisson solve →
//! E-field → electron density → absorbed-power proxy → sheath diagnostics.
//! When baseline comparison is requested the boundary-dependent stages run
//! a second time at a +2% drive amplitude against the same material maps,
//! and every populated output gains a (perturbed − baseline) delta.

use ndarray::Array2;
use tracing::debug;

use ccp_core::boundary::build_dirichlet;
use ccp_core::drift_diffusion::solve_ne;
use ccp_core::materials::{
    build_epsilon_map, build_wall_loss_map, grid_summary, power_geometry_mask,
};
use ccp_core::poisson::{assemble_poisson_system, compute_e_magnitude, solve_phi};
use ccp_core::transport::{
    derive_powered_boundary_voltage, derive_transport_coefficients, TransportCoefficients,
};
use ccp_core::rf_drive::derive_dc_bias_offset;
use ccp_diagnostics::insights::{compute_delta_insights, compute_insights, compute_viz_curves};
use ccp_diagnostics::ion::{compute_delta_ion_proxy, compute_ion_proxy};
use ccp_diagnostics::power::compute_absorbed_power_density;
use ccp_diagnostics::sheath::{
    build_sheath, compute_delta_sheath_metrics, compute_sheath_metrics, summary_stats,
    SheathMethod,
};
use ccp_types::config::{GeometryGrid, OutputSelection, RegionKind, SimulationRequest};
use ccp_types::error::{CcpError, CcpResult};
use ccp_types::state::{
    ChamberGrid, CompareBlock, FieldSet, NeSolverMetadata, OutputGrid, SimulationResult,
};

/// Drive-amplitude perturbation applied for baseline comparison.
pub const BASELINE_PERTURB_FACTOR: f64 = 1.02;

/// Field products of one boundary-to-diagnostics pass.
struct SolvePass {
    phi: Array2<f64>,
    e_mag: Array2<f64>,
    /// Normalized density, zeroed outside the plasma region.
    ne: Option<Array2<f64>>,
    ne_metadata: Option<NeSolverMetadata>,
    power_density: Option<Array2<f64>>,
}

struct PassContext<'a> {
    request: &'a SimulationRequest,
    grid: &'a GeometryGrid,
    regions: &'a Array2<RegionKind>,
    chamber: &'a ChamberGrid,
    eps: &'a Array2<f64>,
    wall_loss: &'a Array2<f64>,
    geometry_mask: Option<&'a Array2<bool>>,
    transport: &'a TransportCoefficients,
    outputs: &'a OutputSelection,
    need_ne: bool,
    dc_offset: f64,
}

fn run_pass(ctx: &PassContext<'_>, powered_voltage: f64) -> CcpResult<SolvePass> {
    let nz = ctx.grid.nz;
    let nr = ctx.grid.nr;

    let dirichlet = build_dirichlet(ctx.request, ctx.grid, ctx.regions, powered_voltage, ctx.dc_offset);
    let (matrix, b) = assemble_poisson_system(ctx.eps, ctx.chamber.dr, ctx.chamber.dz, &dirichlet);
    let mut poisson_warnings = Vec::new();
    let phi = solve_phi(&matrix, &b, nz, nr, &mut poisson_warnings)?;
    let e_mag = compute_e_magnitude(&phi, ctx.chamber.dr, ctx.chamber.dz);

    let mut ne_masked: Option<Array2<f64>> = None;
    let mut ne_metadata: Option<NeSolverMetadata> = None;
    if ctx.need_ne {
        let solve = solve_ne(
            &phi,
            ctx.request,
            ctx.chamber,
            ctx.grid,
            ctx.regions,
            ctx.transport,
        );
        let masked = Array2::from_shape_fn((nz, nr), |(k, j)| {
            if ctx.regions[[k, j]] == RegionKind::Plasma {
                solve.ne[[k, j]]
            } else {
                0.0
            }
        });
        let mut metadata = solve.metadata;
        if !poisson_warnings.is_empty() {
            let mut merged = poisson_warnings.clone();
            merged.extend(metadata.warnings);
            metadata.warnings = merged;
        }
        ne_masked = Some(masked);
        ne_metadata = Some(metadata);
    }

    let power_density = if ctx.outputs.volume_loss_density {
        compute_absorbed_power_density(
            ne_masked.as_ref(),
            Some(&e_mag),
            ctx.wall_loss,
            ctx.eps,
            ctx.request,
            ctx.grid,
            ctx.geometry_mask,
        )
    } else {
        None
    };

    Ok(SolvePass {
        phi,
        e_mag,
        ne: ne_masked,
        ne_metadata,
        power_density,
    })
}

fn delta_grid(baseline: &Array2<f64>, perturbed: &Array2<f64>) -> Array2<f64> {
    perturbed - baseline
}

/// Run the full pipeline for one validated request.
///
/// Fatal errors are limited to structural precondition violations (missing
/// or inconsistent grid); numerical trouble degrades to documented
/// fallbacks with warnings inside the result.
pub fn run_simulation(request: &SimulationRequest) -> CcpResult<SimulationResult> {
    request.validate()?;
    let grid = request.geometry.grid.as_ref().ok_or(CcpError::MissingGrid)?;
    let regions = grid.region_map()?;
    let domain = &request.geometry.domain;
    let chamber = ChamberGrid::new(domain.nr, domain.nz, domain.r_max_mm, domain.z_max_mm);

    let outputs = request.outputs();
    let need_ne = outputs.ne || outputs.volume_loss_density;

    debug!(
        nz = domain.nz,
        nr = domain.nr,
        need_ne,
        baseline = request.baseline.enabled,
        "starting simulation pipeline"
    );

    let transport = derive_transport_coefficients(request);
    let eps = build_epsilon_map(grid, &regions, &request.material);
    let wall_loss = build_wall_loss_map(grid, &request.material);
    let geometry_mask = if outputs.volume_loss_density {
        power_geometry_mask(grid)
    } else {
        None
    };
    let powered_voltage = derive_powered_boundary_voltage(request);
    let dc_offset = derive_dc_bias_offset(request);

    let ctx = PassContext {
        request,
        grid,
        regions: &regions,
        chamber: &chamber,
        eps: &eps,
        wall_loss: &wall_loss,
        geometry_mask: geometry_mask.as_ref(),
        transport: &transport,
        outputs: &outputs,
        need_ne,
        dc_offset,
    };

    let pass = run_pass(&ctx, powered_voltage)?;

    let r_values = chamber.r.to_vec();
    let z_values = chamber.z.to_vec();

    let fields_e = outputs.efield.then(|| pass.e_mag.clone());
    let fields_ne = if outputs.ne { pass.ne.clone() } else { None };
    let fields = {
        let set = FieldSet {
            e_mag: fields_e.clone(),
            ne: fields_ne.clone(),
            volume_loss_density: pass.power_density.clone(),
        };
        (!set.is_empty()).then_some(set)
    };

    let sheath = build_sheath(
        &pass.phi,
        &pass.e_mag,
        &r_values,
        &z_values,
        SheathMethod::default(),
    );

    let mut sheath_metrics = None;
    let mut insights = None;
    let mut ion_proxy = None;
    if outputs.sheath {
        let metrics = compute_sheath_metrics(grid, &regions, &sheath, &z_values);
        if fields_e.is_some() || fields_ne.is_some() {
            insights = Some(compute_insights(
                fields_e.as_ref(),
                fields_ne.as_ref(),
                &metrics,
                &z_values,
                &r_values,
            ));
        }
        ion_proxy = Some(compute_ion_proxy(
            &request.gas,
            &pass.phi,
            &metrics,
            pass.ne.as_ref(),
            &z_values,
            transport.te_ev,
        ));
        sheath_metrics = Some(metrics);
    }

    let mut perturbed_metrics = None;
    let mut compare = None;
    let run_compare = request.baseline.enabled
        && (outputs.efield || outputs.ne || outputs.volume_loss_density || outputs.sheath);
    if run_compare {
        let perturbed_voltage = if powered_voltage > 0.0 {
            powered_voltage * BASELINE_PERTURB_FACTOR
        } else {
            0.0
        };
        debug!(perturbed_voltage, "running perturbed baseline pass");
        let pass2 = run_pass(&ctx, perturbed_voltage)?;

        let mut delta_sheath_metrics = None;
        let mut delta_insights = None;
        let mut delta_ion_proxy = None;

        if let Some(metrics) = &sheath_metrics {
            let sheath2 = build_sheath(
                &pass2.phi,
                &pass2.e_mag,
                &r_values,
                &z_values,
                SheathMethod::default(),
            );
            let metrics2 = compute_sheath_metrics(grid, &regions, &sheath2, &z_values);
            delta_sheath_metrics = Some(compute_delta_sheath_metrics(metrics, &metrics2));

            if fields_e.is_some() || fields_ne.is_some() {
                let fields2_e = outputs.efield.then(|| pass2.e_mag.clone());
                let fields2_ne = if outputs.ne { pass2.ne.clone() } else { None };
                let insights2 = compute_insights(
                    fields2_e.as_ref(),
                    fields2_ne.as_ref(),
                    &metrics2,
                    &z_values,
                    &r_values,
                );
                if let Some(baseline_insights) = &insights {
                    delta_insights = Some(compute_delta_insights(baseline_insights, &insights2));
                }
            }

            let ion_proxy2 = compute_ion_proxy(
                &request.gas,
                &pass2.phi,
                &metrics2,
                pass2.ne.as_ref(),
                &z_values,
                transport.te_ev,
            );
            if let Some(baseline_ion) = &ion_proxy {
                delta_ion_proxy = Some(compute_delta_ion_proxy(baseline_ion, &ion_proxy2));
            }
            perturbed_metrics = Some(metrics2);
        }

        let delta_e = outputs
            .efield
            .then(|| delta_grid(&pass.e_mag, &pass2.e_mag));
        let delta_ne = match (&fields_ne, &pass2.ne) {
            (Some(base), Some(pert)) if outputs.ne => Some(delta_grid(base, pert)),
            _ => None,
        };
        let delta_power = match (&pass.power_density, &pass2.power_density) {
            (Some(base), Some(pert)) => Some(delta_grid(base, pert)),
            _ => None,
        };

        let delta_fields = {
            let set = FieldSet {
                e_mag: delta_e,
                ne: delta_ne,
                volume_loss_density: delta_power,
            };
            (!set.is_empty()).then_some(set)
        };

        let delta_sheath_thickness_mm = delta_sheath_metrics
            .as_ref()
            .and_then(|metrics| metrics.thickness_mm_by_r.as_ref())
            .map(|thickness| summary_stats(thickness).0);

        compare = Some(CompareBlock {
            enabled: true,
            delta_fields,
            delta_sheath_thickness_mm,
            delta_sheath_metrics,
            delta_insights,
            delta_ion_proxy,
        });
    }

    let viz = sheath_metrics
        .as_ref()
        .map(|metrics| compute_viz_curves(&r_values, metrics, perturbed_metrics.as_ref()));

    Ok(SimulationResult {
        grid: OutputGrid {
            r_mm: r_values,
            z_mm: z_values,
        },
        grid_summary: Some(grid_summary(grid, &regions)),
        fields,
        sheath,
        sheath_metrics,
        insights,
        viz,
        ion_proxy,
        ne_solver: pass.ne_metadata,
        compare,
    })
}
