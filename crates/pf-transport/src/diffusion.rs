//! Non-advective exchange: membrane diffusion and aerosol deposition.
//!
//! Every process is bounded so that no compartment ends with negative mass.

use pf_core::{CompartmentId, Real, SubstanceId};

use crate::compartment::QuantityKind;
use crate::error::{TransportError, TransportResult};
use crate::graph::CompartmentGraph;
use crate::manager::CompartmentManager;
use crate::substance::Substance;

fn check_dt(dt: Real) -> TransportResult<()> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(TransportError::InvalidValue {
            what: "diffusion time step",
            value: dt,
        });
    }
    Ok(())
}

/// Exchange a gas between a gas compartment and a liquid compartment across a
/// membrane, driven by the partial-pressure gradient.
///
/// Gas volume moved = gradient (mmHg) * diffusing capacity (mL/s/mmHg) *
/// relative diffusion coefficient * dt, converted to mass with the substance
/// density on the liquid side. Returns the gas volume (mL) moved from the gas
/// side into the liquid; negative values moved the other way.
pub fn partial_pressure_diffusion(
    manager: &mut CompartmentManager,
    gas: CompartmentId,
    liquid: CompartmentId,
    substance_id: SubstanceId,
    substance: &Substance,
    diffusing_capacity_ml_per_s_mmhg: Real,
    dt: Real,
) -> TransportResult<Real> {
    check_dt(dt)?;
    let (g, l) = manager.compartment_pair_mut(gas, liquid)?;
    if !g.has_valid_volume() || !l.has_valid_volume() {
        return Ok(0.0);
    }
    let gq = g.expect_kind(substance_id, QuantityKind::VolumeFraction)?;
    let lq = l.expect_kind(substance_id, QuantityKind::Concentration)?;
    let gradient = gq.partial_pressure_mmhg() - lq.partial_pressure_mmhg();
    let density = substance.density_ug_per_ml;

    let requested = gradient
        * diffusing_capacity_ml_per_s_mmhg
        * substance.relative_diffusion_coefficient
        * dt;
    let max_in = gq.extensive();
    let max_out = if density > 0.0 { lq.extensive() / density } else { 0.0 };
    let volume = requested.clamp(-max_out, max_in);
    if volume != requested {
        tracing::debug!(
            gas = %g.name,
            liquid = %l.name,
            requested,
            volume,
            "membrane exchange limited by available amount"
        );
    }
    if volume == 0.0 {
        return Ok(0.0);
    }

    if let Some(q) = g.quantity_mut(substance_id) {
        q.add_extensive(-volume);
    }
    if let Some(q) = l.quantity_mut(substance_id) {
        q.add_extensive(volume * density);
    }
    g.clamp_negative_amounts();
    l.clamp_negative_amounts();
    g.balance_by_extensive();
    l.balance_by_extensive();
    Ok(volume)
}

/// Passive diffusion of a dissolved substance between two liquid compartments.
///
/// Mass moved = permeability (mL/s) * (Ca - Cb) * dt, never past the point
/// where the two concentrations are equal. Returns the mass moved from `a` to `b`.
pub fn simple_diffusion(
    manager: &mut CompartmentManager,
    a: CompartmentId,
    b: CompartmentId,
    substance_id: SubstanceId,
    permeability_ml_per_s: Real,
    dt: Real,
) -> TransportResult<Real> {
    check_dt(dt)?;
    let (ca, cb) = manager.compartment_pair_mut(a, b)?;
    if !ca.has_valid_volume() || !cb.has_valid_volume() {
        return Ok(0.0);
    }
    let qa = ca.expect_kind(substance_id, QuantityKind::Concentration)?;
    let qb = cb.expect_kind(substance_id, QuantityKind::Concentration)?;

    let delta_c = qa.intensive() - qb.intensive();
    let (va, vb) = (ca.volume_ml(), cb.volume_ml());
    let equilibrium = delta_c * va * vb / (va + vb);
    let requested = permeability_ml_per_s * delta_c * dt;
    let mass = if requested.abs() > equilibrium.abs() {
        equilibrium
    } else {
        requested
    };
    if mass == 0.0 {
        return Ok(0.0);
    }

    if let Some(q) = ca.quantity_mut(substance_id) {
        q.add_extensive(-mass);
    }
    if let Some(q) = cb.quantity_mut(substance_id) {
        q.add_extensive(mass);
    }
    ca.clamp_negative_amounts();
    cb.clamp_negative_amounts();
    ca.balance_by_extensive();
    cb.balance_by_extensive();
    Ok(mass)
}

/// Deposit aerosol on the walls of a compartment.
///
/// Deposited mass = concentration * inflow * dt * deposition efficiency,
/// limited to the mass present. It leaves the suspended mass and accumulates
/// in the quantity's deposited total. Returns the mass deposited this step.
pub fn deposit_aerosol(
    graph: &CompartmentGraph,
    manager: &mut CompartmentManager,
    compartment: CompartmentId,
    substance_id: SubstanceId,
    substance: &Substance,
    dt: Real,
) -> TransportResult<Real> {
    check_dt(dt)?;
    let efficiency = substance.deposition_efficiency.unwrap_or(0.0);
    let inflow = graph.in_flow(manager, compartment);
    let c = manager.compartment_mut(compartment)?;
    if !c.has_valid_volume() {
        return Ok(0.0);
    }
    let q = c.expect_kind(substance_id, QuantityKind::Concentration)?;
    let requested = q.intensive() * inflow * dt * efficiency;
    let deposited = requested.clamp(0.0, q.extensive());
    if deposited < requested {
        tracing::warn!(
            compartment = %c.name,
            substance = %substance.name,
            requested,
            deposited,
            "deposition limited to suspended mass"
        );
    }
    if let Some(q) = c.quantity_mut(substance_id) {
        q.add_extensive(-deposited);
        q.add_deposited(deposited);
    }
    c.clamp_negative_amounts();
    c.balance_by_extensive();
    Ok(deposited)
}
