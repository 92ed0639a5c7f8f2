//! Flux-driven advection of substances between compartments.

use std::collections::HashMap;

use pf_core::{CompartmentId, Real, SubstanceId};

use crate::compartment::SubstanceQuantity;
use crate::error::{TransportError, TransportResult};
use crate::graph::CompartmentGraph;
use crate::manager::CompartmentManager;

/// Summary of one transport step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportReport {
    /// Links that moved substance.
    pub links_moved: usize,
    /// Links skipped because an end had no valid volume or the flux was not finite.
    pub links_skipped: usize,
    /// Substance sources whose outflow was scaled down to what they held.
    pub clamped: usize,
}

struct Transfer {
    from: CompartmentId,
    to: CompartmentId,
    template: SubstanceQuantity,
    amount: Real,
}

/// Move every tracked substance along the graph's link fluxes for one step.
///
/// All amounts are computed from a snapshot taken before anything moves, so the
/// result does not depend on link order. Each link carries
/// `|flux| * dt * upstream intensive` of every substance in its upstream
/// compartment; a compartment never sends out more than it holds.
pub fn transport(
    graph: &CompartmentGraph,
    manager: &mut CompartmentManager,
    dt: Real,
) -> TransportResult<TransportReport> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(TransportError::InvalidValue {
            what: "transport time step",
            value: dt,
        });
    }

    let mut report = TransportReport::default();
    let mut transfers = Vec::new();

    for &lid in graph.links() {
        let link = manager.link(lid)?;
        let flux = link.flux_ml_per_s();
        let (up, down) = link.upstream_downstream();
        let valid = manager.compartment(up)?.has_valid_volume()
            && manager.compartment(down)?.has_valid_volume();
        if !valid || !flux.is_finite() {
            tracing::debug!(link = %link.name, flux, "link skipped");
            report.links_skipped += 1;
            continue;
        }
        if flux == 0.0 {
            continue;
        }
        let carried = flux.abs() * dt;
        for q in manager.compartment(up)?.substances() {
            let amount = carried * q.intensive();
            if amount > 0.0 {
                transfers.push(Transfer {
                    from: up,
                    to: down,
                    template: q.clone(),
                    amount,
                });
            }
        }
        report.links_moved += 1;
    }

    // Scale each source's outflow of a substance down to what it holds.
    let mut outgoing: HashMap<(CompartmentId, SubstanceId), Real> = HashMap::new();
    for t in &transfers {
        *outgoing.entry((t.from, t.template.substance())).or_default() += t.amount;
    }
    let mut scale: HashMap<(CompartmentId, SubstanceId), Real> = HashMap::new();
    for (&(cid, sid), &total) in &outgoing {
        let available = manager
            .compartment(cid)?
            .quantity(sid)
            .map_or(0.0, |q| q.extensive());
        if total > available {
            let c = manager.compartment(cid)?;
            tracing::warn!(
                compartment = %c.name,
                substance = sid.index(),
                requested = total,
                available,
                "advection exceeds available amount; scaled"
            );
            scale.insert((cid, sid), if total > 0.0 { available / total } else { 0.0 });
            report.clamped += 1;
        }
    }

    let mut touched: Vec<CompartmentId> = Vec::new();
    for t in transfers {
        let sid = t.template.substance();
        let amount = t.amount * scale.get(&(t.from, sid)).copied().unwrap_or(1.0);
        let (from, to) = manager.compartment_pair_mut(t.from, t.to)?;
        if let Some(q) = from.quantity_mut(sid) {
            q.add_extensive(-amount);
        }
        to.ensure_like(&t.template);
        if let Some(q) = to.quantity_mut(sid) {
            q.add_extensive(amount);
        }
        for id in [t.from, t.to] {
            if !touched.contains(&id) {
                touched.push(id);
            }
        }
    }

    for id in touched {
        let c = manager.compartment_mut(id)?;
        // Scaled transfers can leave round-off below zero.
        c.clamp_negative_amounts();
        c.balance_by_extensive();
    }

    tracing::trace!(graph = %graph.name, ?report, "transport step");
    Ok(report)
}
