//! Compartments and the substance quantities they hold.
//!
//! Every mutator leaves the compartment balanced: extensive and intensive
//! values agree with the compartment volume, and partial pressures are current.

use pf_core::{CompartmentId, NodeId, Real, SubstanceId, Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};
use crate::substance::{Substance, SubstanceState};

/// Bulk phase of a compartment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Gas,
    Liquid,
}

/// How a substance quantity is tracked.
///
/// - `VolumeFraction`: extensive is substance volume (mL), intensive is volume fraction
/// - `Concentration`: extensive is mass (ug), intensive is concentration (ug/mL)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    VolumeFraction,
    Concentration,
}

impl QuantityKind {
    /// Gases in a gas compartment are fractions; everything else is a concentration.
    pub fn for_pair(phase: Phase, state: SubstanceState) -> Self {
        match (phase, state) {
            (Phase::Gas, SubstanceState::Gas) => QuantityKind::VolumeFraction,
            _ => QuantityKind::Concentration,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubstanceQuantity {
    substance: SubstanceId,
    name: String,
    kind: QuantityKind,
    solubility_ug_per_ml_mmhg: Real,
    extensive: Real,
    intensive: Real,
    partial_pressure_mmhg: Real,
    deposited_ug: Real,
}

impl SubstanceQuantity {
    pub fn substance(&self) -> SubstanceId {
        self.substance
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> QuantityKind {
        self.kind
    }

    /// Mass (ug) or substance volume (mL) depending on kind.
    pub fn extensive(&self) -> Real {
        self.extensive
    }

    /// Concentration (ug/mL) or volume fraction depending on kind.
    pub fn intensive(&self) -> Real {
        self.intensive
    }

    pub fn mass_ug(&self) -> Option<Real> {
        (self.kind == QuantityKind::Concentration).then_some(self.extensive)
    }

    pub fn concentration_ug_per_ml(&self) -> Option<Real> {
        (self.kind == QuantityKind::Concentration).then_some(self.intensive)
    }

    pub fn volume_ml(&self) -> Option<Real> {
        (self.kind == QuantityKind::VolumeFraction).then_some(self.extensive)
    }

    pub fn volume_fraction(&self) -> Option<Real> {
        (self.kind == QuantityKind::VolumeFraction).then_some(self.intensive)
    }

    pub fn partial_pressure_mmhg(&self) -> Real {
        self.partial_pressure_mmhg
    }

    /// Cumulative aerosol mass deposited on the compartment walls.
    pub fn deposited_ug(&self) -> Real {
        self.deposited_ug
    }

    pub(crate) fn add_extensive(&mut self, delta: Real) {
        self.extensive += delta;
    }

    pub(crate) fn add_deposited(&mut self, delta: Real) {
        self.deposited_ug += delta;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: CompartmentId,
    pub name: String,
    pub phase: Phase,
    /// Circuit nodes whose stored quantities make up this compartment's volume.
    pub nodes: Vec<NodeId>,
    volume_ml: Real,
    pressure_mmhg: Real,
    substances: Vec<SubstanceQuantity>,
}

impl Compartment {
    pub fn new(id: CompartmentId, name: impl Into<String>, phase: Phase) -> Self {
        Self {
            id,
            name: name.into(),
            phase,
            nodes: Vec::new(),
            volume_ml: 0.0,
            pressure_mmhg: 0.0,
            substances: Vec::new(),
        }
    }

    pub fn volume_ml(&self) -> Real {
        self.volume_ml
    }

    pub fn pressure_mmhg(&self) -> Real {
        self.pressure_mmhg
    }

    /// Whether this compartment can take part in transport.
    pub fn has_valid_volume(&self) -> bool {
        self.volume_ml.is_finite() && self.volume_ml > 0.0
    }

    pub fn substances(&self) -> &[SubstanceQuantity] {
        &self.substances
    }

    pub fn quantity(&self, substance: SubstanceId) -> Option<&SubstanceQuantity> {
        self.substances.iter().find(|q| q.substance == substance)
    }

    pub(crate) fn quantity_mut(&mut self, substance: SubstanceId) -> Option<&mut SubstanceQuantity> {
        self.substances.iter_mut().find(|q| q.substance == substance)
    }

    pub(crate) fn expect_kind(&self, substance: SubstanceId, kind: QuantityKind) -> TransportResult<&SubstanceQuantity> {
        let q = self.quantity(substance).ok_or_else(|| TransportError::MissingQuantity {
            compartment: self.name.clone(),
            substance: substance.to_string(),
        })?;
        if q.kind != kind {
            return Err(TransportError::WrongQuantityKind {
                compartment: self.name.clone(),
                substance: q.name.clone(),
                expected: kind,
                actual: q.kind,
            });
        }
        Ok(q)
    }

    fn require(&mut self, substance: SubstanceId, kind: QuantityKind) -> TransportResult<&mut SubstanceQuantity> {
        self.expect_kind(substance, kind)?;
        self.quantity_mut(substance)
            .ok_or(TransportError::InvalidValue {
                what: "substance slot",
                value: substance.index() as f64,
            })
    }

    /// Start tracking a substance at zero amount. Tracking twice is a no-op.
    pub fn add_substance(&mut self, id: SubstanceId, substance: &Substance) -> &SubstanceQuantity {
        let slot = match self.substances.iter().position(|q| q.substance == id) {
            Some(slot) => slot,
            None => {
                self.substances.push(SubstanceQuantity {
                    substance: id,
                    name: substance.name.clone(),
                    kind: QuantityKind::for_pair(self.phase, substance.state),
                    solubility_ug_per_ml_mmhg: substance.solubility_ug_per_ml_mmhg,
                    extensive: 0.0,
                    intensive: 0.0,
                    partial_pressure_mmhg: 0.0,
                    deposited_ug: 0.0,
                });
                self.substances.len() - 1
            }
        };
        &self.substances[slot]
    }

    /// Ensure a quantity exists with the same tracking as `template` (used when
    /// transport carries a substance into a compartment that lacks it).
    pub(crate) fn ensure_like(&mut self, template: &SubstanceQuantity) {
        if self.quantity(template.substance).is_none() {
            self.substances.push(SubstanceQuantity {
                extensive: 0.0,
                intensive: 0.0,
                partial_pressure_mmhg: 0.0,
                deposited_ug: 0.0,
                ..template.clone()
            });
        }
    }

    /// Set the compartment volume. Negative volumes are clamped to zero.
    ///
    /// Masses are kept (concentrations follow); gas fractions are kept (gas
    /// volumes follow).
    pub fn set_volume(&mut self, volume_ml: Real) -> TransportResult<()> {
        let volume_ml = non_negative(volume_ml, "compartment volume", &self.name)?;
        self.volume_ml = volume_ml;
        self.normalize_fractions();
        for q in &mut self.substances {
            match q.kind {
                QuantityKind::VolumeFraction => q.extensive = q.intensive * volume_ml,
                QuantityKind::Concentration if volume_ml > 0.0 => {
                    q.intensive = q.extensive / volume_ml
                }
                QuantityKind::Concentration => q.intensive = 0.0,
            }
        }
        self.update_partial_pressures();
        Ok(())
    }

    pub fn set_pressure(&mut self, pressure_mmhg: Real) -> TransportResult<()> {
        if !pressure_mmhg.is_finite() {
            return Err(TransportError::InvalidValue {
                what: "compartment pressure",
                value: pressure_mmhg,
            });
        }
        self.pressure_mmhg = pressure_mmhg;
        self.update_partial_pressures();
        Ok(())
    }

    pub fn set_mass(&mut self, substance: SubstanceId, mass_ug: Real) -> TransportResult<()> {
        let name = self.name.clone();
        let mass_ug = non_negative(mass_ug, "substance mass", &name)?;
        self.require(substance, QuantityKind::Concentration)?.extensive = mass_ug;
        self.balance_by_extensive();
        Ok(())
    }

    /// Add (or with a negative delta, remove) mass. Removing more than is
    /// present removes everything and logs a warning. Returns the applied delta.
    pub fn increment_mass(&mut self, substance: SubstanceId, delta_ug: Real) -> TransportResult<Real> {
        if !delta_ug.is_finite() {
            return Err(TransportError::InvalidValue {
                what: "mass increment",
                value: delta_ug,
            });
        }
        let name = self.name.clone();
        let q = self.require(substance, QuantityKind::Concentration)?;
        let applied = if q.extensive + delta_ug < 0.0 {
            tracing::warn!(
                compartment = %name,
                substance = %q.name,
                requested = delta_ug,
                available = q.extensive,
                "mass removal exceeds available mass; clamped"
            );
            -q.extensive
        } else {
            delta_ug
        };
        q.extensive += applied;
        self.balance_by_extensive();
        Ok(applied)
    }

    pub fn set_concentration(&mut self, substance: SubstanceId, ug_per_ml: Real) -> TransportResult<()> {
        let name = self.name.clone();
        let ug_per_ml = non_negative(ug_per_ml, "concentration", &name)?;
        self.require(substance, QuantityKind::Concentration)?.intensive = ug_per_ml;
        self.balance_by_intensive();
        Ok(())
    }

    /// Set one gas fraction. Fractions are renormalized to sum to one.
    pub fn set_volume_fraction(&mut self, substance: SubstanceId, fraction: Real) -> TransportResult<()> {
        let name = self.name.clone();
        let fraction = non_negative(fraction, "volume fraction", &name)?;
        self.require(substance, QuantityKind::VolumeFraction)?.intensive = fraction;
        self.balance_by_intensive();
        Ok(())
    }

    /// Set several gas fractions at once, then renormalize.
    pub fn set_volume_fractions(&mut self, fractions: &[(SubstanceId, Real)]) -> TransportResult<()> {
        let name = self.name.clone();
        for &(substance, fraction) in fractions {
            let fraction = non_negative(fraction, "volume fraction", &name)?;
            self.require(substance, QuantityKind::VolumeFraction)?.intensive = fraction;
        }
        self.balance_by_intensive();
        Ok(())
    }

    pub(crate) fn clamp_negative_amounts(&mut self) {
        for q in &mut self.substances {
            if q.extensive < 0.0 {
                q.extensive = 0.0;
            }
        }
    }

    /// Derive intensive values from extensive ones.
    pub fn balance_by_extensive(&mut self) {
        let volume = self.volume_ml;
        let gas_total: Real = self
            .substances
            .iter()
            .filter(|q| q.kind == QuantityKind::VolumeFraction)
            .map(|q| q.extensive)
            .sum();
        for q in &mut self.substances {
            q.intensive = match q.kind {
                QuantityKind::Concentration if volume > 0.0 => q.extensive / volume,
                QuantityKind::VolumeFraction if gas_total > 0.0 => q.extensive / gas_total,
                _ => 0.0,
            };
        }
        self.update_partial_pressures();
    }

    /// Derive extensive values from intensive ones, renormalizing gas fractions first.
    pub fn balance_by_intensive(&mut self) {
        self.normalize_fractions();
        let volume = self.volume_ml;
        for q in &mut self.substances {
            q.extensive = q.intensive * volume;
        }
        self.update_partial_pressures();
    }

    fn normalize_fractions(&mut self) {
        let total: Real = self
            .substances
            .iter()
            .filter(|q| q.kind == QuantityKind::VolumeFraction)
            .map(|q| q.intensive)
            .sum();
        if total == 0.0 {
            for q in self.substances.iter_mut().filter(|q| q.kind == QuantityKind::VolumeFraction) {
                q.intensive = 0.0;
                q.extensive = 0.0;
            }
        } else if !nearly_equal(total, 1.0, Tolerances::default()) {
            for q in self.substances.iter_mut().filter(|q| q.kind == QuantityKind::VolumeFraction) {
                q.intensive /= total;
            }
        }
    }

    fn update_partial_pressures(&mut self) {
        let pressure = self.pressure_mmhg;
        for q in &mut self.substances {
            q.partial_pressure_mmhg = match q.kind {
                QuantityKind::VolumeFraction => q.intensive * pressure,
                QuantityKind::Concentration if q.solubility_ug_per_ml_mmhg > 0.0 => {
                    q.intensive / q.solubility_ug_per_ml_mmhg
                }
                QuantityKind::Concentration => 0.0,
            };
        }
    }
}

fn non_negative(value: Real, what: &'static str, compartment: &str) -> TransportResult<Real> {
    if !value.is_finite() {
        return Err(TransportError::InvalidValue { what, value });
    }
    if value < 0.0 {
        tracing::warn!(compartment, what, value, "negative value clamped to zero");
        return Ok(0.0);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substance::SubstanceCatalog;

    fn lung() -> (Compartment, SubstanceId, SubstanceId) {
        let catalog = SubstanceCatalog::physiology();
        let o2 = catalog.id("O2").unwrap();
        let n2 = catalog.id("N2").unwrap();
        let mut c = Compartment::new(CompartmentId::from_index(0), "alveoli", Phase::Gas);
        c.add_substance(o2, catalog.get(o2).unwrap());
        c.add_substance(n2, catalog.get(n2).unwrap());
        c.set_pressure(760.0).unwrap();
        c.set_volume(2000.0).unwrap();
        (c, o2, n2)
    }

    #[test]
    fn fractions_renormalize_on_set() {
        let (mut c, o2, n2) = lung();
        c.set_volume_fractions(&[(o2, 0.2), (n2, 0.6)]).unwrap();
        let f_o2 = c.quantity(o2).unwrap().volume_fraction().unwrap();
        let f_n2 = c.quantity(n2).unwrap().volume_fraction().unwrap();
        assert!((f_o2 - 0.25).abs() < 1e-12);
        assert!((f_n2 - 0.75).abs() < 1e-12);
        assert!((c.quantity(o2).unwrap().volume_ml().unwrap() - 500.0).abs() < 1e-9);
        assert!((c.quantity(o2).unwrap().partial_pressure_mmhg() - 190.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_fraction_clears_everything() {
        let (mut c, o2, n2) = lung();
        c.set_volume_fractions(&[(o2, 0.0), (n2, 0.0)]).unwrap();
        for q in c.substances() {
            assert_eq!(q.intensive(), 0.0);
            assert_eq!(q.extensive(), 0.0);
        }
    }

    #[test]
    fn over_removal_is_clamped() {
        let catalog = SubstanceCatalog::physiology();
        let glucose = catalog.id("glucose").unwrap();
        let mut c = Compartment::new(CompartmentId::from_index(1), "plasma", Phase::Liquid);
        c.add_substance(glucose, catalog.get(glucose).unwrap());
        c.set_volume(100.0).unwrap();
        c.set_mass(glucose, 50.0).unwrap();
        let applied = c.increment_mass(glucose, -80.0).unwrap();
        assert_eq!(applied, -50.0);
        assert_eq!(c.quantity(glucose).unwrap().mass_ug(), Some(0.0));
    }

    #[test]
    fn liquid_keeps_mass_when_volume_changes() {
        let catalog = SubstanceCatalog::physiology();
        let glucose = catalog.id("glucose").unwrap();
        let mut c = Compartment::new(CompartmentId::from_index(1), "plasma", Phase::Liquid);
        c.add_substance(glucose, catalog.get(glucose).unwrap());
        c.set_volume(100.0).unwrap();
        c.set_concentration(glucose, 2.0).unwrap();
        c.set_volume(200.0).unwrap();
        let q = c.quantity(glucose).unwrap();
        assert_eq!(q.mass_ug(), Some(200.0));
        assert_eq!(q.concentration_ug_per_ml(), Some(1.0));
    }

    #[test]
    fn wrong_kind_is_an_error() {
        let (mut c, o2, _) = lung();
        assert!(matches!(
            c.set_mass(o2, 1.0),
            Err(TransportError::WrongQuantityKind { .. })
        ));
    }

    #[test]
    fn dissolved_gas_partial_pressure_uses_solubility() {
        let catalog = SubstanceCatalog::physiology();
        let o2 = catalog.id("O2").unwrap();
        let mut c = Compartment::new(CompartmentId::from_index(2), "blood", Phase::Liquid);
        c.add_substance(o2, catalog.get(o2).unwrap());
        c.set_volume(10.0).unwrap();
        c.set_concentration(o2, 0.0429 * 100.0).unwrap();
        let pp = c.quantity(o2).unwrap().partial_pressure_mmhg();
        assert!((pp - 100.0).abs() < 1e-9);
    }
}
