//! Element kinds and the bounds applied to their values.

use pf_core::{Real, clamp_flagged};
use serde::{Deserialize, Serialize};

/// Kind of element carried by a path. Exactly one per path.
///
/// Values by kind (native units of the circuit domain):
/// - `Resistor`: resistance (potential per flux)
/// - `Capacitor`: compliance (quantity per potential), source node stores the quantity
/// - `Inductor`: inertance (potential per flux rate)
/// - `PotentialSource`: potential rise from source node to target node
/// - `FluxSource`: imposed flux from source node to target node
/// - `Switch` / `Valve`: value is the resistance currently in effect, set from [`ElementBounds`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Resistor,
    Capacitor,
    Inductor,
    PotentialSource,
    FluxSource,
    Switch,
    Valve,
}

impl Element {
    pub fn label(self) -> &'static str {
        match self {
            Element::Resistor => "resistance",
            Element::Capacitor => "compliance",
            Element::Inductor => "inertance",
            Element::PotentialSource => "potential source",
            Element::FluxSource => "flux source",
            Element::Switch => "switch",
            Element::Valve => "valve",
        }
    }

    /// Elements whose value must be strictly positive.
    pub fn requires_positive(self) -> bool {
        matches!(
            self,
            Element::Resistor | Element::Capacitor | Element::Inductor
        )
    }

    /// Gates carry a two-state open/closed state instead of a caller-set value.
    pub fn is_gate(self) -> bool {
        matches!(self, Element::Switch | Element::Valve)
    }

    /// Elements that conduct (as opposed to imposing flux).
    pub fn connects(self) -> bool {
        !matches!(self, Element::FluxSource)
    }
}

/// Two-state gate. `Open` conducts, `Closed` blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Open,
    Closed,
}

impl GateState {
    pub fn flipped(self) -> Self {
        match self {
            GateState::Open => GateState::Closed,
            GateState::Closed => GateState::Open,
        }
    }
}

/// Configured numeric bounds for element values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementBounds {
    /// Resistance of an open gate, also the smallest resistance a resistor may take.
    pub open_resistance: Real,
    /// Resistance of a closed gate, also the largest resistance a resistor may take.
    pub closed_resistance: Real,
    /// Smallest compliance or inertance allowed.
    pub min_storage: Real,
    /// Largest compliance or inertance allowed.
    pub max_storage: Real,
}

impl Default for ElementBounds {
    fn default() -> Self {
        Self {
            open_resistance: 1e-5,
            closed_resistance: 1e8,
            min_storage: 1e-9,
            max_storage: 1e9,
        }
    }
}

impl ElementBounds {
    pub fn gate_resistance(&self, state: GateState) -> Real {
        match state {
            GateState::Open => self.open_resistance,
            GateState::Closed => self.closed_resistance,
        }
    }

    /// Clamp a value for `element` into bounds. The flag is true if the value moved.
    pub fn clamp(&self, element: Element, value: Real) -> (Real, bool) {
        match element {
            Element::Resistor => clamp_flagged(value, self.open_resistance, self.closed_resistance),
            Element::Capacitor | Element::Inductor => {
                clamp_flagged(value, self.min_storage, self.max_storage)
            }
            Element::Switch | Element::Valve => {
                clamp_flagged(value, self.open_resistance, self.closed_resistance)
            }
            Element::PotentialSource | Element::FluxSource => (value, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistor_clamped_to_gate_resistances() {
        let b = ElementBounds::default();
        let (v, moved) = b.clamp(Element::Resistor, 1e12);
        assert!(moved);
        assert_eq!(v, b.closed_resistance);
        let (v, moved) = b.clamp(Element::Resistor, 5.0);
        assert!(!moved);
        assert_eq!(v, 5.0);
    }

    #[test]
    fn sources_are_never_clamped() {
        let b = ElementBounds::default();
        assert_eq!(b.clamp(Element::PotentialSource, -1e12), (-1e12, false));
        assert_eq!(b.clamp(Element::FluxSource, 1e12), (1e12, false));
    }

    #[test]
    fn gate_flip() {
        assert_eq!(GateState::Open.flipped(), GateState::Closed);
        assert_eq!(GateState::Closed.flipped(), GateState::Open);
    }
}
