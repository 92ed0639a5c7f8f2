//! Substance properties and the catalog they are looked up from.

use pf_core::{Real, SubstanceId};
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

/// Physical state a substance is carried in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstanceState {
    Gas,
    Liquid,
    Aerosol,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub state: SubstanceState,
    pub molar_mass_g_per_mol: Real,
    /// Mass per volume of the pure substance at body conditions.
    pub density_ug_per_ml: Real,
    /// Diffusivity relative to oxygen across the alveolar membrane.
    #[serde(default)]
    pub relative_diffusion_coefficient: Real,
    /// Dissolved concentration per unit partial pressure.
    #[serde(default)]
    pub solubility_ug_per_ml_mmhg: Real,
    /// Fraction of inflowing aerosol deposited on compartment walls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposition_efficiency: Option<Real>,
}

impl Substance {
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        if query.is_empty() {
            return false;
        }
        self.name.to_ascii_lowercase() == query
            || self.aliases.iter().any(|a| a.to_ascii_lowercase() == query)
    }
}

/// Ordered set of substances; a substance's id is its position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstanceCatalog {
    substances: Vec<Substance>,
}

impl SubstanceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalog with the respiratory gases plus one solute and one aerosol.
    pub fn physiology() -> Self {
        let mut catalog = Self::new();
        let entries = [
            gas("Oxygen", &["O2"], 31.9988, 1429.0, 1.0, 0.0429),
            gas("CarbonDioxide", &["CO2", "carbon dioxide"], 44.0095, 1977.0, 20.0, 1.35),
            gas("Nitrogen", &["N2"], 28.0134, 1251.0, 0.53, 0.0157),
            Substance {
                name: "Glucose".into(),
                aliases: vec!["C6H12O6".into()],
                state: SubstanceState::Liquid,
                molar_mass_g_per_mol: 180.156,
                density_ug_per_ml: 1.54e6,
                relative_diffusion_coefficient: 0.0,
                solubility_ug_per_ml_mmhg: 0.0,
                deposition_efficiency: None,
            },
            Substance {
                name: "Albuterol".into(),
                aliases: vec!["salbutamol".into()],
                state: SubstanceState::Aerosol,
                molar_mass_g_per_mol: 239.311,
                density_ug_per_ml: 1.23e6,
                relative_diffusion_coefficient: 0.0,
                solubility_ug_per_ml_mmhg: 0.0,
                deposition_efficiency: Some(0.1),
            },
        ];
        for s in entries {
            catalog.substances.push(s);
        }
        catalog
    }

    /// Add a substance; names and aliases must not collide with existing entries.
    pub fn add(&mut self, substance: Substance) -> TransportResult<SubstanceId> {
        let clash = std::iter::once(&substance.name)
            .chain(&substance.aliases)
            .find(|n| self.find(n).is_some());
        if let Some(name) = clash {
            return Err(TransportError::DuplicateSubstance { name: name.clone() });
        }
        let id = SubstanceId::from_usize(self.substances.len());
        self.substances.push(substance);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.substances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    pub fn get(&self, id: SubstanceId) -> Option<&Substance> {
        self.substances.get(id.slot())
    }

    fn find(&self, query: &str) -> Option<SubstanceId> {
        self.substances
            .iter()
            .position(|s| s.matches_query(query))
            .map(SubstanceId::from_usize)
    }

    /// Look up a substance by name or alias, case-insensitively.
    pub fn id(&self, name: &str) -> TransportResult<SubstanceId> {
        self.find(name).ok_or_else(|| TransportError::SubstanceNotFound {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (SubstanceId, &Substance)> {
        self.substances
            .iter()
            .enumerate()
            .map(|(i, s)| (SubstanceId::from_usize(i), s))
    }
}

fn gas(
    name: &str,
    aliases: &[&str],
    molar_mass: Real,
    density: Real,
    relative_diffusion: Real,
    solubility: Real,
) -> Substance {
    Substance {
        name: name.into(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        state: SubstanceState::Gas,
        molar_mass_g_per_mol: molar_mass,
        density_ug_per_ml: density,
        relative_diffusion_coefficient: relative_diffusion,
        solubility_ug_per_ml_mmhg: solubility,
        deposition_efficiency: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_alias_is_case_insensitive() {
        let c = SubstanceCatalog::physiology();
        let o2 = c.id("o2").unwrap();
        assert_eq!(c.get(o2).unwrap().name, "Oxygen");
        assert_eq!(c.id("OXYGEN").unwrap(), o2);
        assert!(c.id("unobtainium").is_err());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut c = SubstanceCatalog::physiology();
        let dup = c.get(c.id("Glucose").unwrap()).unwrap().clone();
        assert!(c.add(dup).is_err());
    }

    #[test]
    fn catalog_loads_from_yaml() {
        let yaml = r#"
- name: Sodium
  aliases: [Na]
  state: liquid
  molar_mass_g_per_mol: 22.99
  density_ug_per_ml: 968000.0
"#;
        let c: SubstanceCatalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(c.id("na").unwrap()).unwrap().state, SubstanceState::Liquid);
    }
}
