//! Particle species table and the per-run particle model

use super::constants::{GEV_C2_TO_KG, MEV_PER_GEV};
use super::math::Scalar;
use crate::error::ConfigError;

/// Table entry for one particle species, keyed by its PDG Monte Carlo number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Species {
    pub pdg_id: u32,
    pub name: &'static str,
    pub antiparticle_name: &'static str,
    /// Mass in GeV/c²
    pub mass: Scalar,
    /// Charge of the particle (positive id) in units of e
    pub charge: Scalar,
}

const SPECIES: &[Species] = &[
    Species {
        pdg_id: 11,
        name: "e-",
        antiparticle_name: "e+",
        mass: 0.000_510_998_950,
        charge: -1.0,
    },
    Species {
        pdg_id: 13,
        name: "mu-",
        antiparticle_name: "mu+",
        mass: 0.105_658_375_5,
        charge: -1.0,
    },
    Species {
        pdg_id: 15,
        name: "tau-",
        antiparticle_name: "tau+",
        mass: 1.776_86,
        charge: -1.0,
    },
    Species {
        pdg_id: 211,
        name: "pi+",
        antiparticle_name: "pi-",
        mass: 0.139_570_39,
        charge: 1.0,
    },
    Species {
        pdg_id: 321,
        name: "K+",
        antiparticle_name: "K-",
        mass: 0.493_677,
        charge: 1.0,
    },
    Species {
        pdg_id: 2112,
        name: "n",
        antiparticle_name: "n~",
        mass: 0.939_565_420_52,
        charge: 0.0,
    },
    Species {
        pdg_id: 2212,
        name: "p",
        antiparticle_name: "p~",
        mass: 0.938_272_088_16,
        charge: 1.0,
    },
];

/// All species known to the table, ordered by PDG number
pub fn all_species() -> &'static [Species] {
    SPECIES
}

/// Look up a species by its unsigned PDG number
pub fn lookup(pdg_id: u32) -> Option<&'static Species> {
    SPECIES.iter().find(|species| species.pdg_id == pdg_id)
}

/// Physical identity of the tracked particle.
///
/// Built from a signed species identifier: the magnitude selects the table
/// entry and a negative sign selects the antiparticle, flipping the charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleModel {
    species_id: i32,
    species: &'static Species,
    mass: Scalar,
    mass_kg: Scalar,
    charge_magnitude: Scalar,
    charge_sign: Scalar,
}

impl ParticleModel {
    pub fn from_species_id(species_id: i32) -> Result<Self, ConfigError> {
        let species = lookup(species_id.unsigned_abs()).ok_or(ConfigError::UnknownSpecies(species_id))?;
        let id_sign = if species_id < 0 { -1.0 } else { 1.0 };
        let table_sign = if species.charge < 0.0 { -1.0 } else { 1.0 };

        Ok(Self {
            species_id,
            species,
            mass: species.mass,
            mass_kg: species.mass * GEV_C2_TO_KG,
            charge_magnitude: species.charge.abs(),
            charge_sign: id_sign * table_sign,
        })
    }

    #[inline]
    pub fn species_id(&self) -> i32 {
        self.species_id
    }

    pub fn name(&self) -> &'static str {
        if self.species_id < 0 {
            self.species.antiparticle_name
        } else {
            self.species.name
        }
    }

    /// Mass in GeV/c²
    #[inline]
    pub fn mass(&self) -> Scalar {
        self.mass
    }

    /// Mass in MeV/c²
    #[inline]
    pub fn mass_mev(&self) -> Scalar {
        self.mass * MEV_PER_GEV
    }

    #[inline]
    pub fn mass_kg(&self) -> Scalar {
        self.mass_kg
    }

    /// Charge magnitude in units of e
    #[inline]
    pub fn charge_magnitude(&self) -> Scalar {
        self.charge_magnitude
    }

    /// +1 or -1
    #[inline]
    pub fn charge_sign(&self) -> Scalar {
        self.charge_sign
    }

    /// Signed charge in units of e
    #[inline]
    pub fn charge(&self) -> Scalar {
        self.charge_sign * self.charge_magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_electron_and_positron() {
        let electron = ParticleModel::from_species_id(11).unwrap();
        assert_eq!(electron.charge(), -1.0);
        assert_eq!(electron.charge_sign(), -1.0);
        assert_eq!(electron.charge_magnitude(), 1.0);
        assert_eq!(electron.name(), "e-");
        assert!((electron.mass_mev() - 0.510_998_95).abs() < 1e-9);
        assert!((electron.mass_kg() / 9.109_383_7e-31 - 1.0).abs() < 1e-6);

        let positron = ParticleModel::from_species_id(-11).unwrap();
        assert_eq!(positron.charge(), 1.0);
        assert_eq!(positron.name(), "e+");
        assert_eq!(positron.mass(), electron.mass());
    }

    #[test]
    fn test_negative_id_flips_positive_species() {
        let pi_minus = ParticleModel::from_species_id(-211).unwrap();
        assert_eq!(pi_minus.charge(), -1.0);
        assert_eq!(pi_minus.name(), "pi-");
    }

    #[test]
    fn test_neutral_species_has_no_charge() {
        let neutron = ParticleModel::from_species_id(2112).unwrap();
        assert_eq!(neutron.charge(), 0.0);
    }

    #[test]
    fn test_unknown_species_is_rejected() {
        assert_eq!(
            ParticleModel::from_species_id(999_999),
            Err(ConfigError::UnknownSpecies(999_999))
        );
        assert_eq!(
            ParticleModel::from_species_id(0),
            Err(ConfigError::UnknownSpecies(0))
        );
    }

    #[test]
    fn test_table_is_sorted_and_unique() {
        let ids: Vec<u32> = all_species().iter().map(|s| s.pdg_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
    }
}
