//! Physical constants and unit conversions
//!
//! Positions are in meters, times in seconds, momenta in MeV/c, masses in
//! GeV/c² (table values) or kg, fields in tesla and V/m.

use super::math::Scalar;

/// Speed of light (m/s)
pub const SPEED_OF_LIGHT: Scalar = 299_792_458.0;

/// Elementary charge (C)
pub const ELEMENTARY_CHARGE: Scalar = 1.602_176_634e-19;

/// 1 GeV/c² expressed in kg
pub const GEV_C2_TO_KG: Scalar = 1.0e9 * ELEMENTARY_CHARGE / (SPEED_OF_LIGHT * SPEED_OF_LIGHT);

/// 1 kg·m/s expressed in MeV/c
pub const KG_M_PER_S_TO_MEV_C: Scalar = SPEED_OF_LIGHT / (1.0e6 * ELEMENTARY_CHARGE);

/// Transverse momentum per unit charge, field and bending radius, in GeV/c per (T·m)
pub const Q_FACTOR: Scalar = SPEED_OF_LIGHT * 1.0e-9;

/// MeV per GeV
pub const MEV_PER_GEV: Scalar = 1000.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gev_to_kg() {
        assert!((GEV_C2_TO_KG / 1.782_661_92e-27 - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_momentum_conversion_matches_q_factor() {
        // e·B·R in SI momentum, converted to MeV/c, must agree with q_factor·B·R·1000
        let si_momentum = ELEMENTARY_CHARGE * 1.0 * 1.0;
        let mev = si_momentum * KG_M_PER_S_TO_MEV_C;
        assert!((mev - Q_FACTOR * MEV_PER_GEV).abs() < 1e-9);
    }
}
