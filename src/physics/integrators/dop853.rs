//! Dormand-Prince 8(5,3) embedded Runge-Kutta method

use super::tableau::{ButcherTableau, weighted_sum};
use super::{EquationOfMotion, Integrator, PhaseState, StepEstimate};
use crate::error::DomainError;
use crate::physics::math::Scalar;

/// Dormand-Prince 8(5,3) integrator
///
/// Twelve-stage explicit method propagating an eighth-order solution. The
/// local error is estimated from a fifth-order and a third-order embedded
/// solution, blended by the step controller as
/// `|e5|² / sqrt(|e5|² + 0.01·|e3|²)`. At tight tolerances over many
/// gyration periods it takes far fewer steps than the 5(4) pairs.
///
/// Reference: Hairer, Nørsett, Wanner (1993) "Solving Ordinary Differential
/// Equations I", section II.10 (DOP853)
#[derive(Debug, Clone, Copy, Default)]
pub struct Dop853;

/// `b_embedded` holds the third-order weights
pub(super) const TABLEAU: ButcherTableau<12> = ButcherTableau {
    c: [
        0.0,
        5.260_015_195_876_773e-2,
        7.890_022_793_815_16e-2,
        1.183_503_419_072_274e-1,
        2.816_496_580_927_726e-1,
        1.0 / 3.0,
        0.25,
        4.0 / 13.0,
        127.0 / 195.0,
        0.6,
        6.0 / 7.0,
        1.0,
    ],
    a: [
        [0.0; 12],
        [
            5.260_015_195_876_773e-2,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            1.972_505_698_453_79e-2,
            5.917_517_095_361_37e-2,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            2.958_758_547_680_685e-2,
            0.0,
            8.876_275_643_042_055e-2,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            2.413_651_341_592_667e-1,
            0.0,
            -8.845_494_793_282_861e-1,
            9.248_340_032_617_92e-1,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            1.0 / 27.0,
            0.0,
            0.0,
            1.708_286_087_294_738_6e-1,
            1.254_676_875_668_224_2e-1,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            3.710_937_5e-2,
            0.0,
            0.0,
            1.702_522_110_195_440_4e-1,
            6.021_653_898_045_596e-2,
            -1.757_812_5e-2,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            3.709_200_011_850_479e-2,
            0.0,
            0.0,
            1.703_839_257_122_399_9e-1,
            1.072_620_304_463_732_8e-1,
            -1.531_943_774_862_440_2e-2,
            8.273_789_163_814_023e-3,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            6.241_109_587_160_757e-1,
            0.0,
            0.0,
            -3.360_892_629_446_941,
            -8.682_193_468_417_26e-1,
            2.759_209_969_944_670_8e1,
            2.015_406_755_047_789_4e1,
            -4.348_988_418_106_996e1,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
        [
            4.776_625_364_382_643_7e-1,
            0.0,
            0.0,
            -2.488_114_619_971_667_7,
            -5.902_908_268_368_43e-1,
            2.123_005_144_818_119_4e1,
            1.527_923_363_288_242_3e1,
            -3.328_821_096_898_486e1,
            -2.033_120_170_850_862_6e-2,
            0.0,
            0.0,
            0.0,
        ],
        [
            -9.371_424_300_859_873e-1,
            0.0,
            0.0,
            5.186_372_428_844_064,
            1.091_437_348_996_729_6,
            -8.149_787_010_746_927,
            -1.852_006_565_999_696e1,
            2.273_948_709_935_050_5e1,
            2.493_605_552_679_652_4,
            -3.046_764_471_898_219_5,
            0.0,
            0.0,
        ],
        [
            2.273_310_147_516_538,
            0.0,
            0.0,
            -1.053_449_546_673_725e1,
            -2.000_872_058_224_862_5,
            -1.795_893_186_311_88e1,
            2.794_888_452_941_996e1,
            -2.858_998_277_135_023_5,
            -8.872_856_933_530_63,
            1.236_056_717_579_430_3e1,
            6.433_927_460_157_635e-1,
            0.0,
        ],
    ],
    b: [
        5.429_373_411_656_876e-2,
        0.0,
        0.0,
        0.0,
        0.0,
        4.450_312_892_752_409,
        1.891_517_899_314_500_3,
        -5.801_203_960_010_585,
        3.111_643_669_578_199e-1,
        -1.521_609_496_625_160_8e-1,
        2.013_654_008_040_303_4e-1,
        4.471_061_572_777_259e-2,
    ],
    b_embedded: [
        2.440_944_881_889_763_8e-1,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        7.338_466_882_816_118e-1,
        0.0,
        0.0,
        2.205_882_352_941_176_4e-2,
    ],
};

/// Weights of the fifth-order error estimate; they sum to zero
const ERROR_5: [Scalar; 12] = [
    1.312_004_499_419_488e-2,
    0.0,
    0.0,
    0.0,
    0.0,
    -1.225_156_446_376_204_4,
    -4.957_589_496_572_502e-1,
    1.664_377_182_454_986_5,
    -3.503_288_487_499_736_6e-1,
    3.341_791_187_130_175e-1,
    8.192_320_648_511_571e-2,
    -2.235_530_786_388_629_6e-2,
];

impl Integrator for Dop853 {
    fn clone_box(&self) -> Box<dyn Integrator> {
        Box::new(*self)
    }

    fn step(
        &self,
        system: &dyn EquationOfMotion,
        t: Scalar,
        state: &PhaseState,
        dt: Scalar,
    ) -> Result<StepEstimate, DomainError> {
        let k = TABLEAU.stages(system, t, state, dt)?;
        let error_3: [Scalar; 12] =
            std::array::from_fn(|stage| TABLEAU.b[stage] - TABLEAU.b_embedded[stage]);

        Ok(StepEstimate {
            state: *state + weighted_sum(&k, &TABLEAU.b, dt),
            error: weighted_sum(&k, &ERROR_5, dt),
            secondary_error: Some(weighted_sum(&k, &error_3, dt)),
        })
    }

    fn convergence_order(&self) -> usize {
        8
    }

    /// Order used by the step controller, as for the blended 5/3 estimate
    /// the effective error behaves like a seventh-order one
    fn error_estimator_order(&self) -> usize {
        7
    }

    fn name(&self) -> &'static str {
        "dormand_prince_853"
    }

    fn aliases(&self) -> Vec<&'static str> {
        vec!["dop853", "rk853"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::math::Vector;

    /// position' = momentum, momentum' = -position
    struct Rotation;

    impl EquationOfMotion for Rotation {
        fn derivative(&self, _t: Scalar, state: &PhaseState) -> Result<PhaseState, DomainError> {
            Ok(PhaseState::new(state.momentum, -state.position))
        }
    }

    #[test]
    fn test_tableau_is_consistent() {
        assert!(TABLEAU.consistency_defect() < 1e-12);
    }

    #[test]
    fn test_error_weights_sum_to_zero() {
        assert!(ERROR_5.iter().sum::<Scalar>().abs() < 1e-12);
        // Σ e_i c_i = 0 as well: the estimate vanishes for linear problems in t
        let moment: Scalar = ERROR_5.iter().zip(TABLEAU.c).map(|(e, c)| e * c).sum();
        assert!(moment.abs() < 1e-12);
    }

    #[test]
    fn test_quadrature_conditions() {
        // Σ b_i c_i^(q-1) = 1/q up to the order of each solution
        for q in 1..=8 {
            let sum: Scalar = TABLEAU
                .b
                .iter()
                .zip(TABLEAU.c)
                .map(|(b, c)| b * c.powi(q - 1))
                .sum();
            assert!((sum - 1.0 / q as Scalar).abs() < 1e-12, "q = {q}: {sum}");
        }
        for q in 1..=3 {
            let sum: Scalar = TABLEAU
                .b_embedded
                .iter()
                .zip(TABLEAU.c)
                .map(|(b, c)| b * c.powi(q - 1))
                .sum();
            assert!((sum - 1.0 / q as Scalar).abs() < 1e-12, "q = {q}: {sum}");
        }
    }

    #[test]
    fn test_global_error_converges_at_eighth_order() {
        let initial = PhaseState::new(Vector::X, Vector::Y);
        let global_error = |steps: usize| {
            let dt = 2.0 / steps as Scalar;
            let mut state = initial;
            for i in 0..steps {
                state = Dop853.step(&Rotation, i as Scalar * dt, &state, dt).unwrap().state;
            }
            (state.position - Vector::new(2.0_f64.cos(), 2.0_f64.sin(), 0.0)).length()
        };

        let coarse = global_error(4);
        let fine = global_error(8);
        let order = (coarse / fine).log2();
        assert!(order > 7.0, "Unexpected global order: {order}");
    }

    #[test]
    fn test_both_error_estimates_are_reported() {
        let state = PhaseState::new(Vector::X, Vector::Y);
        let estimate = Dop853.step(&Rotation, 0.0, &state, 0.1).unwrap();

        let largest = |error: PhaseState| {
            error.to_array().iter().fold(0.0_f64, |m, e| m.max(e.abs()))
        };
        let secondary = estimate.secondary_error.unwrap();
        assert!(largest(estimate.error) < 1e-8);
        assert!(largest(secondary) > 0.0);
        assert!(largest(secondary) < 1e-3);
    }
}
