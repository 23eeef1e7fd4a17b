//! Momentum estimate from one window of a helical track
//!
//! The transverse projection of the window is fitted with a circle, the
//! swept angle gives the transverse arc length and a straight-line fit of z
//! against t gives the longitudinal drift. The radius and the mean
//! longitudinal field give the transverse momentum; the pitch splits it into
//! the longitudinal part, and the speeds give the mass.

use super::circle::{CircleFit, fit_circle};
use super::regression::fit_line;
use crate::error::WindowError;
use crate::physics::constants::{MEV_PER_GEV, Q_FACTOR, SPEED_OF_LIGHT};
use crate::physics::fields::FieldSampler;
use crate::physics::math::{Scalar, Vector2, sign};
use crate::trajectory::TrajectorySample;
use std::f64::consts::TAU;

/// Smallest |z length| relative to the arc length for which the pitch is
/// considered defined
const MIN_PITCH_RATIO: Scalar = 1e-9;

/// Estimate recovered from one window
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedMomentum {
    /// Total momentum in MeV/c
    pub p: Scalar,
    /// Energy in MeV
    pub energy: Scalar,
    /// Mass in MeV/c²
    pub mass: Scalar,
    /// -1, 0 or +1
    pub charge_sign: Scalar,
    pub pt: Scalar,
    pub pz: Scalar,
    /// Speed in m/s
    pub v: Scalar,

    pub circle: CircleFit,
    /// Swept azimuth in radians
    pub arc_angle: Scalar,
    pub arc_length: Scalar,
    pub z_length: Scalar,
    pub vz: Scalar,
    pub vt: Scalar,
    pub beta: Scalar,
    pub gamma: Scalar,
    /// Mean longitudinal magnetic field over the window, in tesla
    pub mean_bz: Scalar,
}

/// Azimuths of the points around `center`.
///
/// Kept as returned by `atan2` when they run from a non-positive first angle
/// to a positive last one, otherwise mapped into `[0, 2π)`.
fn unwrapped_angles(points: &[Vector2], center: Vector2) -> Vec<Scalar> {
    let angles: Vec<Scalar> = points
        .iter()
        .map(|point| libm::atan2(point.y - center.y, point.x - center.x))
        .collect();

    let crosses_zero = match (angles.first(), angles.last()) {
        (Some(&first), Some(&last)) => first <= 0.0 && last > 0.0,
        _ => false,
    };
    if crosses_zero {
        angles
    } else {
        angles.into_iter().map(|angle| (angle + TAU) % TAU).collect()
    }
}

/// Reconstruct momentum, mass and charge sign from the window `samples`,
/// ordered in time, using `magnetic` for the field along the track.
pub fn reconstruct_arc(
    samples: &[TrajectorySample],
    magnetic: &dyn FieldSampler,
) -> Result<ReconstructedMomentum, WindowError> {
    let (first, last) = match samples {
        [first, .., last] if samples.len() >= 3 => (first, last),
        _ => {
            return Err(WindowError::InsufficientPoints {
                points: samples.len(),
            });
        }
    };

    let duration = last.t() - first.t();
    if duration.is_nan() || duration <= 0.0 {
        return Err(WindowError::ZeroDuration);
    }

    let transverse: Vec<Vector2> = samples
        .iter()
        .map(|sample| sample.position().truncate())
        .collect();
    let circle = fit_circle(&transverse);
    if !circle.is_finite() {
        return Err(WindowError::NonFiniteCircle);
    }

    let angles = unwrapped_angles(&transverse, circle.center);
    let arc_angle = match (angles.first(), angles.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };
    let arc_length = circle.radius * arc_angle;
    if circle.radius.is_nan() || circle.radius <= 0.0 || arc_angle == 0.0 {
        return Err(WindowError::DegenerateCircle {
            radius: circle.radius,
            arc_angle,
        });
    }

    let times: Vec<Scalar> = samples.iter().map(|sample| sample.t()).collect();
    let zs: Vec<Scalar> = samples.iter().map(|sample| sample.position().z).collect();
    let drift = fit_line(&times, &zs).ok_or(WindowError::ZeroDuration)?;
    let vz = drift.slope;
    let z_length = vz * duration;

    let vt = arc_length / duration;
    let v = libm::hypot(vt, vz);
    let beta = v / SPEED_OF_LIGHT;
    if beta.is_nan() || beta >= 1.0 {
        return Err(WindowError::Superluminal { speed: v });
    }
    let gamma = 1.0 / (1.0 - beta * beta).sqrt();

    if z_length == 0.0 || z_length.abs() <= MIN_PITCH_RATIO * arc_length.abs() {
        return Err(WindowError::DegeneratePitch { z_length });
    }
    let tan_theta = arc_length / z_length;

    let mean_bz = samples
        .iter()
        .map(|sample| magnetic.evaluate(sample.position()).z)
        .sum::<Scalar>()
        / samples.len() as Scalar;

    let pt = Q_FACTOR * mean_bz * circle.radius * MEV_PER_GEV;
    let pz = pt / tan_theta;
    let p = libm::hypot(pt, pz);
    let mass = p * SPEED_OF_LIGHT / (gamma * v);
    let energy = (p * p + mass * mass).sqrt();
    let physical = |value: Scalar| value.is_finite() && value > 0.0;
    if !physical(p) || !physical(mass) || !physical(energy) {
        return Err(WindowError::UnphysicalEstimate { p, mass, energy });
    }
    let charge_sign = -sign(vz) * sign(libm::atan2(arc_length, z_length));

    Ok(ReconstructedMomentum {
        p,
        energy,
        mass,
        charge_sign,
        pt,
        pz,
        v,
        circle,
        arc_angle,
        arc_length,
        z_length,
        vz,
        vt,
        beta,
        gamma,
        mean_bz,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::fields::FieldModel;
    use crate::physics::math::Vector;
    use std::f64::consts::PI;

    const MUON_MASS: Scalar = 0.105_658_375_5;

    /// Counterclockwise helix about (0, radius) starting at the origin
    fn helix(radius: Scalar, omega: Scalar, vz: Scalar, n: usize, dt: Scalar) -> Vec<TrajectorySample> {
        (0..n)
            .map(|i| {
                let t = i as Scalar * dt;
                let angle = omega * t;
                let position = Vector::new(radius * angle.sin(), radius * (1.0 - angle.cos()), vz * t);
                TrajectorySample::new(t, position, Vector::X, MUON_MASS)
            })
            .collect()
    }

    #[test]
    fn test_too_few_points() {
        let samples = helix(0.3, 1e9, 1e8, 2, 1e-10);
        assert_eq!(
            reconstruct_arc(&samples, &FieldModel::default_magnetic()),
            Err(WindowError::InsufficientPoints { points: 2 })
        );
    }

    #[test]
    fn test_zero_duration() {
        let sample = TrajectorySample::new(0.0, Vector::ZERO, Vector::X, MUON_MASS);
        assert_eq!(
            reconstruct_arc(&[sample; 3], &FieldModel::default_magnetic()),
            Err(WindowError::ZeroDuration)
        );
    }

    #[test]
    fn test_flat_circle_has_degenerate_pitch() {
        let samples = helix(0.2, 1e9, 0.0, 10, 1e-10);
        assert!(matches!(
            reconstruct_arc(&samples, &FieldModel::default_magnetic()),
            Err(WindowError::DegeneratePitch { .. })
        ));
    }

    #[test]
    fn test_faster_than_light_window() {
        // 3 m radius swept at 1e9 rad/s is ten times the speed of light
        let samples = helix(3.0, 1e9, 1e8, 10, 1e-10);
        assert!(matches!(
            reconstruct_arc(&samples, &FieldModel::default_magnetic()),
            Err(WindowError::Superluminal { .. })
        ));
    }

    #[test]
    fn test_straight_track_has_no_arc() {
        // momentum along the field: every point projects onto the axis
        let samples: Vec<TrajectorySample> = (0..10)
            .map(|i| {
                let t = i as Scalar * 1e-10;
                TrajectorySample::new(t, Vector::new(0.0, 0.0, 1e8 * t), Vector::Z, MUON_MASS)
            })
            .collect();
        assert_eq!(
            reconstruct_arc(&samples, &FieldModel::default_magnetic()),
            Err(WindowError::DegenerateCircle {
                radius: 0.0,
                arc_angle: 0.0
            })
        );
    }

    #[test]
    fn test_zero_field_estimate_is_rejected() {
        let samples = helix(0.2, 1e9, 1e8, 10, 1e-10);
        assert!(matches!(
            reconstruct_arc(&samples, &FieldModel::Zero),
            Err(WindowError::UnphysicalEstimate { p, .. }) if p == 0.0
        ));
    }

    #[test]
    fn test_geometric_helix() {
        let (radius, omega, vz) = (0.2, 1.0e9, 1.0e8);
        let samples = helix(radius, omega, vz, 10, 1e-10);
        let estimate = reconstruct_arc(&samples, &FieldModel::default_magnetic()).unwrap();

        assert!((estimate.circle.radius / radius - 1.0).abs() < 1e-7);
        assert!((estimate.arc_angle - 0.9).abs() < 1e-7);
        assert!((estimate.vz / vz - 1.0).abs() < 1e-10);
        assert!((estimate.vt / (radius * omega) - 1.0).abs() < 1e-7);
        assert!((estimate.mean_bz - 1.0).abs() < 1e-15);
        assert!((estimate.pt - Q_FACTOR * radius * 1000.0).abs() < 1e-5);
        assert!((estimate.pz - estimate.pt * vz / (radius * omega)).abs() < 1e-5);
        assert_eq!(estimate.charge_sign, -1.0);
        assert!((estimate.energy.powi(2) - estimate.p.powi(2) - estimate.mass.powi(2)).abs() < 1e-6);
    }

    #[test]
    fn test_angles_across_branch_cut() {
        let center = Vector2::ZERO;
        let points: Vec<Vector2> = [0.9 * PI, PI, 1.1 * PI]
            .iter()
            .map(|angle| Vector2::new(angle.cos(), angle.sin()))
            .collect();
        let angles = unwrapped_angles(&points, center);
        assert!((angles[2] - angles[0] - 0.2 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_angles_across_zero_are_kept() {
        let points: Vec<Vector2> = [-0.2_f64, 0.0, 0.2]
            .iter()
            .map(|angle| Vector2::new(angle.cos(), angle.sin()))
            .collect();
        let angles = unwrapped_angles(&points, Vector2::ZERO);
        assert!((angles[0] + 0.2).abs() < 1e-12);
        assert!((angles[2] - angles[0] - 0.4).abs() < 1e-12);
    }
}
