//! Scalar and vector types shared by the integrator and the reconstruction

/// Scalar type for physics calculations (f64 for precision)
pub type Scalar = f64;

/// 3D vector type for positions, momenta, velocities and fields
pub type Vector = bevy::math::DVec3;

/// 2D vector type for transverse-plane quantities
pub type Vector2 = bevy::math::DVec2;

/// 2x2 matrix type for small normal-equation systems
pub type Matrix2 = bevy::math::DMat2;

/// Approximate equality with relative and absolute tolerances.
///
/// `a` is considered close to the reference `b` when
/// `|a - b| <= atol + rtol * |b|`. The comparison is asymmetric in the same
/// way as the usual numerical-library definition: the relative part scales
/// with the reference value only.
#[inline]
pub fn is_close(a: Scalar, b: Scalar, rtol: Scalar, atol: Scalar) -> bool {
    (a - b).abs() <= atol + rtol * b.abs()
}

/// Sign of `x` as -1, 0 or +1.
///
/// Unlike [`f64::signum`], zero maps to zero.
#[inline]
pub fn sign(x: Scalar) -> Scalar {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Cartesian components of a vector given its magnitude, polar angle
/// `theta` (from +z) and azimuthal angle `phi` (from +x).
pub fn spherical_to_cartesian(magnitude: Scalar, theta: Scalar, phi: Scalar) -> Vector {
    Vector::new(
        magnitude * libm::sin(theta) * libm::cos(phi),
        magnitude * libm::sin(theta) * libm::sin(phi),
        magnitude * libm::cos(theta),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_is_close_uses_both_tolerances() {
        assert!(is_close(1.005, 1.0, 1e-2, 0.0));
        assert!(!is_close(1.02, 1.0, 1e-2, 0.0));
        assert!(is_close(0.009, 0.0, 1e-2, 1e-2));
        assert!(!is_close(0.011, 0.0, 1e-2, 1e-2));
        // relative part scales with the reference value
        assert!(is_close(10.15, 10.0, 1e-2, 1e-2));
    }

    #[test]
    fn test_sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(3.0), 1.0);
        assert_eq!(sign(-1e-300), -1.0);
    }

    #[test]
    fn test_spherical_decomposition() {
        let v = spherical_to_cartesian(2.0, PI / 2.0, 0.0);
        assert!((v - Vector::new(2.0, 0.0, 0.0)).length() < 1e-12);

        let v = spherical_to_cartesian(1.0, 0.0, 1.3);
        assert!((v - Vector::Z).length() < 1e-12);

        let v = spherical_to_cartesian(5.0, PI / 3.0, PI / 4.0);
        assert!((v.length() - 5.0).abs() < 1e-12);
        assert!((v.z - 2.5).abs() < 1e-12);
    }
}
