//! Field providers for the magnetic and electric fields
//!
//! The tracker and the reconstruction only ever see a [`FieldSampler`].
//! Field maps, interpolators and other external providers plug in by
//! implementing the trait or by wrapping a closure in [`FnField`]. The
//! [`FieldModel`] variants are plain data so they can live in configuration.

use super::math::{Scalar, Vector};
use serde::{Deserialize, Serialize};

/// A static vector field evaluated at a position in meters.
///
/// Implementations must be pure: the same position always yields the same
/// vector. Samplers are shared across threads and called many times per
/// step, often at the same position.
pub trait FieldSampler: Send + Sync {
    fn evaluate(&self, position: Vector) -> Vector;
}

/// Adapter that turns a closure into a [`FieldSampler`]
#[derive(Debug, Clone, Copy)]
pub struct FnField<F>(pub F);

impl<F> FieldSampler for FnField<F>
where
    F: Fn(Vector) -> Vector + Send + Sync,
{
    #[inline]
    fn evaluate(&self, position: Vector) -> Vector {
        (self.0)(position)
    }
}

/// Named, serializable field configurations
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldModel {
    /// No field anywhere
    #[default]
    Zero,
    /// The same vector everywhere
    Uniform { value: [Scalar; 3] },
    /// Solenoid-like axial field whose longitudinal component changes
    /// linearly along z. The transverse part keeps the field divergence-free.
    AxialGradient {
        /// Bz at `z_ref`
        bz0: Scalar,
        /// dBz/dz, per meter
        gradient: Scalar,
        z_ref: Scalar,
    },
    /// Another field model multiplied by a constant
    Scaled { factor: Scalar, field: Box<FieldModel> },
}

impl FieldModel {
    pub fn uniform(value: Vector) -> Self {
        FieldModel::Uniform {
            value: value.to_array(),
        }
    }

    /// Default magnetic field: 1 T along +z
    pub fn default_magnetic() -> Self {
        FieldModel::uniform(Vector::Z)
    }
}

impl FieldSampler for FieldModel {
    fn evaluate(&self, position: Vector) -> Vector {
        match self {
            FieldModel::Zero => Vector::ZERO,
            FieldModel::Uniform { value } => Vector::from_array(*value),
            FieldModel::AxialGradient {
                bz0,
                gradient,
                z_ref,
            } => Vector::new(
                -0.5 * gradient * position.x,
                -0.5 * gradient * position.y,
                bz0 + gradient * (position.z - z_ref),
            ),
            FieldModel::Scaled { factor, field } => field.evaluate(position) * *factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_field_is_position_independent() {
        let field = FieldModel::uniform(Vector::new(0.0, 0.0, 1.0));
        assert_eq!(field.evaluate(Vector::ZERO), Vector::Z);
        assert_eq!(field.evaluate(Vector::new(3.0, -2.0, 10.0)), Vector::Z);
    }

    #[test]
    fn test_axial_gradient_is_divergence_free() {
        let field = FieldModel::AxialGradient {
            bz0: 1.0,
            gradient: -0.05,
            z_ref: 4.0,
        };
        let h = 1e-4;
        let p = Vector::new(0.2, -0.1, 5.0);
        let divergence = (field.evaluate(p + Vector::X * h).x - field.evaluate(p - Vector::X * h).x
            + field.evaluate(p + Vector::Y * h).y
            - field.evaluate(p - Vector::Y * h).y
            + field.evaluate(p + Vector::Z * h).z
            - field.evaluate(p - Vector::Z * h).z)
            / (2.0 * h);
        assert!(divergence.abs() < 1e-10, "divergence = {divergence}");
        assert!((field.evaluate(Vector::new(0.0, 0.0, 4.0)).z - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_scaled_field() {
        let field = FieldModel::Scaled {
            factor: 0.5,
            field: Box::new(FieldModel::default_magnetic()),
        };
        assert_eq!(field.evaluate(Vector::ONE), Vector::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn test_closure_field() {
        let field = FnField(|position: Vector| Vector::new(0.0, 0.0, 1.0 + position.z));
        assert_eq!(field.evaluate(Vector::new(0.0, 0.0, 1.0)).z, 2.0);
    }

    #[test]
    fn test_field_model_toml_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            field: FieldModel,
        }

        let wrapper = Wrapper {
            field: FieldModel::Scaled {
                factor: 0.99,
                field: Box::new(FieldModel::AxialGradient {
                    bz0: 1.0,
                    gradient: -0.02,
                    z_ref: 0.0,
                }),
            },
        };
        let text = toml::to_string(&wrapper).unwrap();
        let parsed: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(parsed.field, wrapper.field);
    }
}
