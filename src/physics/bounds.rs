//! Axis-aligned box that ends a track when the particle leaves it

use super::math::{Scalar, Vector};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in configuration form
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub xmin: Scalar,
    pub xmax: Scalar,
    pub ymin: Scalar,
    pub ymax: Scalar,
    pub zmin: Scalar,
    pub zmax: Scalar,
}

impl Bounds {
    /// Validate the extents and build the box
    pub fn to_aabb(&self) -> Result<Aabb3d, ConfigError> {
        let axes = [
            ("x", self.xmin, self.xmax),
            ("y", self.ymin, self.ymax),
            ("z", self.zmin, self.zmax),
        ];
        for (axis, min, max) in axes {
            if min.is_nan() || max.is_nan() {
                return Err(ConfigError::MalformedBounds(format!("{axis} extent is NaN")));
            }
            if min > max {
                return Err(ConfigError::MalformedBounds(format!(
                    "{axis}min = {min} is greater than {axis}max = {max}"
                )));
            }
        }

        Ok(Aabb3d::new(
            Vector::new(self.xmin, self.ymin, self.zmin),
            Vector::new(self.xmax, self.ymax, self.zmax),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3d {
    pub min: Vector,
    pub max: Vector,
}

impl Aabb3d {
    pub fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// Faces count as inside
    #[inline]
    pub fn contains(&self, position: Vector) -> bool {
        position.cmpge(self.min).all() && position.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_bounds() -> Bounds {
        Bounds {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
            zmin: 0.0,
            zmax: 10.0,
        }
    }

    #[test]
    fn test_contains_is_inclusive() {
        let aabb = unit_bounds().to_aabb().unwrap();
        assert!(aabb.contains(Vector::new(0.0, 0.0, 5.0)));
        assert!(aabb.contains(Vector::new(1.0, -1.0, 10.0)));
        assert!(!aabb.contains(Vector::new(1.0 + 1e-12, 0.0, 5.0)));
        assert!(!aabb.contains(Vector::new(0.0, 0.0, -1e-9)));
    }

    #[test]
    fn test_inverted_extent_is_malformed() {
        let bounds = Bounds {
            zmin: 3.0,
            zmax: 2.0,
            ..unit_bounds()
        };
        assert!(matches!(
            bounds.to_aabb(),
            Err(ConfigError::MalformedBounds(_))
        ));
    }

    #[test]
    fn test_nan_extent_is_malformed() {
        let bounds = Bounds {
            xmax: Scalar::NAN,
            ..unit_bounds()
        };
        assert!(bounds.to_aabb().is_err());
    }
}
