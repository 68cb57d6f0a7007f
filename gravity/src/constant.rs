use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use utilities::validate_finite;

use crate::{GravityErrors, GravityModel};

/// Standard acceleration of gravity, m/s^2.
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Uniform field independent of position, for flat-earth analyses in a
/// local level frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantGravity {
    pub g: Vector3<f64>,
}

impl ConstantGravity {
    pub fn new(g: Vector3<f64>) -> Self {
        Self { g }
    }

    /// Standard gravity along +z of a north-east-down frame.
    pub fn ned() -> Self {
        Self::new(Vector3::new(0.0, 0.0, STANDARD_GRAVITY))
    }

    /// Standard gravity along -z of an east-north-up frame.
    pub fn enu() -> Self {
        Self::new(Vector3::new(0.0, 0.0, -STANDARD_GRAVITY))
    }
}

impl GravityModel for ConstantGravity {
    fn calculate(&self, _position: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        validate_finite(self.g.as_slice(), 3)?;
        Ok(self.g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_level_fields_point_down() {
        let r = Vector3::new(10.0, -3.0, 2.0);
        assert_eq!(ConstantGravity::ned().calculate(&r).unwrap()[2], STANDARD_GRAVITY);
        assert_eq!(ConstantGravity::enu().calculate(&r).unwrap()[2], -STANDARD_GRAVITY);
    }

    #[test]
    fn test_non_finite_field_is_rejected() {
        let g = ConstantGravity::new(Vector3::new(0.0, f64::NAN, 0.0));
        assert!(g.calculate(&Vector3::zeros()).is_err());
    }
}
