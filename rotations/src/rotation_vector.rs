use super::*;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utilities::{ValidationErrors, vector3_from_slice};

#[derive(Debug, Error, Copy, Clone, PartialEq)]
pub enum RotationVectorErrors {
    #[error("magnitude of the axis is too small, should be normalizable to a magnitude of 1.0")]
    ZeroMagnitudeAxis,
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

/// Axis scaled by angle in radians, a passive rotation about `axis` by `|v|`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationVector(Vector3<f64>);

impl RotationVector {
    pub fn new(v: Vector3<f64>) -> Self {
        Self(v)
    }

    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Result<Self, RotationVectorErrors> {
        let norm = axis.norm();
        if norm < 1e-12 {
            return Err(RotationVectorErrors::ZeroMagnitudeAxis);
        }
        Ok(Self(axis / norm * angle))
    }

    pub fn vector(&self) -> Vector3<f64> {
        self.0
    }

    pub fn angle(&self) -> f64 {
        self.0.norm()
    }

    /// Unit axis, `None` for the zero rotation.
    pub fn axis(&self) -> Option<Vector3<f64>> {
        let angle = self.angle();
        if angle < 1e-12 { None } else { Some(self.0 / angle) }
    }
}

impl TryFrom<&[f64]> for RotationVector {
    type Error = RotationVectorErrors;
    fn try_from(values: &[f64]) -> Result<Self, RotationVectorErrors> {
        Ok(Self(vector3_from_slice(values)?))
    }
}

impl From<&UnitQuaternion> for RotationVector {
    /// Principal rotation vector, angle in [0, π].
    fn from(q: &UnitQuaternion) -> Self {
        let q = q.canonical();
        let v = q.quaternion().vector();
        let s = v.norm();
        if s < 1e-12 {
            // sin(a/2) ≈ a/2
            return Self(2.0 * v);
        }
        let angle = 2.0 * s.atan2(q.w());
        Self(v / s * angle)
    }
}

impl From<&RotationMatrix> for RotationVector {
    fn from(m: &RotationMatrix) -> Self {
        RotationVector::from(&UnitQuaternion::from(m))
    }
}

impl From<&EulerAngles> for RotationVector {
    fn from(euler: &EulerAngles) -> Self {
        RotationVector::from(&UnitQuaternion::from(euler))
    }
}

impl RotationTrait for RotationVector {
    fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        UnitQuaternion::from(self).rotate(v)
    }

    fn transform(&self, v: &Vector3<f64>) -> Vector3<f64> {
        UnitQuaternion::from(self).transform(v)
    }

    fn inv(&self) -> Self {
        Self(-self.0)
    }

    fn identity() -> Self {
        Self(Vector3::zeros())
    }
}
