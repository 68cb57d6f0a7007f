//! Frame graph and rigid transforms between frames.
//!
//! We use the terminology b_from_a so that composition reads like matrix
//! multiplication: `c_from_a = c_from_b * b_from_a`.

pub mod earth;
pub mod edge;
pub mod frame;
pub mod pipeline;
pub mod registry;

use nalgebra::Vector3;
use rotations::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Mul;
use thiserror::Error;

pub mod prelude {
    pub use crate::earth::*;
    pub use crate::edge::*;
    pub use crate::frame::*;
    pub use crate::registry::*;
    pub use crate::{Transform, TransformErrors};
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformErrors {
    #[error("{0}")]
    Frame(#[from] registry::FrameErrors),
    #[error("edge {from} -> {to} is time varying and no time was supplied")]
    StaleFrameTime { from: String, to: String },
    #[error("state is expressed in '{state}' but the transform starts at '{from}'")]
    FrameMismatch { state: String, from: String },
}

/// Rigid transform from frame A to frame B.
///
/// `rotation` is the passive rotation A -> B and `translation` is the origin
/// of B expressed in A, so a point maps as `p_b = C (p_a - t)`.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize)]
pub struct Transform {
    pub rotation: Rotation,
    pub translation: Vector3<f64>,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: Rotation::IDENTITY,
        translation: Vector3::new(0.0, 0.0, 0.0),
    };

    pub fn new(rotation: Rotation, translation: Vector3<f64>) -> Self {
        Self { rotation, translation }
    }

    pub fn from_rotation(rotation: impl Into<Rotation>) -> Self {
        Self::new(rotation.into(), Vector3::zeros())
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::new(Rotation::IDENTITY, translation)
    }

    pub fn inv(&self) -> Self {
        Self {
            rotation: self.rotation.inv(),
            translation: -self.rotation.transform(&self.translation),
        }
    }

    /// Free vectors only rotate.
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transform(v)
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.transform(&(p - self.translation))
    }

    /// Rotation angle and translation distance between two transforms.
    pub fn difference(&self, other: &Transform) -> (f64, f64) {
        (
            self.rotation.angle_to(&other.rotation),
            (self.translation - other.translation).norm(),
        )
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;

    /// `c_from_b * b_from_a`, the right operand is applied first.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            rotation: self.rotation.compose(&rhs.rotation),
            translation: rhs.translation + rhs.rotation.rotate(&self.translation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn b_from_a() -> Transform {
        Transform::new(
            RotationMatrix::rot_z(FRAC_PI_2).into(),
            Vector3::new(1.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_transform_point_and_vector() {
        let t = b_from_a();
        // A's (2, 0, 0) sits one unit along B's -y axis
        assert_abs_diff_eq!(
            t.transform_point(&Vector3::new(2.0, 0.0, 0.0)),
            Vector3::new(0.0, -1.0, 0.0),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            t.transform_vector(&Vector3::new(2.0, 0.0, 0.0)),
            Vector3::new(0.0, -2.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inverse() {
        let t = b_from_a();
        let p = Vector3::new(0.3, -2.0, 5.0);
        assert_abs_diff_eq!(t.inv().transform_point(&t.transform_point(&p)), p, epsilon = 1e-12);
        let (angle, distance) = (t * t.inv()).difference(&Transform::IDENTITY);
        assert_abs_diff_eq!(angle, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(distance, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_composition_matches_sequential() {
        let b_from_a = b_from_a();
        let c_from_b = Transform::new(
            UnitQuaternion::from_axis_angle(&Vector3::new(1.0, 1.0, 0.0), 0.7)
                .unwrap()
                .into(),
            Vector3::new(0.0, 2.0, -1.0),
        );
        let c_from_a = c_from_b * b_from_a;
        let p = Vector3::new(4.0, 5.0, 6.0);
        assert_abs_diff_eq!(
            c_from_a.transform_point(&p),
            c_from_b.transform_point(&b_from_a.transform_point(&p)),
            epsilon = 1e-12
        );
    }
}
