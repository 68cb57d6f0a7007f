//! Attitude representations and the algebra shared by the frame pipeline and
//! the propagator.
//!
//! Conventions used throughout the crate:
//! - quaternions are scalar last, `(x, y, z, w)`
//! - every representation describes a *passive* rotation: the direction cosine
//!   matrix `C` maps components expressed in the reference frame to components
//!   expressed in the rotated (body) frame, so `transform(v) = C v` and
//!   `rotate(v) = Cᵀ v`
//! - composition is right to left: `a.compose(&b)` (and `a * b`) applies `b`
//!   first, so that `C(a ∘ b) = C(a) C(b)` and `q_a2c = q_b2c * q_a2b`

pub mod euler_angles;
pub mod quaternion;
pub mod rotation_matrix;
pub mod rotation_vector;

use euler_angles::{EulerAngles, EulerConversion, EulerSequence};
use nalgebra::Vector3;
use quaternion::UnitQuaternion;
use rotation_matrix::RotationMatrix;
use rotation_vector::RotationVector;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

pub mod prelude {
    pub use crate::euler_angles::*;
    pub use crate::quaternion::*;
    pub use crate::rotation_matrix::*;
    pub use crate::rotation_vector::*;
    pub use crate::{Rotation, RotationTolerances, RotationTrait};
}

/// Trait defining rotation and transformation operations.
pub trait RotationTrait {
    /// Rotates a vector by the rotation (active, "alibi").
    ///
    /// # Arguments
    ///
    /// * `v` - The vector to be rotated.
    ///
    /// # Returns
    ///
    /// The rotated vector, `Cᵀ v`.
    fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64>;

    /// Transforms a vector by the rotation (passive, "alias").
    ///
    /// # Arguments
    ///
    /// * `v` - The vector to be transformed, in reference frame components.
    ///
    /// # Returns
    ///
    /// The same vector in rotated frame components, `C v`.
    fn transform(&self, v: &Vector3<f64>) -> Vector3<f64>;

    fn inv(&self) -> Self;

    fn identity() -> Self;
}

/// Numeric tolerances applied when composing and converting rotations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationTolerances {
    /// Quaternions are renormalized when `| |q| - 1 |` exceeds this value.
    pub quaternion_norm: f64,
    /// Matrices are re-orthonormalized when `‖CᵀC − I‖_F` exceeds this value.
    pub dcm_orthonormality: f64,
    /// Euler conversions within this many radians of a singularity are flagged.
    pub gimbal_epsilon: f64,
}

impl Default for RotationTolerances {
    fn default() -> Self {
        Self {
            quaternion_norm: 1e-9,
            dcm_orthonormality: 1e-9,
            gimbal_epsilon: 1e-3,
        }
    }
}

/// Enum representing different types of rotations.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Rotation {
    EulerAngles(EulerAngles),
    Quaternion(UnitQuaternion),
    RotationMatrix(RotationMatrix),
    RotationVector(RotationVector),
}

impl Default for Rotation {
    /// Provides the default value for a rotation, which is an identity quaternion.
    fn default() -> Self {
        Rotation::IDENTITY
    }
}

impl Rotation {
    pub const IDENTITY: Self = Rotation::Quaternion(UnitQuaternion::IDENTITY);

    pub fn to_quaternion(&self) -> UnitQuaternion {
        UnitQuaternion::from(self)
    }

    pub fn to_dcm(&self) -> RotationMatrix {
        RotationMatrix::from(self)
    }

    pub fn to_rotation_vector(&self) -> RotationVector {
        RotationVector::from(&self.to_quaternion())
    }

    /// Converts to the requested Euler sequence using default tolerances.
    ///
    /// The result is flagged `degenerate` near gimbal lock rather than failing.
    pub fn to_euler(&self, sequence: EulerSequence) -> EulerConversion {
        self.to_euler_with(sequence, &RotationTolerances::default())
    }

    pub fn to_euler_with(
        &self,
        sequence: EulerSequence,
        tolerances: &RotationTolerances,
    ) -> EulerConversion {
        match self {
            // already in the requested sequence, nothing to convert
            Rotation::EulerAngles(angles) if angles.sequence == sequence => EulerConversion {
                angles: *angles,
                degenerate: angles.is_near_singularity(tolerances.gimbal_epsilon),
            },
            _ => self.to_dcm().to_euler_with(sequence, tolerances),
        }
    }

    /// Applies `other` first, then `self`.
    pub fn compose(&self, other: &Rotation) -> Rotation {
        self.compose_with(other, &RotationTolerances::default())
    }

    pub fn compose_with(&self, other: &Rotation, tolerances: &RotationTolerances) -> Rotation {
        match (self, other) {
            (Rotation::RotationMatrix(lhs), Rotation::RotationMatrix(rhs)) => {
                Rotation::RotationMatrix(lhs.compose_with(rhs, tolerances))
            }
            (lhs, rhs) => Rotation::Quaternion(
                lhs.to_quaternion()
                    .compose_with(&rhs.to_quaternion(), tolerances),
            ),
        }
    }

    /// Returns the inverse rotation in the same representation.
    pub fn inverse(&self) -> Rotation {
        self.inv()
    }

    /// Angle in radians of the rotation taking `self` to `other`.
    pub fn angle_to(&self, other: &Rotation) -> f64 {
        self.to_quaternion()
            .angle_to(&other.to_quaternion())
    }
}

impl From<&UnitQuaternion> for Rotation {
    fn from(quaternion: &UnitQuaternion) -> Self {
        Rotation::Quaternion(*quaternion)
    }
}

impl From<UnitQuaternion> for Rotation {
    fn from(quaternion: UnitQuaternion) -> Self {
        Rotation::Quaternion(quaternion)
    }
}

impl From<&RotationMatrix> for Rotation {
    fn from(rotation_matrix: &RotationMatrix) -> Self {
        Rotation::RotationMatrix(*rotation_matrix)
    }
}

impl From<RotationMatrix> for Rotation {
    fn from(rotation_matrix: RotationMatrix) -> Self {
        Rotation::RotationMatrix(rotation_matrix)
    }
}

impl From<&EulerAngles> for Rotation {
    fn from(euler: &EulerAngles) -> Self {
        Rotation::EulerAngles(*euler)
    }
}

impl From<EulerAngles> for Rotation {
    fn from(euler: EulerAngles) -> Self {
        Rotation::EulerAngles(euler)
    }
}

impl From<&RotationVector> for Rotation {
    fn from(rotation_vector: &RotationVector) -> Self {
        Rotation::RotationVector(*rotation_vector)
    }
}

impl From<RotationVector> for Rotation {
    fn from(rotation_vector: RotationVector) -> Self {
        Rotation::RotationVector(rotation_vector)
    }
}

impl Mul<Rotation> for Rotation {
    type Output = Self;

    /// Multiplies two rotations, `rhs` is applied first.
    fn mul(self, rhs: Rotation) -> Rotation {
        self.compose(&rhs)
    }
}

impl RotationTrait for Rotation {
    fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Rotation::EulerAngles(rotation) => rotation.rotate(v),
            Rotation::RotationMatrix(rotation) => rotation.rotate(v),
            Rotation::Quaternion(rotation) => rotation.rotate(v),
            Rotation::RotationVector(rotation) => rotation.rotate(v),
        }
    }

    fn transform(&self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            Rotation::EulerAngles(rotation) => rotation.transform(v),
            Rotation::RotationMatrix(rotation) => rotation.transform(v),
            Rotation::Quaternion(rotation) => rotation.transform(v),
            Rotation::RotationVector(rotation) => rotation.transform(v),
        }
    }

    fn inv(&self) -> Self {
        match self {
            Rotation::EulerAngles(rotation) => Rotation::EulerAngles(rotation.inv()),
            Rotation::RotationMatrix(rotation) => Rotation::RotationMatrix(rotation.inv()),
            Rotation::Quaternion(rotation) => Rotation::Quaternion(rotation.inv()),
            Rotation::RotationVector(rotation) => Rotation::RotationVector(rotation.inv()),
        }
    }

    fn identity() -> Self {
        Rotation::IDENTITY
    }
}
