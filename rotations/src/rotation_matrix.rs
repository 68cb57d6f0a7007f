use super::*;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::Mul;
use thiserror::Error;
use utilities::{ValidationErrors, matrix3_from_slice};

/// A passive direction cosine matrix.
///
/// Row `i` holds the reference frame components of rotated axis `i`, so
/// `C v_ref = v_rot`. Deserialized matrices are checked like [`RotationMatrix::new`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Matrix3<f64>", into = "Matrix3<f64>")]
pub struct RotationMatrix(Matrix3<f64>);

/// Errors that can occur when creating a `RotationMatrix`.
#[derive(Debug, Copy, Clone, Error, PartialEq)]
pub enum RotationMatrixErrors {
    #[error("matrix is not orthonormal, ‖CᵀC − I‖ = {drift:e}")]
    NotOrthonormal { drift: f64 },
    #[error("matrix has non-positive determinant {determinant}")]
    Improper { determinant: f64 },
    #[error("matrix is singular and cannot be orthonormalized")]
    Singular,
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl RotationMatrix {
    /// Wraps `m`, requiring orthonormality within the default tolerance.
    pub fn new(m: Matrix3<f64>) -> Result<Self, RotationMatrixErrors> {
        Self::new_with(m, &RotationTolerances::default())
    }

    pub fn new_with(
        m: Matrix3<f64>,
        tolerances: &RotationTolerances,
    ) -> Result<Self, RotationMatrixErrors> {
        if let Some(index) = m.iter().position(|v| !v.is_finite()) {
            return Err(ValidationErrors::NonFinite { index }.into());
        }
        let determinant = m.determinant();
        if determinant <= 0.0 {
            return Err(RotationMatrixErrors::Improper { determinant });
        }
        let drift = drift(&m);
        if drift > tolerances.dcm_orthonormality {
            return Err(RotationMatrixErrors::NotOrthonormal { drift });
        }
        Ok(Self(m))
    }

    /// Accepts a drifted matrix and projects it onto the closest rotation.
    pub fn new_orthonormalized(m: Matrix3<f64>) -> Result<Self, RotationMatrixErrors> {
        if let Some(index) = m.iter().position(|v| !v.is_finite()) {
            return Err(ValidationErrors::NonFinite { index }.into());
        }
        Ok(Self(orthonormalize(&m)?))
    }

    pub fn get_value(&self) -> Matrix3<f64> {
        self.0
    }

    /// ‖CᵀC − I‖ in the Frobenius norm.
    pub fn orthonormality_drift(&self) -> f64 {
        drift(&self.0)
    }

    /// Passive rotation by `angle` about x.
    pub fn rot_x(angle: f64) -> Self {
        Self(elementary(0, angle))
    }

    /// Passive rotation by `angle` about y.
    pub fn rot_y(angle: f64) -> Self {
        Self(elementary(1, angle))
    }

    /// Passive rotation by `angle` about z.
    pub fn rot_z(angle: f64) -> Self {
        Self(elementary(2, angle))
    }

    /// Applies `rhs` first, then `self`.
    pub fn compose(&self, rhs: &RotationMatrix) -> Self {
        self.compose_with(rhs, &RotationTolerances::default())
    }

    pub fn compose_with(&self, rhs: &RotationMatrix, tolerances: &RotationTolerances) -> Self {
        let m = self.0 * rhs.0;
        if drift(&m) > tolerances.dcm_orthonormality {
            // a product of rotations cannot be improper or singular
            return Self(orthonormalize(&m).unwrap_or(m));
        }
        Self(m)
    }

    pub fn to_euler(&self, sequence: EulerSequence) -> EulerConversion {
        self.to_euler_with(sequence, &RotationTolerances::default())
    }

    pub fn to_euler_with(
        &self,
        sequence: EulerSequence,
        tolerances: &RotationTolerances,
    ) -> EulerConversion {
        EulerAngles::from_dcm(&self.0, sequence, tolerances.gimbal_epsilon)
    }
}

fn drift(m: &Matrix3<f64>) -> f64 {
    (m.transpose() * m - Matrix3::identity()).norm()
}

/// Polar decomposition, the closest proper orthogonal matrix to `m`.
pub fn orthonormalize(m: &Matrix3<f64>) -> Result<Matrix3<f64>, RotationMatrixErrors> {
    let determinant = m.determinant();
    if determinant.abs() < f64::EPSILON {
        return Err(RotationMatrixErrors::Singular);
    }
    if determinant < 0.0 {
        return Err(RotationMatrixErrors::Improper { determinant });
    }
    let svd = m.svd(true, true);
    let u = svd.u.ok_or(RotationMatrixErrors::Singular)?;
    let v_t = svd.v_t.ok_or(RotationMatrixErrors::Singular)?;
    Ok(u * v_t)
}

/// Passive elementary rotation matrix about a coordinate axis.
pub(crate) fn elementary(axis: usize, angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    match axis {
        0 => Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c),
        1 => Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c),
        _ => Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0),
    }
}

impl TryFrom<Matrix3<f64>> for RotationMatrix {
    type Error = RotationMatrixErrors;
    fn try_from(m: Matrix3<f64>) -> Result<Self, RotationMatrixErrors> {
        RotationMatrix::new(m)
    }
}

impl From<RotationMatrix> for Matrix3<f64> {
    fn from(value: RotationMatrix) -> Self {
        value.0
    }
}

impl TryFrom<&[f64]> for RotationMatrix {
    type Error = RotationMatrixErrors;
    /// Reads 9 row-major values.
    fn try_from(values: &[f64]) -> Result<Self, RotationMatrixErrors> {
        RotationMatrix::new(matrix3_from_slice(values)?)
    }
}

impl From<&Rotation> for RotationMatrix {
    fn from(rotation: &Rotation) -> RotationMatrix {
        match rotation {
            Rotation::EulerAngles(v) => v.into(),
            Rotation::Quaternion(v) => v.into(),
            Rotation::RotationMatrix(v) => *v,
            Rotation::RotationVector(v) => v.into(),
        }
    }
}

impl From<&UnitQuaternion> for RotationMatrix {
    /// A(q), Markley/Crassidis eq. 2.125
    fn from(q: &UnitQuaternion) -> Self {
        Self(q.dcm())
    }
}

impl From<&EulerAngles> for RotationMatrix {
    /// C = R_k(ψ) R_j(θ) R_i(φ) for the sequence (i, j, k).
    fn from(euler_angles: &EulerAngles) -> RotationMatrix {
        let (i, j, k) = euler_angles.sequence.axes();
        Self(
            elementary(k, euler_angles.psi)
                * elementary(j, euler_angles.theta)
                * elementary(i, euler_angles.phi),
        )
    }
}

impl From<&RotationVector> for RotationMatrix {
    fn from(rv: &RotationVector) -> RotationMatrix {
        Self(UnitQuaternion::from(rv).dcm())
    }
}

impl RotationTrait for RotationMatrix {
    fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.0.transpose() * v
    }

    fn transform(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.0 * v
    }

    fn inv(&self) -> Self {
        Self(self.0.transpose())
    }

    fn identity() -> Self {
        Self(Matrix3::identity())
    }
}

impl Mul<RotationMatrix> for RotationMatrix {
    type Output = RotationMatrix;

    /// Multiplies two rotation matrices, `rhs` is applied first.
    fn mul(self, rhs: RotationMatrix) -> RotationMatrix {
        self.compose(&rhs)
    }
}
