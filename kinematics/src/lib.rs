//! Attitude kinematics for body-axis angular velocity.
//!
//! With the passive attitude convention of `rotations` (`C` maps reference
//! components to body components) and `ω` the body rate relative to the
//! reference frame expressed in body axes:
//!
//! - `q̇ = ½ Ω(ω) q = ½ Ξ(q) ω`
//! - `Ċ = −[ω×] C`

pub mod state;

pub use state::RigidBodyState;

use nalgebra::{Matrix3, Matrix4, Matrix4x3, Vector3, Vector4};
use rotations::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum KinematicsErrors {
    #[error("angular velocity magnitude {magnitude} rad/s is not finite or exceeds the limit of {limit} rad/s")]
    InvalidAngularVelocity { magnitude: f64, limit: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicsSettings {
    /// Largest accepted angular rate magnitude, rad/s.
    pub max_angular_rate: f64,
}

impl Default for KinematicsSettings {
    fn default() -> Self {
        Self { max_angular_rate: 100.0 }
    }
}

impl KinematicsSettings {
    pub fn validate(&self, w: &Vector3<f64>) -> Result<(), KinematicsErrors> {
        let magnitude = w.norm();
        if !magnitude.is_finite() || magnitude > self.max_angular_rate {
            return Err(KinematicsErrors::InvalidAngularVelocity {
                magnitude,
                limit: self.max_angular_rate,
            });
        }
        Ok(())
    }
}

/// Cross product matrix, `skew(a) * b = a × b`.
pub fn skew(w: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -w[2], w[1], w[2], 0.0, -w[0], -w[1], w[0], 0.0)
}

/// Ω(ω) for scalar-last quaternions.
pub fn omega_matrix(w: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        0.0, w[2], -w[1], w[0], //
        -w[2], 0.0, w[0], w[1], //
        w[1], -w[0], 0.0, w[2], //
        -w[0], -w[1], -w[2], 0.0,
    )
}

/// Ξ(q) = [q4 I + [q_v×]; −q_vᵀ], Markley eq 3.20 & 2.88
pub fn xi_matrix(q: &Quaternion) -> Matrix4x3<f64> {
    Matrix4x3::new(
        q.w, -q.z, q.y, //
        q.z, q.w, -q.x, //
        -q.y, q.x, q.w, //
        -q.x, -q.y, -q.z,
    )
}

/// Unchecked quaternion rate, for use inside integrators that validate ω themselves.
pub fn quaternion_derivative(q: &Quaternion, w: &Vector3<f64>) -> Quaternion {
    let dq: Vector4<f64> = 0.5 * xi_matrix(q) * w;
    Quaternion::new(dq[0], dq[1], dq[2], dq[3])
}

/// `q̇ = ½ Ω(ω) q`, rejecting unbounded or non-finite rates.
pub fn quaternion_rate(
    q: &UnitQuaternion,
    w: &Vector3<f64>,
    settings: &KinematicsSettings,
) -> Result<Quaternion, KinematicsErrors> {
    settings.validate(w)?;
    Ok(quaternion_derivative(q.quaternion(), w))
}

/// `Ċ = −[ω×] C`.
pub fn dcm_rate(
    c: &RotationMatrix,
    w: &Vector3<f64>,
    settings: &KinematicsSettings,
) -> Result<Matrix3<f64>, KinematicsErrors> {
    settings.validate(w)?;
    Ok(-skew(w) * c.get_value())
}

/// Exact attitude after holding `w` constant for `dt`:
/// `q(t + dt) = q_rv(ω dt) * q(t)`.
pub fn propagate_constant_rate(q: &UnitQuaternion, w: &Vector3<f64>, dt: f64) -> UnitQuaternion {
    let step = UnitQuaternion::from(&RotationVector::new(w * dt));
    step.compose(q)
}
