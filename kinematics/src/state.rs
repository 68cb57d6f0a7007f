use nalgebra::Vector3;
use rotations::prelude::*;
use serde::{Deserialize, Serialize};
use utilities::{ValidationErrors, validate_vector3};

/// Translational and rotational state of a rigid body relative to a named frame.
///
/// `attitude` is the passive rotation from `frame` to the body, and
/// `angular_velocity` is the body rate relative to `frame` in body axes.
/// Position and velocity are expressed in `frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub attitude: UnitQuaternion,
    pub angular_velocity: Vector3<f64>,
    pub t: f64,
    pub frame: String,
}

impl RigidBodyState {
    /// At rest at the origin of `frame`, aligned with it, at t = 0.
    pub fn new(frame: impl Into<String>) -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            attitude: UnitQuaternion::IDENTITY,
            angular_velocity: Vector3::zeros(),
            t: 0.0,
            frame: frame.into(),
        }
    }

    pub fn with_position(mut self, r: Vector3<f64>) -> Self {
        self.position = r;
        self
    }

    pub fn with_velocity(mut self, v: Vector3<f64>) -> Self {
        self.velocity = v;
        self
    }

    pub fn with_attitude(mut self, q: UnitQuaternion) -> Self {
        self.attitude = q;
        self
    }

    pub fn with_rates(mut self, w: Vector3<f64>) -> Self {
        self.angular_velocity = w;
        self
    }

    pub fn with_time(mut self, t: f64) -> Self {
        self.t = t;
        self
    }

    /// Checks every component is finite.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_vector3(&self.position)?;
        validate_vector3(&self.velocity)?;
        validate_vector3(&self.angular_velocity)?;
        if !self.attitude.quaternion().is_finite() {
            return Err(ValidationErrors::NonFinite { index: 0 });
        }
        if !self.t.is_finite() {
            return Err(ValidationErrors::NonFinite { index: 0 });
        }
        Ok(())
    }
}
