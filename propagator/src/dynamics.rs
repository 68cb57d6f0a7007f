use gravity::Gravity;
use kinematics::RigidBodyState;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type returned by user supplied dynamics.
pub type DynamicsError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum DynamicsErrors {
    #[error("inertia tensor is singular or not finite")]
    SingularInertia,
}

/// Linear acceleration in the state's frame and angular acceleration in body axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accelerations {
    pub linear: Vector3<f64>,
    pub angular: Vector3<f64>,
}

impl Accelerations {
    pub fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }
}

/// Supplies accelerations for a rigid body at an instant.
pub trait Dynamics {
    fn accelerations(&self, state: &RigidBodyState, t: f64) -> Result<Accelerations, DynamicsError>;
}

impl<D: Dynamics + ?Sized> Dynamics for &D {
    fn accelerations(&self, state: &RigidBodyState, t: f64) -> Result<Accelerations, DynamicsError> {
        (**self).accelerations(state, t)
    }
}

/// Adapts a closure into `Dynamics`.
pub struct DynamicsFn<F>(pub F)
where
    F: Fn(&RigidBodyState, f64) -> Result<Accelerations, DynamicsError>;

impl<F> Dynamics for DynamicsFn<F>
where
    F: Fn(&RigidBodyState, f64) -> Result<Accelerations, DynamicsError>,
{
    fn accelerations(&self, state: &RigidBodyState, t: f64) -> Result<Accelerations, DynamicsError> {
        (self.0)(state, t)
    }
}

impl<F> fmt::Debug for DynamicsFn<F>
where
    F: Fn(&RigidBodyState, f64) -> Result<Accelerations, DynamicsError>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DynamicsFn")
    }
}

/// No forces and no torques.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroDynamics;

impl Dynamics for ZeroDynamics {
    fn accelerations(&self, _state: &RigidBodyState, _t: f64) -> Result<Accelerations, DynamicsError> {
        Ok(Accelerations::default())
    }
}

/// Euler's equations for a rigid body with no applied torque,
/// `I ω̇ = −ω × (I ω)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueFree {
    inertia: Matrix3<f64>,
    inverse_inertia: Matrix3<f64>,
}

impl TorqueFree {
    pub fn new(inertia: Matrix3<f64>) -> Result<Self, DynamicsErrors> {
        if !inertia.iter().all(|x| x.is_finite()) {
            return Err(DynamicsErrors::SingularInertia);
        }
        let inverse_inertia = inertia.try_inverse().ok_or(DynamicsErrors::SingularInertia)?;
        Ok(Self {
            inertia,
            inverse_inertia,
        })
    }

    pub fn inertia(&self) -> &Matrix3<f64> {
        &self.inertia
    }

    pub fn angular_acceleration(&self, w: &Vector3<f64>) -> Vector3<f64> {
        -self.inverse_inertia * w.cross(&(self.inertia * w))
    }

    /// Body-axis angular momentum.
    pub fn angular_momentum(&self, w: &Vector3<f64>) -> Vector3<f64> {
        self.inertia * w
    }

    pub fn rotational_energy(&self, w: &Vector3<f64>) -> f64 {
        0.5 * w.dot(&(self.inertia * w))
    }
}

impl Dynamics for TorqueFree {
    fn accelerations(&self, state: &RigidBodyState, _t: f64) -> Result<Accelerations, DynamicsError> {
        Ok(Accelerations::new(
            Vector3::zeros(),
            self.angular_acceleration(&state.angular_velocity),
        ))
    }
}

/// Point mass gravity on the translational state, optionally with torque-free rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GravityDynamics {
    pub gravity: Gravity,
    pub rotation: Option<TorqueFree>,
}

impl GravityDynamics {
    pub fn new(gravity: impl Into<Gravity>) -> Self {
        Self {
            gravity: gravity.into(),
            rotation: None,
        }
    }

    pub fn with_rotation(mut self, rotation: TorqueFree) -> Self {
        self.rotation = Some(rotation);
        self
    }
}

impl Dynamics for GravityDynamics {
    fn accelerations(&self, state: &RigidBodyState, _t: f64) -> Result<Accelerations, DynamicsError> {
        let linear = self.gravity.calculate(&state.position)?;
        let angular = match &self.rotation {
            Some(rotation) => rotation.angular_acceleration(&state.angular_velocity),
            None => Vector3::zeros(),
        };
        Ok(Accelerations::new(linear, angular))
    }
}
