use constant::ConstantGravity;
use j2::J2Gravity;
use nalgebra::Vector3;
use newtonian::NewtonianGravity;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utilities::ValidationErrors;

pub mod constant;
pub mod j2;
pub mod newtonian;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum GravityErrors {
    #[error("gravity is singular at zero radius")]
    ZeroRadius,
    #[error("distance between bodies must be positive, got {0}")]
    InvalidDistance(f64),
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Gravity {
    Constant(ConstantGravity),
    Newtonian(NewtonianGravity),
    J2(J2Gravity),
}

impl Gravity {
    pub fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        match self {
            Gravity::Constant(g) => g.calculate(r),
            Gravity::Newtonian(g) => g.calculate(r),
            Gravity::J2(g) => g.calculate(r),
        }
    }
}

impl From<ConstantGravity> for Gravity {
    fn from(value: ConstantGravity) -> Self {
        Gravity::Constant(value)
    }
}

impl From<NewtonianGravity> for Gravity {
    fn from(value: NewtonianGravity) -> Self {
        Gravity::Newtonian(value)
    }
}

impl From<J2Gravity> for Gravity {
    fn from(value: J2Gravity) -> Self {
        Gravity::J2(value)
    }
}

pub trait GravityModel {
    // input r is position vector in the central body's frame
    // returns gravitational acceleration in the same frame
    fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors>;
}

/// Magnitude of the attraction between two point masses, N.
pub fn gravitational_force(m1: f64, m2: f64, distance: f64) -> Result<f64, GravityErrors> {
    if !(distance > 0.0) || !distance.is_finite() {
        return Err(GravityErrors::InvalidDistance(distance));
    }
    Ok(earth::GRAVITATIONAL_CONSTANT * m1 * m2 / (distance * distance))
}

pub(crate) fn checked_radius(r: &Vector3<f64>) -> Result<f64, GravityErrors> {
    utilities::validate_vector3(r)?;
    let radius = r.norm();
    if radius == 0.0 {
        return Err(GravityErrors::ZeroRadius);
    }
    Ok(radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gravitational_force() {
        // earth and moon
        let f = gravitational_force(5.972e24, 7.348e22, 3.844e8).unwrap();
        assert_relative_eq!(f, 1.982e20, max_relative = 1e-3);
        assert_eq!(
            gravitational_force(1.0, 1.0, 0.0),
            Err(GravityErrors::InvalidDistance(0.0))
        );
        assert!(gravitational_force(1.0, 1.0, -2.0).is_err());
    }

    #[test]
    fn test_enum_dispatch() {
        let g = Gravity::from(ConstantGravity::new(Vector3::new(0.0, 0.0, -9.81)));
        assert_eq!(g.calculate(&Vector3::zeros()).unwrap(), Vector3::new(0.0, 0.0, -9.81));
        let g = Gravity::from(NewtonianGravity::EARTH);
        assert_eq!(g.calculate(&Vector3::zeros()), Err(GravityErrors::ZeroRadius));
    }
}
