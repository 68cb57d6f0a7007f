use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{GravityErrors, GravityModel, checked_radius};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewtonianGravity {
    pub mu: f64,
}

impl NewtonianGravity {
    pub const EARTH: Self = Self { mu: earth::EARTH_MU };

    pub fn new(mu: f64) -> Self {
        Self { mu }
    }
}

impl GravityModel for NewtonianGravity {
    fn calculate(&self, position: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        let position_mag = checked_radius(position)?;
        Ok(-position * self.mu / position_mag.powi(3))
    }
}
