use earth::Ellipsoid;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{GravityErrors, GravityModel, checked_radius};

/// Point mass plus the J2 zonal term of an ellipsoid, in the body-fixed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct J2Gravity {
    pub mu: f64,
    pub ellipsoid: Ellipsoid,
}

impl Default for J2Gravity {
    fn default() -> Self {
        Self::new(earth::EARTH_MU, Ellipsoid::wgs84())
    }
}

impl J2Gravity {
    pub fn new(mu: f64, ellipsoid: Ellipsoid) -> Self {
        Self { mu, ellipsoid }
    }
}

impl GravityModel for J2Gravity {
    fn calculate(&self, position: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        let r = checked_radius(position)?;
        let a = self.ellipsoid.a();

        let common = -self.mu / (r * r);
        let j2_factor = 1.5 * self.ellipsoid.j2 * (a / r).powi(2);
        let z_factor = (position[2] / r).powi(2);

        let equatorial = common * (1.0 + j2_factor * (1.0 - 5.0 * z_factor)) / r;
        let polar = common * (1.0 + j2_factor * (3.0 - 5.0 * z_factor)) / r;

        Ok(Vector3::new(
            equatorial * position[0],
            equatorial * position[1],
            polar * position[2],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newtonian::NewtonianGravity;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reduces_to_newtonian_without_j2() {
        let j2 = J2Gravity::new(earth::EARTH_MU, Ellipsoid::spherical_earth());
        let r = Vector3::new(4.0e6, -3.0e6, 5.0e6);
        let expected = NewtonianGravity::EARTH.calculate(&r).unwrap();
        assert_abs_diff_eq!(j2.calculate(&r).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_equator_is_stronger_than_point_mass() {
        // at the equator J2 adds 1.5 j2 of the point mass term
        let j2 = J2Gravity::default();
        let r = Vector3::new(6378137.0, 0.0, 0.0);
        let g = j2.calculate(&r).unwrap();
        let point_mass = earth::EARTH_MU / 6378137.0_f64.powi(2);
        assert_abs_diff_eq!(g[0], -point_mass * (1.0 + 1.5 * 1.08263e-3), epsilon = 1e-12);
        assert_eq!(g[1], 0.0);
        assert_eq!(g[2], 0.0);
    }

    #[test]
    fn test_pole_is_weaker_than_point_mass() {
        let j2 = J2Gravity::default();
        let b = j2.ellipsoid.b();
        let g = j2.calculate(&Vector3::new(0.0, 0.0, b)).unwrap();
        let a = j2.ellipsoid.a();
        let point_mass = earth::EARTH_MU / (b * b);
        let expected = -point_mass * (1.0 - 3.0 * 1.08263e-3 * (a / b).powi(2));
        assert_abs_diff_eq!(g[2], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_radius() {
        assert_eq!(
            J2Gravity::default().calculate(&Vector3::zeros()),
            Err(GravityErrors::ZeroRadius)
        );
    }
}
