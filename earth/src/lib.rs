//! Earth shape and rotation constants, and geodetic coordinates.

pub mod ellipsoid;
pub mod geodetic;

pub use ellipsoid::{Ellipsoid, EllipsoidErrors};
pub use geodetic::{Geodetic, GeodeticErrors, ecef_to_geodetic, geodetic_to_ecef};

/// Earth gravitational parameter, m^3/s^2
pub const EARTH_MU: f64 = 3.986004418e14;
/// Earth rotation rate about its polar axis, rad/s
pub const EARTH_ROTATION_RATE: f64 = 7.292115e-5;
/// Newtonian constant of gravitation, m^3/(kg s^2)
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67430e-11;
