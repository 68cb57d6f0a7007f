use crate::Ellipsoid;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;
use utilities::{ValidationErrors, validate_finite, validate_vector3};

const MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum GeodeticErrors {
    #[error("latitude {0} rad is outside [-π/2, π/2]")]
    InvalidLatitude(f64),
    #[error("geodetic coordinates are undefined at the center of the earth")]
    AtEarthCenter,
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

/// Geodetic position, angles in radians and altitude in meters above the ellipsoid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Geodetic {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, GeodeticErrors> {
        validate_finite(&[latitude, longitude, altitude], 3)?;
        if latitude.abs() > FRAC_PI_2 {
            return Err(GeodeticErrors::InvalidLatitude(latitude));
        }
        Ok(Self { latitude, longitude, altitude })
    }

    pub fn from_degrees(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, GeodeticErrors> {
        Self::new(latitude.to_radians(), longitude.to_radians(), altitude)
    }
}

/// Earth-fixed cartesian position of a geodetic point.
pub fn geodetic_to_ecef(position: &Geodetic, ellipsoid: &Ellipsoid) -> Vector3<f64> {
    let a = ellipsoid.a();
    let e2 = ellipsoid.e2();
    let (sin_lat, cos_lat) = position.latitude.sin_cos();
    let (sin_lon, cos_lon) = position.longitude.sin_cos();

    // prime vertical radius of curvature
    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let h = position.altitude;

    Vector3::new(
        (n + h) * cos_lat * cos_lon,
        (n + h) * cos_lat * sin_lon,
        (n * (1.0 - e2) + h) * sin_lat,
    )
}

/// Geodetic coordinates of an earth-fixed position, Bowring (1976).
///
/// The fixed point iteration usually settles in two or three passes and is
/// capped at 1000.
pub fn ecef_to_geodetic(r: &Vector3<f64>, ellipsoid: &Ellipsoid) -> Result<Geodetic, GeodeticErrors> {
    validate_vector3(r)?;
    if r.norm() == 0.0 {
        return Err(GeodeticErrors::AtEarthCenter);
    }

    let a = ellipsoid.a();
    let b = ellipsoid.b();
    let f = ellipsoid.flattening;
    let e2 = ellipsoid.e2();
    // second eccentricity squared
    let ep2 = e2 / (1.0 - e2);

    let longitude = r[1].atan2(r[0]);
    let d = r[0].hypot(r[1]);

    let latitude_from = |beta: f64| {
        (r[2] + b * ep2 * beta.sin().powi(3)).atan2(d - a * e2 * beta.cos().powi(3))
    };
    let parametric_from = |phi: f64| ((1.0 - f) * phi.sin()).atan2(phi.cos());

    let mut beta = r[2].atan2((1.0 - f) * d);
    let mut phi = latitude_from(beta);
    let mut beta_new = parametric_from(phi);
    let mut count = 0;
    while beta != beta_new && count < MAX_ITERATIONS {
        beta = beta_new;
        phi = latitude_from(beta);
        beta_new = parametric_from(phi);
        count += 1;
    }
    if count == MAX_ITERATIONS {
        tracing::debug!(count, "geodetic latitude iteration hit the cap");
    }

    let sin_phi = phi.sin();
    let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let altitude = d * phi.cos() + (r[2] + e2 * n * sin_phi) * sin_phi - n;

    Ok(Geodetic {
        latitude: phi,
        longitude,
        altitude,
    })
}
