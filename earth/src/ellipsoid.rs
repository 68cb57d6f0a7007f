use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EllipsoidErrors {
    #[error("'{name}' is not a valid ellipsoid model name, available names are ({available})")]
    UnknownEllipsoid { name: String, available: String },
    #[error("semi major axis must be positive and finite, got {0}")]
    InvalidSemiMajorAxis(f64),
    #[error("flattening must be in [0, 1), got {0}")]
    InvalidFlattening(f64),
}

/// Reference ellipsoid of revolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub name: String,
    /// m
    pub semi_major_axis: f64,
    pub flattening: f64,
    pub j2: f64,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Ellipsoid {
    pub const AVAILABLE: [&'static str; 2] = ["WGS84", "Spherical Earth"];

    pub fn new(
        name: impl Into<String>,
        semi_major_axis: f64,
        flattening: f64,
        j2: f64,
    ) -> Result<Self, EllipsoidErrors> {
        if !semi_major_axis.is_finite() || semi_major_axis <= 0.0 {
            return Err(EllipsoidErrors::InvalidSemiMajorAxis(semi_major_axis));
        }
        if !(0.0..1.0).contains(&flattening) {
            return Err(EllipsoidErrors::InvalidFlattening(flattening));
        }
        Ok(Self {
            name: name.into(),
            semi_major_axis,
            flattening,
            j2,
        })
    }

    pub fn wgs84() -> Self {
        Self {
            name: "WGS84".to_string(),
            semi_major_axis: 6378137.0,
            flattening: 1.0 / 298.257223563,
            j2: 1.08263e-3,
        }
    }

    pub fn spherical_earth() -> Self {
        Self {
            name: "Spherical Earth".to_string(),
            semi_major_axis: 6371127.0,
            flattening: 0.0,
            j2: 0.0,
        }
    }

    pub fn by_name(name: &str) -> Result<Self, EllipsoidErrors> {
        match name {
            "WGS84" => Ok(Self::wgs84()),
            "Spherical Earth" => Ok(Self::spherical_earth()),
            _ => Err(EllipsoidErrors::UnknownEllipsoid {
                name: name.to_string(),
                available: Self::AVAILABLE.join(", "),
            }),
        }
    }

    pub fn a(&self) -> f64 {
        self.semi_major_axis
    }

    /// Semi minor axis, m
    pub fn b(&self) -> f64 {
        (1.0 - self.flattening) * self.semi_major_axis
    }

    /// First eccentricity
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    pub fn e2(&self) -> f64 {
        let a = self.semi_major_axis;
        let b = self.b();
        (a * a - b * b) / (a * a)
    }

    pub fn mean_radius(&self) -> f64 {
        (2.0 * self.semi_major_axis + self.b()) / 3.0
    }
}
