use super::*;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Below this the middle angle is treated as exactly singular and the
/// third angle is pinned to zero.
const SINGULAR: f64 = 1e-10;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EulerErrors {
    #[error("unknown euler sequence '{0}'")]
    UnknownSequence(String),
}

/// Axis order in which the three elementary rotations are applied.
/// `XYZ` rotates about x by φ, then the new y by θ, then the new z by ψ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EulerSequence {
    #[default]
    ZYX,
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    XYX,
    XZX,
    YXY,
    YZY,
    ZXZ,
    ZYZ,
}

impl EulerSequence {
    pub const ALL: [EulerSequence; 12] = [
        EulerSequence::ZYX,
        EulerSequence::XYZ,
        EulerSequence::XZY,
        EulerSequence::YXZ,
        EulerSequence::YZX,
        EulerSequence::ZXY,
        EulerSequence::XYX,
        EulerSequence::XZX,
        EulerSequence::YXY,
        EulerSequence::YZY,
        EulerSequence::ZXZ,
        EulerSequence::ZYZ,
    ];

    /// Axis indices (0 = x) in application order.
    pub fn axes(&self) -> (usize, usize, usize) {
        match self {
            EulerSequence::ZYX => (2, 1, 0),
            EulerSequence::XYZ => (0, 1, 2),
            EulerSequence::XZY => (0, 2, 1),
            EulerSequence::YXZ => (1, 0, 2),
            EulerSequence::YZX => (1, 2, 0),
            EulerSequence::ZXY => (2, 0, 1),
            EulerSequence::XYX => (0, 1, 0),
            EulerSequence::XZX => (0, 2, 0),
            EulerSequence::YXY => (1, 0, 1),
            EulerSequence::YZY => (1, 2, 1),
            EulerSequence::ZXZ => (2, 0, 2),
            EulerSequence::ZYZ => (2, 1, 2),
        }
    }

    /// Proper (symmetric) sequences repeat the first axis.
    pub fn is_proper(&self) -> bool {
        let (i, _, k) = self.axes();
        i == k
    }

    /// The sequence that undoes this one when the angles are negated and swapped.
    pub fn reversed(&self) -> EulerSequence {
        match self {
            EulerSequence::ZYX => EulerSequence::XYZ,
            EulerSequence::XYZ => EulerSequence::ZYX,
            EulerSequence::XZY => EulerSequence::YZX,
            EulerSequence::YZX => EulerSequence::XZY,
            EulerSequence::YXZ => EulerSequence::ZXY,
            EulerSequence::ZXY => EulerSequence::YXZ,
            proper => *proper,
        }
    }
}

impl fmt::Display for EulerSequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for EulerSequence {
    type Err = EulerErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        EulerSequence::ALL
            .into_iter()
            .find(|sequence| sequence.to_string() == upper)
            .ok_or(EulerErrors::UnknownSequence(s.to_string()))
    }
}

/// Three successive passive rotations, in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EulerAngles {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
    pub sequence: EulerSequence,
}

/// Result of extracting Euler angles from an attitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerConversion {
    pub angles: EulerAngles,
    /// The attitude sits within the gimbal tolerance of a singularity and
    /// the split between the first and third angles is not unique.
    pub degenerate: bool,
}

impl EulerAngles {
    pub fn new(phi: f64, theta: f64, psi: f64, sequence: EulerSequence) -> Self {
        Self { phi, theta, psi, sequence }
    }

    /// Whether the middle angle is within `epsilon` of gimbal lock,
    /// ±π/2 for Tait-Bryan sequences and 0 or π for proper ones.
    pub fn is_near_singularity(&self, epsilon: f64) -> bool {
        if self.sequence.is_proper() {
            let theta = self.theta.abs() % (2.0 * PI);
            theta < epsilon || (PI - theta).abs() < epsilon || (2.0 * PI - theta) < epsilon
        } else {
            (PI / 2.0 - self.theta.abs()).abs() < epsilon
        }
    }

    /// Extracts angles for `sequence` from a passive DCM.
    ///
    /// Tait-Bryan results have θ in [-π/2, π/2], proper results have θ in
    /// [0, π]. At an exact singularity ψ is set to zero and the whole
    /// rotation about the shared axis is carried by φ.
    pub fn from_dcm(c: &Matrix3<f64>, sequence: EulerSequence, gimbal_epsilon: f64) -> EulerConversion {
        let (i, j, third) = sequence.axes();
        let (phi, theta, psi) = if sequence.is_proper() {
            let k = 3 - i - j;
            let e = parity(i, j, k);
            let sin_theta = (c[(i, j)].powi(2) + c[(i, k)].powi(2)).sqrt();
            let theta = sin_theta.atan2(c[(i, i)]);
            if sin_theta > SINGULAR {
                (
                    c[(i, j)].atan2(-e * c[(i, k)]),
                    theta,
                    c[(j, i)].atan2(e * c[(k, i)]),
                )
            } else {
                ((e * c[(j, k)]).atan2(c[(j, j)]), theta, 0.0)
            }
        } else {
            let k = third;
            let e = parity(i, j, k);
            let cos_theta = (c[(k, j)].powi(2) + c[(k, k)].powi(2)).sqrt();
            let theta = (e * c[(k, i)]).atan2(cos_theta);
            if cos_theta > SINGULAR {
                (
                    (-e * c[(k, j)]).atan2(c[(k, k)]),
                    theta,
                    (-e * c[(j, i)]).atan2(c[(i, i)]),
                )
            } else {
                ((e * c[(j, k)]).atan2(c[(j, j)]), theta, 0.0)
            }
        };

        let angles = EulerAngles::new(phi, theta, psi, sequence);
        let degenerate = angles.is_near_singularity(gimbal_epsilon);
        if degenerate {
            tracing::warn!(%sequence, theta, "euler extraction near gimbal lock");
        }
        EulerConversion { angles, degenerate }
    }
}

/// +1 for cyclic axis orders (xyz, yzx, zxy), -1 otherwise.
fn parity(i: usize, j: usize, k: usize) -> f64 {
    match (i, j, k) {
        (0, 1, 2) | (1, 2, 0) | (2, 0, 1) => 1.0,
        _ => -1.0,
    }
}

impl RotationTrait for EulerAngles {
    fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        RotationMatrix::from(self).rotate(v)
    }

    fn transform(&self, v: &Vector3<f64>) -> Vector3<f64> {
        RotationMatrix::from(self).transform(v)
    }

    fn inv(&self) -> Self {
        Self {
            phi: -self.psi,
            theta: -self.theta,
            psi: -self.phi,
            sequence: self.sequence.reversed(),
        }
    }

    fn identity() -> Self {
        Self::default()
    }
}
