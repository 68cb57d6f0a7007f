use crate::edge::{ConstantRateRotation, Edge};
use crate::frame::Frame;
use crate::registry::{FrameErrors, FrameRegistry};
use crate::Transform;
use earth::{EARTH_ROTATION_RATE, Ellipsoid, Geodetic, geodetic_to_ecef};
use nalgebra::Vector3;
use rotations::prelude::*;
use std::f64::consts::FRAC_PI_2;

pub const ECI: &str = "ECI";
pub const ECEF: &str = "ECEF";

/// Registers `ECI` and `ECEF`, with ECEF rotated by `epoch_angle` about z at t = 0.
pub fn register_earth_frames(registry: &mut FrameRegistry, epoch_angle: f64) -> Result<(), FrameErrors> {
    registry.register(Frame::inertial(ECI))?;
    registry.register_child(Frame::rotating(ECEF), ECI, ecef_edge(epoch_angle))
}

pub fn ecef_edge(epoch_angle: f64) -> Edge {
    let initial = UnitQuaternion::from(&RotationMatrix::rot_z(epoch_angle));
    Edge::time_varying(ConstantRateRotation::new(
        initial,
        Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE),
    ))
}

/// ned_from_ecef with its origin at `origin`.
pub fn ned_edge(origin: &Geodetic, ellipsoid: &Ellipsoid) -> Transform {
    let rotation = RotationMatrix::rot_y(-FRAC_PI_2 - origin.latitude)
        .compose(&RotationMatrix::rot_z(origin.longitude));
    Transform::new(rotation.into(), geodetic_to_ecef(origin, ellipsoid))
}

/// enu_from_ecef with its origin at `origin`.
pub fn enu_edge(origin: &Geodetic, ellipsoid: &Ellipsoid) -> Transform {
    let rotation = RotationMatrix::rot_x(FRAC_PI_2)
        .compose(&RotationMatrix::rot_z(FRAC_PI_2))
        .compose(&RotationMatrix::rot_y(-origin.latitude))
        .compose(&RotationMatrix::rot_z(origin.longitude));
    Transform::new(rotation.into(), geodetic_to_ecef(origin, ellipsoid))
}
