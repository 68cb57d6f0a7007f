//! Rigid body state propagation and reference frame transformations for
//! offline GNC analysis.
//!
//! ```no_run
//! use gnc::prelude::*;
//! use nalgebra::Vector3;
//!
//! let mut registry = FrameRegistry::new();
//! registry.register(Frame::inertial("inertial")).unwrap();
//! registry
//!     .register_child(
//!         Frame::rotating("body"),
//!         "inertial",
//!         Edge::time_varying(ConstantRateRotation::new(
//!             UnitQuaternion::IDENTITY,
//!             Vector3::new(0.0, 0.0, 0.1),
//!         )),
//!     )
//!     .unwrap();
//! let frames = registry.seal().unwrap();
//!
//! let state = RigidBodyState::new("body").with_position(Vector3::new(1.0, 0.0, 0.0));
//! for state in propagate(state, ZeroDynamics, 10.0, FixedStepControl::new(0.1)).unwrap() {
//!     let inertial = frames.transform_state(&state.unwrap(), "inertial").unwrap();
//!     println!("{} {:?}", inertial.t, inertial.position);
//! }
//! ```

pub use earth;
pub use gravity;
pub use kinematics;
pub use propagator;
pub use rotations;
pub use tolerance;
pub use transforms;
pub use uncertainty;
pub use utilities;

pub mod prelude {
    pub use earth::{EARTH_MU, EARTH_ROTATION_RATE, Ellipsoid, Geodetic, ecef_to_geodetic, geodetic_to_ecef};
    pub use gravity::{Gravity, GravityErrors, GravityModel};
    pub use kinematics::{KinematicsErrors, KinematicsSettings, RigidBodyState};
    pub use propagator::prelude::*;
    pub use rotations::prelude::*;
    pub use transforms::prelude::*;
    pub use uncertainty::{Dispersion, UncertainValue, UncertainVector3, Uncertainty};
    pub use utilities::ValidationErrors;
}
