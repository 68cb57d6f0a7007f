use kinematics::RigidBodyState;
use nalgebra::Vector3;
use rotations::prelude::*;
use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

/// Number of components in a packed rigid body state.
pub const RIGID_BODY_STATES: usize = 13;

const POSITION: usize = 0;
const VELOCITY: usize = 3;
const QUATERNION: usize = 6;
const ANGULAR_VELOCITY: usize = 10;

/// A fixed-size array wrapper the integrator works on in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateArray<const N: usize>([f64; N]);

impl<const N: usize> StateArray<N> {
    pub fn new(array: [f64; N]) -> Self {
        Self(array)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }
}

impl<const N: usize> Default for StateArray<N> {
    fn default() -> Self {
        Self([0.0; N])
    }
}

impl<const N: usize> AddAssign<&Self> for StateArray<N> {
    fn add_assign(&mut self, rhs: &Self) {
        for i in 0..N {
            self.0[i] += rhs.0[i];
        }
    }
}

impl<const N: usize> MulAssign<f64> for StateArray<N> {
    fn mul_assign(&mut self, rhs: f64) {
        for i in 0..N {
            self.0[i] *= rhs;
        }
    }
}

impl<const N: usize> Deref for StateArray<N> {
    type Target = [f64; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for StateArray<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Packed layout `[r, v, q, ω]` with the quaternion scalar last.
pub type RigidBodyArray = StateArray<RIGID_BODY_STATES>;

impl StateArray<RIGID_BODY_STATES> {
    pub fn from_state(state: &RigidBodyState) -> Self {
        let mut x = Self::default();
        x.set_vector3(POSITION, &state.position);
        x.set_vector3(VELOCITY, &state.velocity);
        let q = state.attitude.quaternion();
        x[QUATERNION..QUATERNION + 4].copy_from_slice(&[q.x, q.y, q.z, q.w]);
        x.set_vector3(ANGULAR_VELOCITY, &state.angular_velocity);
        x
    }

    pub fn position(&self) -> Vector3<f64> {
        self.vector3(POSITION)
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.vector3(VELOCITY)
    }

    /// Raw, possibly non-unit, attitude quaternion.
    pub fn quaternion(&self) -> Quaternion {
        Quaternion::new(
            self[QUATERNION],
            self[QUATERNION + 1],
            self[QUATERNION + 2],
            self[QUATERNION + 3],
        )
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.vector3(ANGULAR_VELOCITY)
    }

    pub fn set_position(&mut self, v: &Vector3<f64>) {
        self.set_vector3(POSITION, v);
    }

    pub fn set_velocity(&mut self, v: &Vector3<f64>) {
        self.set_vector3(VELOCITY, v);
    }

    pub fn set_quaternion(&mut self, q: &Quaternion) {
        self[QUATERNION..QUATERNION + 4].copy_from_slice(&[q.x, q.y, q.z, q.w]);
    }

    pub fn set_angular_velocity(&mut self, v: &Vector3<f64>) {
        self.set_vector3(ANGULAR_VELOCITY, v);
    }

    fn vector3(&self, start: usize) -> Vector3<f64> {
        Vector3::new(self[start], self[start + 1], self[start + 2])
    }

    fn set_vector3(&mut self, start: usize, v: &Vector3<f64>) {
        self[start..start + 3].copy_from_slice(v.as_slice());
    }
}
