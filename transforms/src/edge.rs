use crate::Transform;
use kinematics::propagate_constant_rate;
use nalgebra::Vector3;
use rotations::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Step used to differentiate user supplied edge functions, s
const DIFFERENCE_STEP: f64 = 1e-6;

/// Relative kinematics of child frame B with respect to parent frame A at an instant.
#[derive(Debug, Clone, Copy)]
pub struct EdgeState {
    /// b_from_a
    pub transform: Transform,
    /// Angular velocity of B relative to A, in B axes.
    pub angular_velocity: Vector3<f64>,
    /// Rate of change of B's origin, in A axes.
    pub origin_velocity: Vector3<f64>,
}

impl EdgeState {
    pub fn fixed(transform: Transform) -> Self {
        Self {
            transform,
            angular_velocity: Vector3::zeros(),
            origin_velocity: Vector3::zeros(),
        }
    }

    /// The same relation seen from B, i.e. a_from_b and its rates.
    pub fn inv(&self) -> Self {
        let c = &self.transform.rotation;
        let t_in_b = c.transform(&self.transform.translation);
        Self {
            transform: self.transform.inv(),
            angular_velocity: -c.rotate(&self.angular_velocity),
            origin_velocity: self.angular_velocity.cross(&t_in_b)
                - c.transform(&self.origin_velocity),
        }
    }

    /// `c_from_b.compose(&b_from_a)` gives c_from_a, mirroring `Transform` multiplication.
    pub fn compose(&self, b_from_a: &EdgeState) -> Self {
        let c_from_b = self;
        let rotation_ab = &b_from_a.transform.rotation;
        Self {
            transform: c_from_b.transform * b_from_a.transform,
            angular_velocity: c_from_b.angular_velocity
                + c_from_b
                    .transform
                    .rotation
                    .transform(&b_from_a.angular_velocity),
            origin_velocity: b_from_a.origin_velocity
                + rotation_ab.rotate(
                    &(c_from_b.origin_velocity
                        + b_from_a
                            .angular_velocity
                            .cross(&c_from_b.transform.translation)),
                ),
        }
    }
}

/// A time parameterized relation between two frames.
pub trait EdgeModel: fmt::Debug + Send + Sync {
    fn state_at(&self, t: f64) -> EdgeState;
}

/// Edge payload: a fixed transform or a model evaluated at a time.
#[derive(Debug, Clone)]
pub enum Edge {
    Constant(Transform),
    TimeVarying(Arc<dyn EdgeModel>),
}

impl Edge {
    pub fn constant(transform: Transform) -> Self {
        Edge::Constant(transform)
    }

    pub fn time_varying(model: impl EdgeModel + 'static) -> Self {
        Edge::TimeVarying(Arc::new(model))
    }

    pub fn is_time_varying(&self) -> bool {
        matches!(self, Edge::TimeVarying(_))
    }

    pub fn state_at(&self, t: f64) -> EdgeState {
        match self {
            Edge::Constant(transform) => EdgeState::fixed(*transform),
            Edge::TimeVarying(model) => model.state_at(t),
        }
    }
}

impl From<Transform> for Edge {
    fn from(value: Transform) -> Self {
        Edge::Constant(value)
    }
}

/// Child frame spinning at a constant body-axis rate about a fixed origin.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRateRotation {
    /// b_from_a at `epoch`
    pub initial: UnitQuaternion,
    /// Rate of B relative to A, in B axes, rad/s
    pub rate: Vector3<f64>,
    pub epoch: f64,
    /// Origin of B in A
    pub translation: Vector3<f64>,
}

impl ConstantRateRotation {
    pub fn new(initial: UnitQuaternion, rate: Vector3<f64>) -> Self {
        Self {
            initial,
            rate,
            epoch: 0.0,
            translation: Vector3::zeros(),
        }
    }

    pub fn with_epoch(mut self, epoch: f64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_translation(mut self, translation: Vector3<f64>) -> Self {
        self.translation = translation;
        self
    }
}

impl EdgeModel for ConstantRateRotation {
    fn state_at(&self, t: f64) -> EdgeState {
        let q = propagate_constant_rate(&self.initial, &self.rate, t - self.epoch);
        EdgeState {
            transform: Transform::new(q.into(), self.translation),
            angular_velocity: self.rate,
            origin_velocity: Vector3::zeros(),
        }
    }
}

/// Wraps a closure `t -> b_from_a`. Rates are estimated by central differences.
pub struct EdgeFn<F>
where
    F: Fn(f64) -> Transform + Send + Sync,
{
    f: F,
}

impl<F> EdgeFn<F>
where
    F: Fn(f64) -> Transform + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for EdgeFn<F>
where
    F: Fn(f64) -> Transform + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EdgeFn")
    }
}

impl<F> EdgeModel for EdgeFn<F>
where
    F: Fn(f64) -> Transform + Send + Sync,
{
    fn state_at(&self, t: f64) -> EdgeState {
        let h = DIFFERENCE_STEP;
        let now = (self.f)(t);
        let plus = (self.f)(t + h);
        let minus = (self.f)(t - h);

        // q(t+h) = q_rv(2hω) * q(t-h) for a rate ω held over the interval
        let q_plus = plus.rotation.to_quaternion();
        let q_minus = minus.rotation.to_quaternion();
        let delta = q_plus.compose(&q_minus.inv());
        let angular_velocity = RotationVector::from(&delta).vector() / (2.0 * h);

        EdgeState {
            transform: now,
            angular_velocity,
            origin_velocity: (plus.translation - minus.translation) / (2.0 * h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spinning() -> ConstantRateRotation {
        ConstantRateRotation::new(
            UnitQuaternion::from_axis_angle(&Vector3::x(), 0.3).unwrap(),
            Vector3::new(0.1, -0.2, 0.3),
        )
        .with_translation(Vector3::new(1.0, 2.0, 3.0))
    }

    #[test]
    fn test_constant_rate_rotation() {
        let edge = ConstantRateRotation::new(UnitQuaternion::IDENTITY, Vector3::new(0.0, 0.0, 0.1));
        let state = edge.state_at(10.0);
        let expected = RotationMatrix::rot_z(1.0).get_value();
        assert_abs_diff_eq!(state.transform.rotation.to_dcm().get_value(), expected, epsilon = 1e-12);
        assert_eq!(state.angular_velocity, Vector3::new(0.0, 0.0, 0.1));
    }

    #[test]
    fn test_edge_fn_recovers_rates() {
        let model = spinning();
        let closure = EdgeFn::new(move |t| {
            let mut transform = model.state_at(t).transform;
            transform.translation += Vector3::new(0.5, 0.0, -0.25) * t;
            transform
        });
        let state = closure.state_at(2.0);
        assert_abs_diff_eq!(state.angular_velocity, model.rate, epsilon = 1e-6);
        assert_abs_diff_eq!(state.origin_velocity, Vector3::new(0.5, 0.0, -0.25), epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_of_inverse() {
        let state = spinning().state_at(1.5);
        let back = state.inv().inv();
        assert_abs_diff_eq!(back.angular_velocity, state.angular_velocity, epsilon = 1e-12);
        assert_abs_diff_eq!(back.origin_velocity, state.origin_velocity, epsilon = 1e-12);
        assert_abs_diff_eq!(back.transform.translation, state.transform.translation, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_with_inverse_has_no_motion() {
        let state = spinning().state_at(0.7);
        let round_trip = state.inv().compose(&state);
        assert_abs_diff_eq!(round_trip.angular_velocity, Vector3::zeros(), epsilon = 1e-12);
        assert_abs_diff_eq!(round_trip.origin_velocity, Vector3::zeros(), epsilon = 1e-12);
        assert_abs_diff_eq!(round_trip.transform.translation, Vector3::zeros(), epsilon = 1e-12);
    }
}
