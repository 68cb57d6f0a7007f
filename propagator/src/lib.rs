//! Numerical propagation of rigid body states.
//!
//! [`propagate`] returns a lazy [`Trajectory`] that integrates translational and
//! rotational motion under a user supplied [`Dynamics`] model, either with
//! classical RK4 at a fixed step or with Dormand-Prince 5(4) and local error
//! control.

pub mod config;
pub mod dynamics;
pub mod monte_carlo;
pub mod rk;
pub mod state_array;
pub mod stepping;
pub mod tableau;
pub mod trajectory;

use kinematics::{KinematicsErrors, RigidBodyState};
use thiserror::Error;
use utilities::ValidationErrors;

pub use config::{ConfigErrors, PropagatorConfig};
pub use dynamics::{
    Accelerations, Dynamics, DynamicsError, DynamicsErrors, DynamicsFn, GravityDynamics, TorqueFree,
    ZeroDynamics,
};
pub use monte_carlo::{MonteCarlo, MonteCarloErrors, MonteCarloRun, Nominal, RigidBodyStateBuilder};
pub use stepping::{AdaptiveStepControl, FixedStepControl, StepPolicy};
pub use trajectory::{Checkpoint, PropagationStats, PropagatorStatus, Trajectory, interpolate};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::dynamics::*;
    pub use crate::monte_carlo::*;
    pub use crate::stepping::*;
    pub use crate::trajectory::*;
    pub use crate::{PropagationErrors, Propagator, propagate};
}

/// Fatal propagation failures. Failures during stepping carry the last valid state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PropagationErrors {
    #[error("step at t = {t} did not meet tolerance after {retries} retries (dt = {dt})")]
    StepDivergence {
        t: f64,
        dt: f64,
        retries: usize,
        last_state: Box<RigidBodyState>,
    },
    #[error("state became non-finite during the step from t = {t} (dt = {dt})")]
    NonFiniteState {
        t: f64,
        dt: f64,
        last_state: Box<RigidBodyState>,
    },
    #[error("{source} (last valid state at t = {})", last_state.t)]
    InvalidAngularVelocity {
        source: KinematicsErrors,
        last_state: Box<RigidBodyState>,
    },
    #[error("dynamics failed: {message} (last valid state at t = {})", last_state.t)]
    Dynamics {
        message: String,
        last_state: Box<RigidBodyState>,
    },
    #[error("cannot propagate from t = {start} to t = {end}")]
    InvalidTimeSpan { start: f64, end: f64 },
    #[error("invalid step policy: {0}")]
    InvalidStepPolicy(String),
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl PropagationErrors {
    pub fn last_state(&self) -> Option<&RigidBodyState> {
        match self {
            PropagationErrors::StepDivergence { last_state, .. }
            | PropagationErrors::NonFiniteState { last_state, .. }
            | PropagationErrors::InvalidAngularVelocity { last_state, .. }
            | PropagationErrors::Dynamics { last_state, .. } => Some(last_state.as_ref()),
            _ => None,
        }
    }
}

/// Propagates `initial_state` to `t_end` with default tolerances.
pub fn propagate<D: Dynamics>(
    initial_state: RigidBodyState,
    dynamics: D,
    t_end: f64,
    step_policy: impl Into<StepPolicy>,
) -> Result<Trajectory<D>, PropagationErrors> {
    Trajectory::new(
        initial_state,
        dynamics,
        t_end,
        PropagatorConfig::new(step_policy),
    )
}

/// A dynamics model bound to a configuration, reusable across runs.
#[derive(Debug, Clone)]
pub struct Propagator<D: Dynamics> {
    pub dynamics: D,
    pub config: PropagatorConfig,
}

impl<D: Dynamics> Propagator<D> {
    pub fn new(dynamics: D, config: PropagatorConfig) -> Self {
        Self { dynamics, config }
    }

    pub fn propagate(&self, initial_state: RigidBodyState, t_end: f64) -> Result<Trajectory<&D>, PropagationErrors> {
        Trajectory::new(initial_state, &self.dynamics, t_end, self.config)
    }

    /// Continues from a checkpoint without re-running earlier steps.
    pub fn resume(&self, checkpoint: Checkpoint, t_end: f64) -> Result<Trajectory<&D>, PropagationErrors> {
        let mut trajectory = Trajectory::new(checkpoint.state.clone(), &self.dynamics, t_end, self.config)?;
        trajectory.restart_from(checkpoint)?;
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix3, Vector3};
    use rotations::prelude::*;

    fn tumbling() -> (TorqueFree, RigidBodyState) {
        let body = TorqueFree::new(Matrix3::new(10.0, 0.5, -0.2, 0.5, 20.0, 0.3, -0.2, 0.3, 30.0)).unwrap();
        let state = RigidBodyState::new("inertial")
            .with_attitude(UnitQuaternion::from_axis_angle(&Vector3::new(1.0, -1.0, 0.5), 0.4).unwrap())
            .with_rates(Vector3::new(0.1, 0.2, 0.3));
        (body, state)
    }

    fn spring() -> DynamicsFn<impl Fn(&RigidBodyState, f64) -> Result<Accelerations, DynamicsError>> {
        // lightly damped oscillator, ω0 = 20 rad/s
        DynamicsFn(|state: &RigidBodyState, _t: f64| -> Result<Accelerations, DynamicsError> {
            Ok(Accelerations::new(
                -400.0 * state.position - 0.5 * state.velocity,
                Vector3::zeros(),
            ))
        })
    }

    #[test]
    fn test_first_and_last_states() {
        let (body, state) = tumbling();
        let states: Vec<_> = propagate(state.clone(), body, 1.05, FixedStepControl::new(0.1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(states[0], state);
        assert_eq!(states.len(), 12);
        assert_eq!(states.last().unwrap().t, 1.05);
        assert!(states.windows(2).all(|w| w[1].t > w[0].t));
        for s in &states {
            assert_abs_diff_eq!(s.attitude.quaternion().mag(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_torque_free_conserves_momentum() {
        let (body, state) = tumbling();
        let h0 = body.angular_momentum(&state.angular_velocity).norm();
        let e0 = body.rotational_energy(&state.angular_velocity);

        let mut trajectory = propagate(state, body, 10.0, FixedStepControl::new(0.01)).unwrap();
        let last = trajectory.by_ref().last().unwrap().unwrap();
        assert_eq!(trajectory.stats().accepted, 1000);
        assert_eq!(trajectory.stats().evaluations, 4000);
        assert_eq!(trajectory.status(), PropagatorStatus::Converged);

        let h = body.angular_momentum(&last.angular_velocity).norm();
        let e = body.rotational_energy(&last.angular_velocity);
        assert!(((h - h0) / h0).abs() < 1e-6);
        assert!(((e - e0) / e0).abs() < 1e-6);
    }

    #[test]
    fn test_inertial_momentum_direction_is_fixed() {
        let (body, state) = tumbling();
        let inertial = |s: &RigidBodyState| s.attitude.rotate(&body.angular_momentum(&s.angular_velocity));
        let h0 = inertial(&state);
        let last = propagate(state, body, 5.0, AdaptiveStepControl::default().with_rel_tol(1e-10).with_abs_tol(1e-12))
            .unwrap()
            .last()
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(inertial(&last), h0, epsilon = 1e-7);
    }

    #[test]
    fn test_fixed_step_is_deterministic() {
        let run = || {
            let (body, state) = tumbling();
            propagate(state, body, 3.0, FixedStepControl::new(0.05))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_adaptive_halves_and_matches_fixed_reference() {
        let initial = RigidBodyState::new("inertial").with_position(Vector3::new(1.0, 0.0, 0.0));
        let control = AdaptiveStepControl::default()
            .with_initial_dt(1.0)
            .with_rel_tol(1e-10)
            .with_abs_tol(1e-12);

        let mut adaptive = propagate(initial.clone(), spring(), 2.0, control).unwrap();
        let adaptive_end = adaptive.by_ref().last().unwrap().unwrap();
        assert!(adaptive.stats().rejected >= 1);
        assert_eq!(adaptive_end.t, 2.0);

        let reference = propagate(initial, spring(), 2.0, FixedStepControl::new(1e-4))
            .unwrap()
            .last()
            .unwrap()
            .unwrap();
        assert_abs_diff_eq!(adaptive_end.position, reference.position, epsilon = 1e-6);
        assert_abs_diff_eq!(adaptive_end.velocity, reference.velocity, epsilon = 1e-5);
    }

    #[test]
    fn test_step_divergence_carries_last_state() {
        let initial = RigidBodyState::new("inertial").with_position(Vector3::new(1.0, 0.0, 0.0));
        let control = AdaptiveStepControl::default()
            .with_initial_dt(1.0)
            .with_rel_tol(1e-12)
            .with_abs_tol(1e-14)
            .with_max_retries(2);
        let mut trajectory = propagate(initial.clone(), spring(), 2.0, control).unwrap();
        assert_eq!(trajectory.next().unwrap().unwrap(), initial);
        match trajectory.next() {
            Some(Err(error @ PropagationErrors::StepDivergence { retries: 3, .. })) => {
                assert_eq!(error.last_state(), Some(&initial));
            }
            other => panic!("expected divergence, got {other:?}"),
        }
        assert_eq!(trajectory.status(), PropagatorStatus::Diverged);
        assert_eq!(trajectory.stats().rejected, 3);
        assert!(trajectory.next().is_none());
    }

    #[test]
    fn test_adaptive_recovers_from_non_finite_trial_step() {
        // harmonic oscillator with amplitude 1 whose force is undefined past 1.05,
        // an oversized first step overshoots into that region
        let bounded = DynamicsFn(|state: &RigidBodyState, _t: f64| -> Result<Accelerations, DynamicsError> {
            let linear = if state.position.norm() <= 1.05 {
                -state.position
            } else {
                Vector3::repeat(f64::INFINITY)
            };
            Ok(Accelerations::new(linear, Vector3::zeros()))
        });
        let initial = RigidBodyState::new("inertial").with_velocity(Vector3::new(1.0, 0.0, 0.0));
        let control = AdaptiveStepControl::default()
            .with_initial_dt(3.0)
            .with_rel_tol(1e-10)
            .with_abs_tol(1e-12);

        let mut trajectory = propagate(initial, bounded, 3.0, control).unwrap();
        let last = trajectory.by_ref().last().unwrap().unwrap();
        assert_eq!(trajectory.status(), PropagatorStatus::Converged);
        assert!(trajectory.stats().rejected >= 1);
        assert_eq!(last.t, 3.0);
        assert_abs_diff_eq!(last.position[0], 3.0f64.sin(), epsilon = 1e-8);
        assert_abs_diff_eq!(last.velocity[0], 3.0f64.cos(), epsilon = 1e-8);
    }

    #[test]
    fn test_adaptive_steps_never_exceed_max_dt() {
        let control = AdaptiveStepControl::default().with_initial_dt(10.0).with_max_dt(1.0);
        let states: Vec<_> = propagate(RigidBodyState::new("a"), ZeroDynamics, 20.0, control)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(states.len(), 21);
        for w in states.windows(2) {
            assert!(w[1].t - w[0].t <= 1.0 + 1e-12, "step {}", w[1].t - w[0].t);
        }

        // a checkpoint carrying a larger step is clamped as well
        let propagator = Propagator::new(ZeroDynamics, PropagatorConfig::new(control));
        let checkpoint = Checkpoint {
            state: RigidBodyState::new("a").with_time(2.0),
            dt: 8.0,
        };
        let resumed: Vec<_> = propagator
            .resume(checkpoint, 5.0)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(resumed.iter().map(|s| s.t).collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_fixed_step_reports_non_finite_state() {
        let runaway = DynamicsFn(|_: &RigidBodyState, t: f64| -> Result<Accelerations, DynamicsError> {
            let a = if t > 0.25 { f64::INFINITY } else { 0.0 };
            Ok(Accelerations::new(Vector3::new(a, 0.0, 0.0), Vector3::zeros()))
        });
        let results: Vec<_> = propagate(RigidBodyState::new("a"), runaway, 1.0, FixedStepControl::new(0.1))
            .unwrap()
            .collect();
        match results.last() {
            Some(Err(error @ PropagationErrors::NonFiniteState { .. })) => {
                assert!(error.to_string().contains("non-finite"));
                assert!(!error.to_string().contains("tolerance"));
                assert!(error.last_state().unwrap().t < 0.25 + 1e-12);
            }
            other => panic!("expected a non-finite state, got {other:?}"),
        }
    }

    #[test]
    fn test_angular_velocity_bound() {
        let spin_up = DynamicsFn(|_: &RigidBodyState, _t: f64| -> Result<Accelerations, DynamicsError> {
            Ok(Accelerations::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 30.0)))
        });
        let initial = RigidBodyState::new("inertial");
        let results: Vec<_> = propagate(initial, spin_up, 10.0, FixedStepControl::new(0.1))
            .unwrap()
            .collect();
        let Some(Err(error)) = results.last() else {
            panic!("expected a failure");
        };
        assert!(matches!(error, PropagationErrors::InvalidAngularVelocity { .. }));
        // 100 rad/s is crossed during the step from 3.3 s to 3.4 s
        let last = error.last_state().unwrap();
        assert_abs_diff_eq!(last.t, 3.3, epsilon = 1e-9);
        assert!(last.angular_velocity.norm() <= 100.0);
    }

    #[test]
    fn test_dynamics_failure() {
        let failing = DynamicsFn(|_: &RigidBodyState, t: f64| -> Result<Accelerations, DynamicsError> {
            if t > 0.55 {
                Err("actuator model out of range".into())
            } else {
                Ok(Accelerations::default())
            }
        });
        let results: Vec<_> = propagate(RigidBodyState::new("a"), failing, 1.0, FixedStepControl::new(0.1))
            .unwrap()
            .collect();
        match results.last() {
            Some(Err(PropagationErrors::Dynamics { message, last_state })) => {
                assert!(message.contains("out of range"));
                assert_abs_diff_eq!(last_state.t, 0.5, epsilon = 1e-12);
            }
            other => panic!("expected dynamics failure, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_time_span() {
        let state = RigidBodyState::new("a").with_time(5.0);
        assert!(matches!(
            propagate(state.clone(), ZeroDynamics, 4.0, FixedStepControl::new(0.1)),
            Err(PropagationErrors::InvalidTimeSpan { .. })
        ));
        assert!(matches!(
            propagate(state.clone(), ZeroDynamics, f64::NAN, FixedStepControl::new(0.1)),
            Err(PropagationErrors::InvalidTimeSpan { .. })
        ));
        // zero length span yields only the initial state
        let states: Vec<_> = propagate(state.clone(), ZeroDynamics, 5.0, FixedStepControl::new(0.1))
            .unwrap()
            .collect();
        assert_eq!(states, vec![Ok(state)]);
    }

    #[test]
    fn test_checkpoint_resume() {
        let (body, state) = tumbling();
        let propagator = Propagator::new(body, PropagatorConfig::new(FixedStepControl::new(0.1)));
        let full: Vec<_> = propagator
            .propagate(state.clone(), 2.0)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let mut trajectory = propagator.propagate(state, 2.0).unwrap();
        assert!(trajectory.checkpoint().is_none());
        assert_eq!(trajectory.status(), PropagatorStatus::Idle);
        for _ in 0..8 {
            trajectory.next().unwrap().unwrap();
        }
        let checkpoint = trajectory.checkpoint().unwrap();
        assert_eq!(checkpoint.state, full[7]);

        let resumed: Vec<_> = propagator
            .resume(checkpoint.clone(), 2.0)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(resumed, full[8..].to_vec());

        // rewinding the original trajectory replays the same states
        let rest: Vec<_> = trajectory.by_ref().collect::<Result<_, _>>().unwrap();
        trajectory.restart_from(checkpoint).unwrap();
        assert_eq!(trajectory.status(), PropagatorStatus::Idle);
        let replay: Vec<_> = trajectory.collect::<Result<_, _>>().unwrap();
        assert_eq!(replay, rest);
    }

    #[test]
    fn test_interpolate() {
        let a = RigidBodyState::new("a").with_position(Vector3::new(0.0, 0.0, 0.0));
        let b = RigidBodyState::new("a")
            .with_position(Vector3::new(2.0, 0.0, 0.0))
            .with_attitude(UnitQuaternion::from_axis_angle(&Vector3::z(), 1.0).unwrap())
            .with_time(4.0);
        let mid = interpolate(&a, &b, 0.5);
        assert_eq!(mid.t, 2.0);
        assert_abs_diff_eq!(mid.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-15);
        assert_abs_diff_eq!(mid.attitude.angle_to(&a.attitude), 0.5, epsilon = 1e-12);
    }
}
