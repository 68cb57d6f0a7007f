use crate::config::PropagatorConfig;
use crate::dynamics::Dynamics;
use crate::rk::RungeKutta;
use crate::state_array::{RIGID_BODY_STATES, RigidBodyArray};
use crate::stepping::{AdaptiveStepControl, StepPolicy};
use crate::tableau::ButcherTableau;
use crate::PropagationErrors;
use kinematics::{KinematicsErrors, RigidBodyState, quaternion_derivative};
use rotations::prelude::*;
use serde::{Deserialize, Serialize};
use tolerance::rms_error;

/// Relative spacing below which the remaining interval is folded into the current step.
const END_TIME_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropagatorStatus {
    /// Nothing has been stepped since the trajectory was created or rewound.
    Idle,
    Stepping,
    Converged,
    Diverged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationStats {
    pub accepted: usize,
    /// Steps halved and retried.
    pub rejected: usize,
    pub evaluations: usize,
}

/// A state the trajectory has emitted, together with the step size in use at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: RigidBodyState,
    pub dt: f64,
}

/// Why a derivative evaluation could not complete.
enum EvaluationFailure {
    NonFinite,
    Kinematics(KinematicsErrors),
    Dynamics(String),
}

#[derive(Debug, Clone)]
enum Stepper {
    Rk4(RungeKutta<RIGID_BODY_STATES, 4>),
    DormandPrince(RungeKutta<RIGID_BODY_STATES, 7>),
}

/// Lazily produced sequence of states from the initial time to `t_end`.
///
/// The first item is the initial state and the last lands exactly on `t_end`.
/// After an error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Trajectory<D: Dynamics> {
    dynamics: D,
    config: PropagatorConfig,
    stepper: Stepper,
    current: RigidBodyState,
    t_end: f64,
    dt: f64,
    status: PropagatorStatus,
    stats: PropagationStats,
    emit_current: bool,
    emitted: bool,
}

impl<D: Dynamics> Trajectory<D> {
    pub(crate) fn new(
        initial: RigidBodyState,
        dynamics: D,
        t_end: f64,
        config: PropagatorConfig,
    ) -> Result<Self, PropagationErrors> {
        initial.validate()?;
        check_time_span(initial.t, t_end)?;
        config
            .step_policy
            .validate()
            .map_err(PropagationErrors::InvalidStepPolicy)?;

        let stepper = match config.step_policy {
            StepPolicy::Fixed(_) => Stepper::Rk4(RungeKutta::new(ButcherTableau::<4>::RK4)),
            StepPolicy::Adaptive(_) => {
                Stepper::DormandPrince(RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45))
            }
        };
        Ok(Self {
            dynamics,
            stepper,
            dt: config.step_policy.initial_dt(),
            config,
            current: initial,
            t_end,
            status: PropagatorStatus::Idle,
            stats: PropagationStats::default(),
            emit_current: true,
            emitted: false,
        })
    }

    pub fn status(&self) -> PropagatorStatus {
        self.status
    }

    pub fn stats(&self) -> PropagationStats {
        self.stats
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    /// The last state handed out, with the step size the next step would try.
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.emitted.then(|| Checkpoint {
            state: self.current.clone(),
            dt: self.dt,
        })
    }

    /// Rewinds (or fast forwards) to a previously emitted state. The
    /// checkpoint state itself is not emitted again.
    pub fn restart_from(&mut self, checkpoint: Checkpoint) -> Result<(), PropagationErrors> {
        checkpoint.state.validate()?;
        check_time_span(checkpoint.state.t, self.t_end)?;
        if !(checkpoint.dt > 0.0 && checkpoint.dt.is_finite()) {
            return Err(PropagationErrors::InvalidStepPolicy(format!(
                "checkpoint step size must be positive and finite, got {}",
                checkpoint.dt
            )));
        }
        let dt = match self.config.step_policy {
            StepPolicy::Adaptive(control) => control.clamp_dt(checkpoint.dt),
            StepPolicy::Fixed(_) => checkpoint.dt,
        };
        tracing::debug!(t = checkpoint.state.t, dt, "restarting from checkpoint");
        self.current = checkpoint.state;
        self.dt = dt;
        self.status = PropagatorStatus::Idle;
        self.emit_current = false;
        self.emitted = true;
        Ok(())
    }

    fn emit(&mut self, state: RigidBodyState) -> RigidBodyState {
        self.current = state;
        self.emitted = true;
        self.status = if self.current.t >= self.t_end {
            tracing::debug!(
                accepted = self.stats.accepted,
                rejected = self.stats.rejected,
                evaluations = self.stats.evaluations,
                "propagation converged"
            );
            PropagatorStatus::Converged
        } else {
            PropagatorStatus::Stepping
        };
        self.current.clone()
    }

    fn fail(&mut self, error: PropagationErrors) -> PropagationErrors {
        tracing::warn!(t = self.current.t, %error, "propagation diverged");
        self.status = PropagatorStatus::Diverged;
        error
    }

    /// Length of the next attempted step, landing on `t_end` when close.
    fn clip(&self, dt: f64) -> f64 {
        let remaining = self.t_end - self.current.t;
        if remaining <= dt * (1.0 + END_TIME_SLACK) {
            remaining
        } else {
            dt
        }
    }

    fn step(&mut self) -> Result<RigidBodyState, PropagationErrors> {
        let x = RigidBodyArray::from_state(&self.current);
        let t = self.current.t;

        match self.config.step_policy {
            StepPolicy::Fixed(_) => {
                let h = self.clip(self.dt);
                let y = self.attempt(&x, t, h)?.0;
                self.stats.accepted += 1;
                self.finish(&y, t, h)
            }
            StepPolicy::Adaptive(control) => self.adaptive_step(&x, t, &control),
        }
    }

    fn adaptive_step(
        &mut self,
        x: &RigidBodyArray,
        t: f64,
        control: &AdaptiveStepControl,
    ) -> Result<RigidBodyState, PropagationErrors> {
        let mut dt = self.dt;
        let mut retries = 0;
        loop {
            let h = self.clip(dt);
            let (y, error) = match self.attempt(x, t, h) {
                Ok((y, y_err)) => {
                    let error = if y.is_finite() {
                        rms_error(&*y, &**x, &*y_err, control.rel_tol, control.abs_tol)
                    } else {
                        f64::INFINITY
                    };
                    (y, error)
                }
                // a step that blows up is treated as a failed error test
                Err(PropagationErrors::NonFiniteState { .. }) => (*x, f64::INFINITY),
                Err(e) => return Err(e),
            };

            if error <= 1.0 {
                self.stats.accepted += 1;
                // a step clipped to land on t_end says nothing about the next step size
                if h == dt {
                    self.dt = control.next_dt(h, error, ButcherTableau::<7>::DORMANDPRINCE45.error_order);
                }
                return self.finish(&y, t, h);
            }

            self.stats.rejected += 1;
            retries += 1;
            dt = h / 2.0;
            tracing::debug!(t, h, error, retries, "step rejected");

            let below_min = control.min_dt.is_some_and(|min_dt| dt < min_dt);
            if retries > control.max_retries || below_min {
                return Err(PropagationErrors::StepDivergence {
                    t,
                    dt,
                    retries,
                    last_state: Box::new(self.current.clone()),
                });
            }
        }
    }

    /// Runs one Runge-Kutta step, returning the solution and its error estimate.
    fn attempt(
        &mut self,
        x: &RigidBodyArray,
        t: f64,
        h: f64,
    ) -> Result<(RigidBodyArray, RigidBodyArray), PropagationErrors> {
        let dynamics = &self.dynamics;
        let config = &self.config;
        let frame = &self.current.frame;
        let stats = &mut self.stats;

        let mut f = |t: f64, x: &RigidBodyArray, dx: &mut RigidBodyArray| {
            stats.evaluations += 1;
            derivative(dynamics, config, frame, t, x, dx)
        };

        let result = match &mut self.stepper {
            Stepper::Rk4(rk) => rk.step(&mut f, t, x, h).map(|_| (rk.y, rk.y_err)),
            Stepper::DormandPrince(rk) => rk.step(&mut f, t, x, h).map(|_| (rk.y, rk.y_err)),
        };

        let last_state = || Box::new(self.current.clone());
        match result {
            Ok(solution) => Ok(solution),
            Err(EvaluationFailure::NonFinite) => Err(PropagationErrors::NonFiniteState {
                t,
                dt: h,
                last_state: last_state(),
            }),
            Err(EvaluationFailure::Kinematics(source)) => Err(PropagationErrors::InvalidAngularVelocity {
                source,
                last_state: last_state(),
            }),
            Err(EvaluationFailure::Dynamics(message)) => Err(PropagationErrors::Dynamics {
                message,
                last_state: last_state(),
            }),
        }
    }

    /// Unpacks an accepted solution and renormalizes its attitude.
    fn finish(&mut self, y: &RigidBodyArray, t: f64, h: f64) -> Result<RigidBodyState, PropagationErrors> {
        let t_next = if self.t_end - (t + h) <= END_TIME_SLACK * h {
            self.t_end
        } else {
            t + h
        };
        let state = y
            .is_finite()
            .then(|| unpack(y, &self.current.frame, t_next, &self.config))
            .flatten()
            .ok_or_else(|| PropagationErrors::NonFiniteState {
                t,
                dt: h,
                last_state: Box::new(self.current.clone()),
            })?;
        self.config
            .kinematics
            .validate(&state.angular_velocity)
            .map_err(|source| PropagationErrors::InvalidAngularVelocity {
                source,
                last_state: Box::new(self.current.clone()),
            })?;
        Ok(state)
    }
}

impl<D: Dynamics> Iterator for Trajectory<D> {
    type Item = Result<RigidBodyState, PropagationErrors>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.status {
            PropagatorStatus::Converged | PropagatorStatus::Diverged => None,
            PropagatorStatus::Idle if self.emit_current => {
                self.emit_current = false;
                let state = self.current.clone();
                Some(Ok(self.emit(state)))
            }
            PropagatorStatus::Idle | PropagatorStatus::Stepping => {
                if self.current.t >= self.t_end {
                    self.status = PropagatorStatus::Converged;
                    return None;
                }
                self.status = PropagatorStatus::Stepping;
                match self.step() {
                    Ok(state) => Some(Ok(self.emit(state))),
                    Err(error) => Some(Err(self.fail(error))),
                }
            }
        }
    }
}

pub(crate) fn check_time_span(start: f64, end: f64) -> Result<(), PropagationErrors> {
    if !end.is_finite() || end < start {
        return Err(PropagationErrors::InvalidTimeSpan { start, end });
    }
    Ok(())
}

/// `[ṙ, v̇, q̇, ω̇] = [v, a, ½ Ξ(q) ω, α]`
fn derivative<D: Dynamics>(
    dynamics: &D,
    config: &PropagatorConfig,
    frame: &str,
    t: f64,
    x: &RigidBodyArray,
    dx: &mut RigidBodyArray,
) -> Result<(), EvaluationFailure> {
    if !x.is_finite() {
        return Err(EvaluationFailure::NonFinite);
    }
    let w = x.angular_velocity();
    config
        .kinematics
        .validate(&w)
        .map_err(EvaluationFailure::Kinematics)?;

    let q = x.quaternion();
    let state = unpack(x, frame, t, config).ok_or(EvaluationFailure::NonFinite)?;
    let accelerations = dynamics
        .accelerations(&state, t)
        .map_err(|e| EvaluationFailure::Dynamics(e.to_string()))?;

    dx.set_position(&x.velocity());
    dx.set_velocity(&accelerations.linear);
    dx.set_quaternion(&quaternion_derivative(&q, &w));
    dx.set_angular_velocity(&accelerations.angular);
    Ok(())
}

fn unpack(x: &RigidBodyArray, frame: &str, t: f64, config: &PropagatorConfig) -> Option<RigidBodyState> {
    let q = x.quaternion();
    let drift = (q.mag() - 1.0).abs();
    if drift > config.rotation.quaternion_norm {
        tracing::trace!(t, drift, "renormalizing attitude");
    }
    let attitude = UnitQuaternion::from_drifted(q, config.rotation.quaternion_norm).ok()?;
    Some(RigidBodyState {
        position: x.position(),
        velocity: x.velocity(),
        attitude,
        angular_velocity: x.angular_velocity(),
        t,
        frame: frame.to_string(),
    })
}

/// Linear interpolation of position, velocity and rates with slerp on the attitude,
/// `s` in [0, 1] from `a` to `b`.
pub fn interpolate(a: &RigidBodyState, b: &RigidBodyState, s: f64) -> RigidBodyState {
    RigidBodyState {
        position: a.position.lerp(&b.position, s),
        velocity: a.velocity.lerp(&b.velocity, s),
        attitude: UnitQuaternion::slerp(&a.attitude, &b.attitude, s),
        angular_velocity: a.angular_velocity.lerp(&b.angular_velocity, s),
        t: a.t + (b.t - a.t) * s,
        frame: a.frame.clone(),
    }
}
