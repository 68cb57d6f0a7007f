use crate::config::PropagatorConfig;
use crate::dynamics::Dynamics;
use crate::trajectory::{PropagationStats, Trajectory};
use crate::PropagationErrors;
use kinematics::RigidBodyState;
use rand::{SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use rotations::quaternion::UnitQuaternionBuilder;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::Debug;
use thiserror::Error;
use uncertainty::{UncertainVector3, Uncertainty, UncertaintyErrors};

#[derive(Debug, Error)]
pub enum MonteCarloErrors {
    #[error("sampling run {run} failed: {message}")]
    Sampling { run: usize, message: String },
    #[error("{0}")]
    Propagation(#[from] PropagationErrors),
}

/// Dispersed initial conditions for a batch of runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBodyStateBuilder {
    pub frame: String,
    pub t: f64,
    pub position: UncertainVector3,
    pub velocity: UncertainVector3,
    pub attitude: UnitQuaternionBuilder,
    pub angular_velocity: UncertainVector3,
}

impl RigidBodyStateBuilder {
    /// No dispersions; samples reproduce `nominal`.
    pub fn new(nominal: &RigidBodyState) -> Self {
        Self {
            frame: nominal.frame.clone(),
            t: nominal.t,
            position: UncertainVector3::new(nominal.position),
            velocity: UncertainVector3::new(nominal.velocity),
            attitude: UnitQuaternionBuilder::new(nominal.attitude),
            angular_velocity: UncertainVector3::new(nominal.angular_velocity),
        }
    }
}

impl Uncertainty for RigidBodyStateBuilder {
    type Output = RigidBodyState;
    type Error = UncertaintyErrors;

    fn sample(&self, nominal: bool, rng: &mut SmallRng) -> Result<RigidBodyState, UncertaintyErrors> {
        Ok(RigidBodyState {
            position: self.position.sample(nominal, rng)?,
            velocity: self.velocity.sample(nominal, rng)?,
            attitude: self.attitude.sample(nominal, rng)?,
            angular_velocity: self.angular_velocity.sample(nominal, rng)?,
            t: self.t,
            frame: self.frame.clone(),
        })
    }
}

/// A model shared unchanged by every run of a batch.
#[derive(Debug, Clone)]
pub struct Nominal<D: Clone>(pub D);

impl<D: Clone> Uncertainty for Nominal<D> {
    type Output = D;
    type Error = Infallible;

    fn sample(&self, _nominal: bool, _rng: &mut SmallRng) -> Result<D, Infallible> {
        Ok(self.0.clone())
    }
}

/// Outcome of one run. A failed run does not stop the batch.
#[derive(Debug, Clone)]
pub struct MonteCarloRun {
    pub index: usize,
    pub initial_state: RigidBodyState,
    pub result: Result<Vec<RigidBodyState>, PropagationErrors>,
    pub stats: PropagationStats,
}

/// Runs a batch of dispersed propagations in parallel.
///
/// Every model and initial state is sampled up front from a single `SmallRng`
/// seeded with `seed`, so a batch is reproducible regardless of scheduling.
/// Run 0 uses the nominal values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonteCarlo {
    pub nruns: usize,
    pub seed: u64,
    pub config: PropagatorConfig,
}

impl MonteCarlo {
    pub fn new(nruns: usize, seed: u64, config: PropagatorConfig) -> Self {
        Self { nruns, seed, config }
    }

    pub fn run<ModelBuilder, StateBuilder>(
        &self,
        model_builder: &ModelBuilder,
        state_builder: &StateBuilder,
        t_end: f64,
    ) -> Result<Vec<MonteCarloRun>, MonteCarloErrors>
    where
        ModelBuilder: Uncertainty,
        ModelBuilder::Output: Dynamics + Send,
        ModelBuilder::Error: Debug,
        StateBuilder: Uncertainty<Output = RigidBodyState>,
        StateBuilder::Error: Debug,
    {
        let mut rng = SmallRng::seed_from_u64(self.seed);

        // Sample all models and states sequentially
        let mut samples = Vec::with_capacity(self.nruns);
        for run in 0..self.nruns {
            let nominal = run == 0;
            let model = model_builder
                .sample(nominal, &mut rng)
                .map_err(|e| MonteCarloErrors::Sampling {
                    run,
                    message: format!("model: {e:?}"),
                })?;
            let state = state_builder
                .sample(nominal, &mut rng)
                .map_err(|e| MonteCarloErrors::Sampling {
                    run,
                    message: format!("state: {e:?}"),
                })?;
            samples.push((model, state));
        }

        tracing::info!(nruns = self.nruns, seed = self.seed, "starting monte carlo batch");

        let config = self.config;
        let mut runs: Vec<MonteCarloRun> = samples
            .into_iter()
            .enumerate()
            .par_bridge()
            .map(|(index, (model, state))| {
                let (result, stats) = match Trajectory::new(state.clone(), model, t_end, config) {
                    Ok(mut trajectory) => {
                        let result = trajectory.by_ref().collect::<Result<Vec<_>, _>>();
                        (result, trajectory.stats())
                    }
                    Err(e) => (Err(e), PropagationStats::default()),
                };
                MonteCarloRun {
                    index,
                    initial_state: state,
                    result,
                    stats,
                }
            })
            .collect();

        // restore the sampling order
        runs.sort_by_key(|run| run.index);

        let failed = runs.iter().filter(|run| run.result.is_err()).count();
        tracing::info!(nruns = self.nruns, failed, "finished monte carlo batch");
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::TorqueFree;
    use crate::stepping::FixedStepControl;
    use nalgebra::{Matrix3, Vector3};
    use rotations::prelude::*;
    use uncertainty::Dispersion;

    fn batch(seed: u64) -> Vec<MonteCarloRun> {
        let body = TorqueFree::new(Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0))).unwrap();
        let nominal = RigidBodyState::new("inertial").with_rates(Vector3::new(0.0, 0.0, 1.0));
        let mut states = RigidBodyStateBuilder::new(&nominal);
        states.angular_velocity = states
            .angular_velocity
            .with_dispersion(Dispersion::normal(0.0, 0.05).unwrap());
        states.attitude = states
            .attitude
            .with_angle_dispersion(Dispersion::uniform(0.0, 0.1).unwrap());

        MonteCarlo::new(16, seed, PropagatorConfig::new(FixedStepControl::new(0.1)))
            .run(&Nominal(body), &states, 2.0)
            .unwrap()
    }

    #[test]
    fn test_batch_is_reproducible() {
        let a = batch(42);
        let b = batch(42);
        assert_eq!(a.len(), 16);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.index, y.index);
            assert_eq!(x.initial_state, y.initial_state);
            assert_eq!(x.result, y.result);
        }
        assert!(a.iter().enumerate().all(|(i, run)| run.index == i));
        assert!(a.iter().all(|run| run.result.is_ok()));
    }

    #[test]
    fn test_run_zero_is_nominal_and_seeds_differ() {
        let a = batch(1);
        let b = batch(2);
        assert_eq!(a[0].initial_state, b[0].initial_state);
        assert_eq!(a[0].initial_state.attitude, UnitQuaternion::IDENTITY);
        assert_ne!(a[1].initial_state, b[1].initial_state);
    }

    #[test]
    fn test_failed_run_does_not_stop_batch() {
        let nominal = RigidBodyState::new("inertial").with_rates(Vector3::new(0.0, 0.0, 90.0));
        let mut states = RigidBodyStateBuilder::new(&nominal);
        states.angular_velocity = states
            .angular_velocity
            .with_dispersion(Dispersion::uniform(-20.0, 20.0).unwrap());
        let body = TorqueFree::new(Matrix3::identity()).unwrap();
        let runs = MonteCarlo::new(32, 7, PropagatorConfig::new(FixedStepControl::new(0.1)))
            .run(&Nominal(body), &states, 1.0)
            .unwrap();
        assert_eq!(runs.len(), 32);
        assert!(runs.iter().any(|run| run.result.is_err()));
        assert!(runs.iter().any(|run| run.result.is_ok()));
    }
}
