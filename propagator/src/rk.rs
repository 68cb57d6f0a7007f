use crate::state_array::StateArray;
use crate::tableau::ButcherTableau;
use std::array;

/// Explicit Runge-Kutta stepper over a `StateArray<N>` with preallocated stage buffers.
#[derive(Debug, Clone)]
pub struct RungeKutta<const N: usize, const STAGES: usize> {
    tableau: ButcherTableau<STAGES>,
    k: [StateArray<N>; STAGES],
    stage: StateArray<N>,
    scaled: StateArray<N>,
    /// Solution at the end of the last step.
    pub y: StateArray<N>,
    /// Local error estimate of the last step, zero for methods without an embedded pair.
    pub y_err: StateArray<N>,
}

impl<const N: usize, const STAGES: usize> RungeKutta<N, STAGES> {
    pub fn new(tableau: ButcherTableau<STAGES>) -> Self {
        Self {
            tableau,
            k: array::from_fn(|_| StateArray::default()),
            stage: StateArray::default(),
            scaled: StateArray::default(),
            y: StateArray::default(),
            y_err: StateArray::default(),
        }
    }

    pub fn tableau(&self) -> &ButcherTableau<STAGES> {
        &self.tableau
    }

    /// Advances `x` from `t` by `h`, leaving the result in `self.y` (and `self.y_err`).
    ///
    /// `f(t, x, dx)` writes the derivative of `x` into `dx`.
    pub fn step<E, F>(&mut self, f: &mut F, t: f64, x: &StateArray<N>, h: f64) -> Result<(), E>
    where
        F: FnMut(f64, &StateArray<N>, &mut StateArray<N>) -> Result<(), E>,
    {
        // k0
        f(t, x, &mut self.k[0])?;

        // k1 - ks
        for s in 1..STAGES {
            // in place calculation of intermediate points
            self.stage = StateArray::default();
            for i in 0..s {
                if self.tableau.a[s][i] == 0.0 {
                    continue;
                }
                self.scaled.clone_from(&self.k[i]);
                self.scaled *= self.tableau.a[s][i];
                self.stage += &self.scaled;
            }
            self.stage *= h;
            self.stage += x;

            f(t + self.tableau.c[s] * h, &self.stage, &mut self.k[s])?;
        }

        self.y.clone_from(x);
        for s in 0..STAGES {
            self.scaled.clone_from(&self.k[s]);
            self.scaled *= self.tableau.b[s] * h;
            self.y += &self.scaled;
        }

        self.y_err = StateArray::default();
        if let Some(b2) = self.tableau.b2 {
            for s in 0..STAGES {
                self.scaled.clone_from(&self.k[s]);
                self.scaled *= (self.tableau.b[s] - b2[s]) * h;
                self.y_err += &self.scaled;
            }
        }
        Ok(())
    }
}
