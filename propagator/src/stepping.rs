use serde::{Deserialize, Serialize};

/// Specifies the type of step size control strategy used by the propagator.
///
/// - `Fixed`: classical RK4 at a constant step size.
/// - `Adaptive`: Dormand-Prince 5(4) with local error control.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepPolicy {
    Fixed(FixedStepControl),
    Adaptive(AdaptiveStepControl),
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self::Adaptive(AdaptiveStepControl::default())
    }
}

impl From<FixedStepControl> for StepPolicy {
    fn from(value: FixedStepControl) -> Self {
        Self::Fixed(value)
    }
}

impl From<AdaptiveStepControl> for StepPolicy {
    fn from(value: AdaptiveStepControl) -> Self {
        Self::Adaptive(value)
    }
}

impl StepPolicy {
    /// Step size the first step is attempted with, inside `[min_dt, max_dt]` when adaptive.
    pub fn initial_dt(&self) -> f64 {
        match self {
            StepPolicy::Fixed(fixed) => fixed.dt,
            StepPolicy::Adaptive(adaptive) => adaptive.clamp_dt(adaptive.initial_dt),
        }
    }

    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> Result<(), String> {
        let positive = |name: &str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(format!("{name} must be positive and finite, got {value}"))
            }
        };
        match self {
            StepPolicy::Fixed(fixed) => positive("dt", fixed.dt),
            StepPolicy::Adaptive(adaptive) => {
                positive("rel_tol", adaptive.rel_tol)?;
                positive("abs_tol", adaptive.abs_tol)?;
                positive("initial_dt", adaptive.initial_dt)?;
                positive("max_growth", adaptive.max_growth)?;
                if let Some(min_dt) = adaptive.min_dt {
                    positive("min_dt", min_dt)?;
                }
                if let Some(max_dt) = adaptive.max_dt {
                    positive("max_dt", max_dt)?;
                    if adaptive.min_dt.is_some_and(|min_dt| min_dt > max_dt) {
                        return Err("min_dt exceeds max_dt".to_string());
                    }
                }
                Ok(())
            }
        }
    }
}

/// Fixed-step control configuration.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedStepControl {
    /// Constant step size, s. The final step is shortened to land on the end time.
    pub dt: f64,
}

impl Default for FixedStepControl {
    fn default() -> Self {
        Self { dt: 0.1 }
    }
}

impl FixedStepControl {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

/// Adaptive step size controller.
///
/// A step is accepted when the weighted RMS error is at most 1. Rejected steps
/// are halved and retried up to `max_retries` times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveStepControl {
    /// Relative tolerance used for error estimation.
    pub rel_tol: f64,
    /// Absolute tolerance used for error estimation.
    pub abs_tol: f64,
    pub initial_dt: f64,
    /// Optional minimum allowed step size.
    pub min_dt: Option<f64>,
    /// Optional maximum allowed step size.
    pub max_dt: Option<f64>,
    pub max_retries: usize,
    /// Largest factor a step may grow by after an accepted step.
    pub max_growth: f64,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            abs_tol: 1e-9,
            initial_dt: 0.1,
            min_dt: None,
            max_dt: None,
            max_retries: 20,
            max_growth: 5.0,
        }
    }
}

impl AdaptiveStepControl {
    /// Step size to try next after accepting a step of size `dt` with normalized error `error`.
    ///
    /// Basic controller `0.9 dt err^(-1/(order + 1))`.
    pub fn next_dt(&self, dt: f64, error: f64, error_order: usize) -> f64 {
        let factor = if error > 0.0 {
            0.9 * (1.0 / error).powf(1.0 / (error_order as f64 + 1.0))
        } else {
            self.max_growth
        };
        self.clamp_dt(dt * factor.min(self.max_growth))
    }

    /// Limits `dt` to the configured `[min_dt, max_dt]` range.
    pub fn clamp_dt(&self, dt: f64) -> f64 {
        let mut dt = dt;
        if let Some(max_dt) = self.max_dt {
            dt = dt.min(max_dt);
        }
        if let Some(min_dt) = self.min_dt {
            dt = dt.max(min_dt);
        }
        dt
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_initial_dt(mut self, dt: f64) -> Self {
        self.initial_dt = dt;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_growth(mut self, max_growth: f64) -> Self {
        self.max_growth = max_growth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_basic_controller() {
        let control = AdaptiveStepControl::default();
        // an error of exactly one still backs off by the safety factor
        assert_abs_diff_eq!(control.next_dt(1.0, 1.0, 4), 0.9, epsilon = 1e-15);
        assert_abs_diff_eq!(control.next_dt(1.0, 1.0 / 32.0, 4), 1.8, epsilon = 1e-12);
        // growth is clamped
        assert_eq!(control.next_dt(1.0, 1e-20, 4), 5.0);
        assert_eq!(control.next_dt(1.0, 0.0, 4), 5.0);
        assert_eq!(control.with_max_dt(2.0).next_dt(1.0, 1e-20, 4), 2.0);
    }

    #[test]
    fn test_initial_dt_respects_bounds() {
        let control = AdaptiveStepControl::default().with_initial_dt(10.0);
        assert_eq!(StepPolicy::from(control).initial_dt(), 10.0);
        assert_eq!(StepPolicy::from(control.with_max_dt(1.0)).initial_dt(), 1.0);
        let control = control.with_initial_dt(1e-6).with_min_dt(1e-3);
        assert_eq!(StepPolicy::from(control).initial_dt(), 1e-3);
        assert_eq!(StepPolicy::from(FixedStepControl::new(0.2)).initial_dt(), 0.2);
    }

    #[test]
    fn test_validate() {
        assert!(StepPolicy::default().validate().is_ok());
        assert!(StepPolicy::from(FixedStepControl::new(0.0)).validate().is_err());
        assert!(StepPolicy::from(FixedStepControl::new(f64::NAN)).validate().is_err());
        let inverted = AdaptiveStepControl::default().with_min_dt(1.0).with_max_dt(0.1);
        assert!(StepPolicy::from(inverted).validate().is_err());
    }
}
