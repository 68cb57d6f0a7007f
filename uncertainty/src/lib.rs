use nalgebra::Vector3;
use rand::{Rng, rngs::SmallRng};
use rand_distr::{Distribution, Normal, NormalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UncertaintyErrors {
    #[error("{0}")]
    NormalError(#[from] NormalError),
    #[error("uniform bounds must satisfy low < high, got [{low}, {high})")]
    InvalidUniformBounds { low: f64, high: f64 },
}

/// A value (or model) that can be drawn from a distribution around a nominal.
///
/// `nominal = true` returns the nominal value without consuming randomness.
pub trait Uncertainty {
    type Output;
    type Error;
    fn sample(&self, nominal: bool, rng: &mut SmallRng) -> Result<Self::Output, Self::Error>;
}

/// Scalar dispersion applied around a nominal value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Dispersion {
    Normal { mean: f64, std: f64 },
    Uniform { low: f64, high: f64 },
}

impl Dispersion {
    pub fn normal(mean: f64, std: f64) -> Result<Self, UncertaintyErrors> {
        Normal::new(mean, std)?;
        Ok(Self::Normal { mean, std })
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self, UncertaintyErrors> {
        if !(low < high) || !low.is_finite() || !high.is_finite() {
            return Err(UncertaintyErrors::InvalidUniformBounds { low, high });
        }
        Ok(Self::Uniform { low, high })
    }

    pub fn sample(&self, rng: &mut SmallRng) -> Result<f64, UncertaintyErrors> {
        match *self {
            Dispersion::Normal { mean, std } => Ok(Normal::new(mean, std)?.sample(rng)),
            Dispersion::Uniform { low, high } => {
                if !(low < high) {
                    return Err(UncertaintyErrors::InvalidUniformBounds { low, high });
                }
                Ok(rng.random_range(low..high))
            }
        }
    }
}

/// A scalar with an optional additive dispersion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UncertainValue {
    pub nominal: f64,
    pub dispersion: Option<Dispersion>,
}

impl UncertainValue {
    pub fn new(nominal: f64) -> Self {
        Self { nominal, dispersion: None }
    }

    pub fn with_dispersion(mut self, dispersion: Dispersion) -> Self {
        self.dispersion = Some(dispersion);
        self
    }
}

impl Uncertainty for UncertainValue {
    type Output = f64;
    type Error = UncertaintyErrors;
    fn sample(&self, nominal: bool, rng: &mut SmallRng) -> Result<f64, UncertaintyErrors> {
        match (&self.dispersion, nominal) {
            (Some(dispersion), false) => Ok(self.nominal + dispersion.sample(rng)?),
            _ => Ok(self.nominal),
        }
    }
}

/// A 3-vector with the same additive dispersion applied independently per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UncertainVector3 {
    pub nominal: Vector3<f64>,
    pub dispersion: Option<Dispersion>,
}

impl UncertainVector3 {
    pub fn new(nominal: Vector3<f64>) -> Self {
        Self { nominal, dispersion: None }
    }

    pub fn with_dispersion(mut self, dispersion: Dispersion) -> Self {
        self.dispersion = Some(dispersion);
        self
    }
}

impl Uncertainty for UncertainVector3 {
    type Output = Vector3<f64>;
    type Error = UncertaintyErrors;
    fn sample(&self, nominal: bool, rng: &mut SmallRng) -> Result<Vector3<f64>, UncertaintyErrors> {
        match (&self.dispersion, nominal) {
            (Some(dispersion), false) => Ok(self.nominal
                + Vector3::new(
                    dispersion.sample(rng)?,
                    dispersion.sample(rng)?,
                    dispersion.sample(rng)?,
                )),
            _ => Ok(self.nominal),
        }
    }
}
