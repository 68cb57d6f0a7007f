use crate::stepping::StepPolicy;
use kinematics::KinematicsSettings;
use ron::ser::{PrettyConfig, to_string_pretty};
use rotations::RotationTolerances;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigErrors {
    #[error("{0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("{0}")]
    Serialize(#[from] ron::Error),
}

/// Everything that tunes a propagation run, loadable from a RON document.
///
/// ```ron
/// (
///     step_policy: Fixed((dt: 0.01)),
///     kinematics: (max_angular_rate: 50.0),
///     rotation: (quaternion_norm: 1e-9, dcm_orthonormality: 1e-9, gimbal_epsilon: 0.001),
/// )
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagatorConfig {
    pub step_policy: StepPolicy,
    pub kinematics: KinematicsSettings,
    pub rotation: RotationTolerances,
}

impl PropagatorConfig {
    pub fn new(step_policy: impl Into<StepPolicy>) -> Self {
        Self {
            step_policy: step_policy.into(),
            ..Default::default()
        }
    }

    pub fn with_kinematics(mut self, kinematics: KinematicsSettings) -> Self {
        self.kinematics = kinematics;
        self
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigErrors> {
        Ok(ron::from_str(s)?)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigErrors> {
        Ok(to_string_pretty(self, PrettyConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepping::{AdaptiveStepControl, FixedStepControl};

    #[test]
    fn test_ron_round_trip() {
        let config = PropagatorConfig::new(
            AdaptiveStepControl::default()
                .with_rel_tol(1e-8)
                .with_max_dt(2.0)
                .with_max_retries(7),
        )
        .with_kinematics(KinematicsSettings { max_angular_rate: 12.5 });
        let text = config.to_ron_string().unwrap();
        assert_eq!(PropagatorConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = PropagatorConfig::from_ron_str("(step_policy: Fixed((dt: 0.01)))").unwrap();
        assert_eq!(config.step_policy, StepPolicy::Fixed(FixedStepControl::new(0.01)));
        assert_eq!(config.kinematics, KinematicsSettings::default());
        assert_eq!(config.rotation, RotationTolerances::default());
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            PropagatorConfig::from_ron_str("(step_policy: Sideways)"),
            Err(ConfigErrors::Parse(_))
        ));
    }
}
