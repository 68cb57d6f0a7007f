use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

/// A named reference frame. Frames are registered once and referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    name: String,
    handedness: Handedness,
    inertial: bool,
}

impl Frame {
    pub fn inertial(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handedness: Handedness::Right,
            inertial: true,
        }
    }

    /// A frame that may rotate or accelerate relative to inertial space.
    pub fn rotating(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handedness: Handedness::Right,
            inertial: false,
        }
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn is_inertial(&self) -> bool {
        self.inertial
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
