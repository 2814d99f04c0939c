//! # Motion engine module
//!
//! The motion engine tracks the position of the effector and drives it towards a target. It is a
//! polling design: the caller repeats [`MotionEng::move_to`] with the same target until the
//! returned velocity is all zero. Each call does one integration step and never blocks.
//!
//! Motion is coordinated linear motion. On the first call for a target the axis with the largest
//! delta (the dominant axis) sets the duration of the move, and every other axis is given the
//! velocity that makes it arrive at the same time.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use crate::ErrorKind;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur during MotionEng operation.
#[derive(Debug, thiserror::Error)]
pub enum MotionEngError {
    #[error("Failed to load MotionEng parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("MotionEng parameters are invalid: {0}")]
    InvalidParams(String),

    #[error("Requested speed of {0} % is outside of the limits (0, 100]")]
    InvalidSpeed(f64),

    #[error("Requested pose has {found} axes, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Requested pose {0:?} contains a non-finite value")]
    NonFiniteTarget(Vec<f64>),

    #[error("Requested position of {value} for axis {axis} is outside of the limits [{min}, {max}]")]
    LimitExceeded {
        axis: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Cannot move to a new target while a move to {0:?} is in progress")]
    Retarget(Vec<f64>),

    #[error("Cannot set the position of the effector while it is moving")]
    NotStationary,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionEngError {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MotionEngError::ParamLoadError(_) | MotionEngError::InvalidParams(_) => {
                ErrorKind::Config
            }
            MotionEngError::InvalidSpeed(_)
            | MotionEngError::DimensionMismatch { .. }
            | MotionEngError::NonFiniteTarget(_) => ErrorKind::Validation,
            MotionEngError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            MotionEngError::Retarget(_) | MotionEngError::NotStationary => ErrorKind::Usage,
        }
    }
}
