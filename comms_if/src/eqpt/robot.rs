//! # Robot Equipment Interface
//!
//! The core control software never talks to the robot driver directly. Instead it is handed an
//! implementation of [`Actuator`], which hides the driver binding and its connection lifecycle
//! (connect, reconnect, disconnect). Any failure of the driver, including a lost connection, is
//! reported as an [`ActuatorError`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A pose of the tool centre point (TCP).
///
/// Poses are values: anything that transforms or moves a pose produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position of each axis of the effector, in axis order.
    ///
    /// Units: millimeters
    pub axes: Vec<f64>,

    /// Orientation of the tool as an axis-angle vector `[rx, ry, rz]`, or `None` if the
    /// orientation is left to the driver.
    ///
    /// Units: radians
    #[serde(default)]
    pub orientation: Option<[f64; 3]>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// State of the gripper on the end of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GripperState {
    Open,
    Closed,
}

/// Errors reported by an [`Actuator`] implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActuatorError {
    #[error("Robot is not connected")]
    NotConnected,

    #[error("Robot rejected the command: {0}")]
    Rejected(String),

    #[error("Robot driver error: {0}")]
    Other(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The robot driver as seen by the control software.
///
/// Implementations must be `Send` so that the owning data store can be moved onto the control
/// thread.
pub trait Actuator: Send {
    /// Read the measured TCP pose.
    fn current_pose(&mut self) -> Result<Pose, ActuatorError>;

    /// Read the measured joint angles.
    ///
    /// Units: radians
    fn current_joint_angles(&mut self) -> Result<Vec<f64>, ActuatorError>;

    /// Demand a linear (cartesian) move of the TCP to the given pose.
    ///
    /// Units: velocity in mm/s, acceleration in mm/s^2
    fn linear_move(
        &mut self,
        pose: &Pose,
        velocity: f64,
        acceleration: f64,
    ) -> Result<(), ActuatorError>;

    /// Demand a joint-space move to the given joint angles.
    ///
    /// Units: angles in radians, velocity in rad/s, acceleration in rad/s^2
    fn joint_move(
        &mut self,
        angles: &[f64],
        velocity: f64,
        acceleration: f64,
    ) -> Result<(), ActuatorError>;

    /// Drive the gripper into the given state, returning the state acknowledged by the driver.
    fn set_gripper(&mut self, state: GripperState) -> Result<GripperState, ActuatorError>;

    /// Stop any motion in progress, holding the current pose.
    fn stop_motion(&mut self) -> Result<(), ActuatorError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose {
    /// Create a new pose with no orientation.
    pub fn new(axes: Vec<f64>) -> Self {
        Self {
            axes,
            orientation: None,
        }
    }

    /// Create a new pose with the given tool orientation.
    pub fn with_orientation(axes: Vec<f64>, orientation: [f64; 3]) -> Self {
        Self {
            axes,
            orientation: Some(orientation),
        }
    }

    /// Number of axes in this pose.
    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, a) in self.axes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.3}", a)?;
        }
        write!(f, "]")?;

        if let Some(o) = self.orientation {
            write!(f, " rot [{:.4}, {:.4}, {:.4}]", o[0], o[1], o[2])?;
        }

        Ok(())
    }
}
