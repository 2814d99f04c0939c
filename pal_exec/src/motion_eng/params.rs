//! Parameters structure for MotionEng

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the motion engine.
#[derive(Debug, Clone, Deserialize)]
pub struct MotionEngParams {
    /// Number of axes of the effector.
    pub num_axes: usize,

    /// Position of the effector when the engine is created, before any position is read back from
    /// the robot.
    ///
    /// Units: millimeters
    pub initial_pos: Vec<f64>,

    /// Capabilities of the effector.
    pub limits: AxisLimits,
}

/// Position and rate limits of the effector axes.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisLimits {
    /// Minimum position of each axis.
    ///
    /// Units: millimeters
    pub min_pos: Vec<f64>,

    /// Maximum position of each axis.
    ///
    /// Units: millimeters
    pub max_pos: Vec<f64>,

    /// Rate of the dominant axis of a move commanded at 100 % speed.
    ///
    /// Units: millimeters/second
    pub max_rate_mms: f64,
}
