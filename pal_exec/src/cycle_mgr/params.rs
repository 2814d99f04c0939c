//! # CycleMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::grid_plan::GridSpec;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CycleMgrParams {
    // ---- MOTION ----
    /// Home position of the tool centre point in the robot frame.
    ///
    /// Units: millimeters
    pub home_pos_mm: Vec<f64>,

    /// Speed at which all cycle motions are performed.
    ///
    /// Units: percent of the maximum rate
    pub speed_pc: f64,

    /// Height above a pick or place position at which the tool approaches and retracts.
    ///
    /// Units: millimeters
    pub approach_offset_mm: f64,

    /// Orientation of the tool pointing down at the pallet, as an axis-angle vector in the robot
    /// frame.
    ///
    /// Units: radians
    pub tool_orientation_rad: [f64; 3],

    /// Velocity passed to the robot driver for each linear move.
    ///
    /// Units: millimeters/second
    pub lin_vel_mms: f64,

    /// Acceleration passed to the robot driver for each linear move.
    ///
    /// Units: millimeters/second^2
    pub lin_acc_mmss: f64,

    // ---- TIMEOUTS ----
    /// Maximum duration of a single motion segment before it is considered stalled.
    ///
    /// Units: seconds
    pub motion_timeout_s: f64,

    /// Maximum number of polls of a single motion segment before it is considered stalled.
    pub max_polls_per_segment: usize,

    // ---- GRID ----
    /// Grid used until the first configure command is received.
    pub default_grid: GridSpec,
}
