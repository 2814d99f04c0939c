//! # Palletizer library.
//!
//! This library allows other crates in the workspace (and the integration tests) to access items
//! defined inside the palletizer crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Coordinate transform module - maps points between the camera frame and the robot base frame
pub mod coord_tf;

/// Cycle manager - the pick and place state machine
pub mod cycle_mgr;

/// Data store - owns everything the control loop works on
pub mod data_store;

/// Grid planner - computes the place positions of a pallet grid
pub mod grid_plan;

/// Motion engine - plans and integrates coordinated motion of the effector
pub mod motion_eng;

/// Simulated robot driver
pub mod sim_actuator;

/// Telecommand processor - applies TCs to the data store
pub mod tc_processor;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Broad classification of the errors raised by the palletizer modules.
///
/// `Validation` and `Usage` errors are returned to the caller without changing any state. The
/// other kinds, when they occur during an active cycle, put the cycle into fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad speed, position, or grid parameters.
    Validation,

    /// A target outside of the axis limits.
    LimitExceeded,

    /// A request that isn't valid in the current state, such as retargeting mid-motion.
    Usage,

    /// A motion which did not complete in time.
    MotionStalled,

    /// A failure reported by the robot driver.
    Actuator,

    /// A missing or invalid parameter file.
    Config,
}
