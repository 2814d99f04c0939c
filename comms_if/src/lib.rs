//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the palletizer software: the telecommands
//! accepted by the exec and the equipment interfaces (robot actuator, vision detections).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Interface definitions for equipment (robot arm, gripper, vision)
pub mod eqpt;
