//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with equipment: the robot driver behind
//! the [`robot::Actuator`] trait and the vision system producing [`vision::Detection`]s.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod robot;
pub mod vision;
