//! Parameters structure for the coordinate transform

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mounting of the camera relative to the robot base.
///
/// The angles and translation describe the camera frame as seen from the robot base frame, so
/// that a point in the camera frame maps into the base frame as `R·p + t`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordTfParams {
    /// Rotation of the camera about the base X axis.
    ///
    /// Units: degrees
    pub mount_roll_deg: f64,

    /// Rotation of the camera about the base Y axis.
    ///
    /// Units: degrees
    pub mount_pitch_deg: f64,

    /// Rotation of the camera about the base Z axis.
    ///
    /// Units: degrees
    pub mount_yaw_deg: f64,

    /// Position of the camera origin in the base frame.
    ///
    /// Units: millimeters
    pub translation_mm: [f64; 3],
}
