//! # Vision Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::{clap::AppSettings, StructOpt};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A box detected by the vision system.
///
/// All values are given in the camera (sensor) frame and must be transformed into the robot base
/// frame before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, StructOpt)]
#[structopt(setting = AppSettings::AllowNegativeNumbers)]
pub struct Detection {
    /// Box X position in the camera frame.
    ///
    /// Units: millimeters
    pub x_mm: f64,

    /// Box Y position in the camera frame.
    ///
    /// Units: millimeters
    pub y_mm: f64,

    /// Box Z position in the camera frame.
    ///
    /// Units: millimeters
    pub z_mm: f64,

    /// Box rotation about the camera Z axis.
    ///
    /// Units: degrees
    #[serde(default)]
    #[structopt(long, default_value = "0")]
    pub yaw_deg: f64,
}
