//! # Palletizing cycle telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::{clap::AppSettings, StructOpt};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Configuration of the pallet grid for a palletizing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, StructOpt)]
#[structopt(setting = AppSettings::AllowNegativeNumbers)]
pub struct ConfigureCmd {
    /// Number of rows in the grid.
    #[structopt(long)]
    pub rows: usize,

    /// Number of columns in the grid.
    #[structopt(long)]
    pub cols: usize,

    /// Box width, along the robot X axis.
    ///
    /// Units: millimeters
    #[structopt(long)]
    pub box_width_mm: f64,

    /// Box depth, along the robot Y axis.
    ///
    /// Units: millimeters
    #[structopt(long)]
    pub box_depth_mm: f64,

    /// Box height, along the robot Z axis.
    ///
    /// Units: millimeters
    #[structopt(long)]
    pub box_height_mm: f64,

    /// X position of the first box placement in the robot frame.
    ///
    /// Units: millimeters
    #[structopt(long)]
    pub origin_x_mm: f64,

    /// Y position of the first box placement in the robot frame.
    ///
    /// Units: millimeters
    #[structopt(long)]
    pub origin_y_mm: f64,

    /// Z position of the first box placement in the robot frame.
    ///
    /// Units: millimeters
    #[structopt(long)]
    pub origin_z_mm: f64,

    /// Gap between adjacent boxes.
    ///
    /// Units: millimeters
    #[serde(default = "default_spacing_mm")]
    #[structopt(long, default_value = "10")]
    pub spacing_mm: f64,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_spacing_mm() -> f64 {
    10.0
}
