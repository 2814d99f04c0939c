//! # Grid planner module
//!
//! Computes the place positions of a single layer of identical boxes on a pallet. Positions are
//! returned in row-major order, index `k = row * cols + col`, with columns laid out along the
//! robot X axis and rows along the robot Y axis.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use comms_if::tc::cycle::ConfigureCmd;

use crate::ErrorKind;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest number of boxes a single grid may hold.
pub const MAX_BOXES: usize = 10_000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Description of the pallet grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of rows, along the robot Y axis.
    pub rows: usize,

    /// Number of columns, along the robot X axis.
    pub cols: usize,

    /// Box size as `[width, depth, height]`, width along X and depth along Y.
    ///
    /// Units: millimeters
    pub box_size_mm: [f64; 3],

    /// Place position of the first box (row 0, column 0) in the robot frame.
    ///
    /// Units: millimeters
    pub origin_mm: [f64; 3],

    /// Gap between adjacent boxes.
    ///
    /// Units: millimeters
    pub spacing_mm: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised when a grid is invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridPlanError {
    #[error("The grid must have at least one row")]
    InvalidRows,

    #[error("The grid must have at least one column")]
    InvalidCols,

    #[error("Box dimensions must be positive and finite, found {0:?}")]
    InvalidBoxSize([f64; 3]),

    #[error("Spacing must be non-negative and finite, found {0}")]
    InvalidSpacing(f64),

    #[error("Grid origin must be finite, found {0:?}")]
    InvalidOrigin([f64; 3]),

    #[error("A grid of {rows} x {cols} boxes exceeds the maximum of {max} boxes")]
    TooManyBoxes { rows: usize, cols: usize, max: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GridSpec {
    /// Total number of boxes in the grid, or `None` if the count overflows.
    pub fn num_boxes(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Check that the grid describes a real layout.
    pub fn validate(&self) -> Result<(), GridPlanError> {
        if self.rows < 1 {
            return Err(GridPlanError::InvalidRows);
        }
        if self.cols < 1 {
            return Err(GridPlanError::InvalidCols);
        }
        match self.num_boxes() {
            Some(n) if n <= MAX_BOXES => (),
            _ => {
                return Err(GridPlanError::TooManyBoxes {
                    rows: self.rows,
                    cols: self.cols,
                    max: MAX_BOXES,
                })
            }
        }
        if self.box_size_mm.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(GridPlanError::InvalidBoxSize(self.box_size_mm));
        }
        if !(self.spacing_mm.is_finite() && self.spacing_mm >= 0.0) {
            return Err(GridPlanError::InvalidSpacing(self.spacing_mm));
        }
        if self.origin_mm.iter().any(|v| !v.is_finite()) {
            return Err(GridPlanError::InvalidOrigin(self.origin_mm));
        }

        Ok(())
    }
}

impl From<&ConfigureCmd> for GridSpec {
    fn from(cmd: &ConfigureCmd) -> Self {
        Self {
            rows: cmd.rows,
            cols: cmd.cols,
            box_size_mm: [cmd.box_width_mm, cmd.box_depth_mm, cmd.box_height_mm],
            origin_mm: [cmd.origin_x_mm, cmd.origin_y_mm, cmd.origin_z_mm],
            spacing_mm: cmd.spacing_mm,
        }
    }
}

impl GridPlanError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the place position of every box in the grid, in row-major order.
///
/// Z is constant, boxes are placed in a single layer.
pub fn place_positions(spec: &GridSpec) -> Result<Vec<Point3<f64>>, GridPlanError> {
    spec.validate()?;

    let origin = Point3::from(spec.origin_mm);
    let pitch_x = spec.box_size_mm[0] + spec.spacing_mm;
    let pitch_y = spec.box_size_mm[1] + spec.spacing_mm;

    let mut positions = Vec::with_capacity(spec.num_boxes().unwrap_or_default());

    for row in 0..spec.rows {
        for col in 0..spec.cols {
            positions.push(origin + Vector3::new(col as f64 * pitch_x, row as f64 * pitch_y, 0.0));
        }
    }

    Ok(positions)
}
