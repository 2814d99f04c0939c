//! # Cycle context
//!
//! Data carried across the states of one palletizing cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point3;

use comms_if::eqpt::vision::Detection;

use crate::grid_plan::{place_positions, GridPlanError, GridSpec};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mutable context of the cycle, owned by the [`super::CycleMgr`].
#[derive(Debug, Clone)]
pub struct CycleContext {
    /// The grid being filled.
    pub grid: GridSpec,

    /// Index of the box currently being handled, `total_boxes()` once the cycle is complete.
    pub box_index: usize,

    /// Place position of every box of the grid, in fill order.
    pub place_positions: Vec<Point3<f64>>,

    /// Robot frame position of the box being picked.
    pub pick_position: Option<Point3<f64>>,

    /// Robot frame position the current box is being placed at.
    pub place_target: Option<Point3<f64>>,

    /// Most recent detection which hasn't been picked yet.
    pub detection: Option<Detection>,

    /// Fault message, empty if there is no fault.
    pub error: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CycleContext {
    /// Create a new context for the given grid, precomputing all place positions.
    pub fn new(grid: GridSpec) -> Result<Self, GridPlanError> {
        let place_positions = place_positions(&grid)?;

        Ok(Self {
            grid,
            box_index: 0,
            place_positions,
            pick_position: None,
            place_target: None,
            detection: None,
            error: String::new(),
        })
    }

    /// Number of boxes in the grid.
    pub fn total_boxes(&self) -> usize {
        self.place_positions.len()
    }

    /// Restart the grid from the first box.
    pub fn reset_progress(&mut self) {
        self.box_index = 0;
        self.clear_in_flight();
    }

    /// Forget the targets of the box in hand.
    pub fn clear_in_flight(&mut self) {
        self.pick_position = None;
        self.place_target = None;
    }
}
