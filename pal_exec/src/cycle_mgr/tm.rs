//! # Defines Telemetry Pack for the palletizing cycle

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::CycleState;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Status report of the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTm {
    pub state: CycleState,
    pub current_box: usize,
    pub total_boxes: usize,
    pub error: Option<String>,
}
