//! # Data Store

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::cycle_mgr::{CycleMgr, CycleState, CycleTm};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time at the start of this cycle
    pub sim_time_s: f64,

    // Palletizing
    pub cycle_mgr: CycleMgr,

    /// Status of the cycle after the last step
    pub cycle_tm: Option<CycleTm>,

    /// State of the cycle when it was last archived
    pub last_archived_state: Option<CycleState>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DataStore {
    pub fn new(cycle_mgr: CycleMgr) -> Self {
        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            sim_time_s: 0.0,
            cycle_mgr,
            cycle_tm: None,
            last_archived_state: None,
            num_consec_cycle_overruns: 0,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Sets the 1Hz cycle flag and samples the session time.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.cycle_start_at(cycle_frequency_hz, util::session::get_elapsed_seconds());
    }

    /// As [`DataStore::cycle_start`] but with an explicit cycle time.
    pub fn cycle_start_at(&mut self, cycle_frequency_hz: f64, time_s: f64) {
        let cycles_per_s = (cycle_frequency_hz as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.sim_time_s = time_s;
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Returns the status of the cycle if its state has changed since this was last called.
    pub fn take_state_change(&mut self) -> Option<CycleTm> {
        let tm = self.cycle_tm.as_ref()?;

        if self.last_archived_state == Some(tm.state) {
            return None;
        }

        self.last_archived_state = Some(tm.state);
        Some(tm.clone())
    }
}
