//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications interface. A telecommand
//! (TC) is an instruction sent to the palletizer exec by an operator, a script, or the vision
//! system.
//!
//! TCs can be parsed from two representations:
//!
//! - JSON, as used in scripts: `{"type": "configure", "payload": {"rows": 2, ...}}`
//! - A command line, as typed by an operator: `configure --rows 2 --cols 3 ...`

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cycle;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use structopt::StructOpt;
use thiserror::Error;

// Internal
use crate::eqpt::vision::Detection;
use cycle::ConfigureCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, StructOpt)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Tc {
    /// Configure the grid of the next palletizing cycle. Only accepted when idle.
    #[structopt(name = "configure")]
    Configure(ConfigureCmd),

    /// Start the palletizing cycle.
    #[structopt(name = "start")]
    Start,

    /// Stop the palletizing cycle, aborting any motion and returning to idle.
    #[structopt(name = "stop")]
    Stop,

    /// Clear a fault and return to idle.
    #[structopt(name = "reset")]
    Reset,

    /// Raise a fault with the given message.
    #[structopt(name = "fault")]
    Fault {
        /// Description of the fault.
        message: String,
    },

    /// A box detection from the vision system, in the camera frame.
    #[structopt(name = "detect")]
    Detect(Detection),

    /// Report the current status of the cycle.
    #[structopt(name = "status")]
    Status,

    /// Report all calculated place positions of the configured grid.
    #[structopt(name = "positions")]
    Positions,

    /// Report a detection transformed into the robot frame, without acting on it.
    #[structopt(name = "transform")]
    Transform(Detection),
}

/// Response of the exec to a telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TcResponse {
    /// The TC was accepted and executed.
    Ok,

    /// The TC was valid but cannot be executed in the current state.
    CannotExecute(String),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC command line is invalid: {0}")]
    InvalidCommand(String),

    #[error("TC command line is empty")]
    Empty,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Parse a new TC from a whitespace separated command line, for example
    /// `detect 50 -30 0 --yaw-deg 15`.
    pub fn from_line(line: &str) -> Result<Self, TcParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.is_empty() {
            return Err(TcParseError::Empty);
        }

        // Clap expects the binary name in the first position
        Tc::from_iter_safe(std::iter::once("tc").chain(words.into_iter()))
            .map_err(|e| TcParseError::InvalidCommand(e.message))
    }
}
