//! Utility library for the palletizer cell software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod maths;
pub mod params;
pub mod script_interpreter;
pub mod session;
pub mod time;
