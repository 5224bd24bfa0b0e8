//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes the argument definition, the probe routine itself and the
//! rendering of its transcript.

mod commands;

pub use commands::*;
