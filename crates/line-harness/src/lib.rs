//! Line harness for the UART receiver model.
//!
//! Plays the part of the far end of the serial line: it steps the system
//! clock, drives framed bytes onto the receive line, and pulses the
//! acknowledge/fix handshakes, then checks the receiver's observable state.

/// Tick-level line driver.
pub mod driver;

/// `.uart` script syntax and parser.
pub mod script;

/// Script execution and reporting.
pub mod runner;

#[cfg(test)]
use tempfile as _;
