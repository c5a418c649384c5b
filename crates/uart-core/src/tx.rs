//! Transmitter timing.
//!
//! Only the bit-period counter exists; the line is held at the idle level.
//! Framing and shift-out are not implemented.

use crate::{BitTimer, ClockDivisor, ConfigError, UartConfig, LINE_IDLE};

/// Transmit-side engine owning its own bit timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmitter {
    timer: BitTimer,
}

impl Transmitter {
    /// Creates a transmitter for an already validated divisor.
    #[must_use]
    pub const fn new(divisor: ClockDivisor) -> Self {
        Self {
            timer: BitTimer::new(divisor),
        }
    }

    /// Creates a transmitter from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no acceptable divisor exists.
    pub fn from_config(config: &UartConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.divisor()?))
    }

    /// Advances one tick and returns the strobe seen on that tick.
    pub fn step(&mut self) -> bool {
        self.timer.tick()
    }

    /// Level currently driven on the transmit line.
    #[must_use]
    pub const fn tx(&self) -> bool {
        LINE_IDLE
    }

    /// Bit-period counter.
    #[must_use]
    pub const fn timer(&self) -> BitTimer {
        self.timer
    }

    /// Restores the power-on counter.
    pub fn reset(&mut self) {
        self.timer = BitTimer::new(self.timer.divisor());
    }
}
