//! Modulo-divisor tick counter producing the per-bit sampling strobe.

use crate::ClockDivisor;

/// Free-running bit-period counter owned by a single engine.
///
/// The strobe is asserted while the latched counter value is 0, so it fires
/// once every `divisor` ticks. An owning state machine may realign the
/// counter; a realignment takes precedence over that tick's increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BitTimer {
    divisor: ClockDivisor,
    counter: u32,
}

impl BitTimer {
    /// Creates a timer at counter 0, strobing on the first tick.
    #[must_use]
    pub const fn new(divisor: ClockDivisor) -> Self {
        Self {
            divisor,
            counter: 0,
        }
    }

    /// Creates a timer preloaded with `counter`, or `None` if out of range.
    #[must_use]
    pub const fn with_counter(divisor: ClockDivisor, counter: u32) -> Option<Self> {
        if counter > divisor.max_count() {
            None
        } else {
            Some(Self { divisor, counter })
        }
    }

    /// Divisor this timer counts modulo.
    #[must_use]
    pub const fn divisor(&self) -> ClockDivisor {
        self.divisor
    }

    /// Current counter value.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Sampling strobe for the current tick.
    #[must_use]
    pub const fn strobe(&self) -> bool {
        self.counter == 0
    }

    /// Counter value after one tick with no realignment.
    #[must_use]
    pub const fn advanced(&self) -> Self {
        let counter = if self.counter == self.divisor.max_count() {
            0
        } else {
            self.counter + 1
        };
        Self {
            divisor: self.divisor,
            counter,
        }
    }

    /// Counter preloaded to the half-period so the next strobe hits mid-bit.
    #[must_use]
    pub const fn realigned_to_midpoint(&self) -> Self {
        Self {
            divisor: self.divisor,
            counter: self.divisor.half_period(),
        }
    }

    /// Advances one tick in place and returns the strobe seen on that tick.
    pub fn tick(&mut self) -> bool {
        let strobe = self.strobe();
        *self = self.advanced();
        strobe
    }
}
