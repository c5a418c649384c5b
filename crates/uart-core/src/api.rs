//! Host-facing configuration, trace, and snapshot contracts.

use thiserror::Error;

use crate::{
    compute_divisor, ClockDivisor, ConfigError, FramingError, ReceiverState,
    DEFAULT_MAX_TIMING_ERROR,
};

/// Default system clock frequency in hertz.
pub const DEFAULT_CLK_FREQ_HZ: u32 = 24_000_000;

/// Default line rate in baud.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Top-level immutable configuration for a UART instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct UartConfig {
    /// System clock frequency driving every tick, in hertz.
    pub clk_freq_hz: u32,
    /// Target line rate in baud.
    pub baud_rate: u32,
    /// Maximum relative deviation of the achieved baud rate.
    pub max_err: f64,
    /// Enables trace dispatch from [`crate::Uart::step_traced`].
    pub tracing_enabled: bool,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            clk_freq_hz: DEFAULT_CLK_FREQ_HZ,
            baud_rate: DEFAULT_BAUD_RATE,
            max_err: DEFAULT_MAX_TIMING_ERROR,
            tracing_enabled: false,
        }
    }
}

impl UartConfig {
    /// Configuration for the given rates with the default tolerance.
    #[must_use]
    pub fn with_rates(clk_freq_hz: u32, baud_rate: u32) -> Self {
        Self {
            clk_freq_hz,
            baud_rate,
            ..Self::default()
        }
    }

    /// Derives and validates the bit-period divisor.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from [`compute_divisor`].
    pub fn divisor(&self) -> Result<ClockDivisor, ConfigError> {
        compute_divisor(self.clk_freq_hz, self.baud_rate, self.max_err)
    }
}

/// Deterministic trace events emitted in tick order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// The receiver moved between states at the end of `tick`.
    StateChanged {
        /// Zero-based tick index.
        tick: u64,
        /// State before the tick.
        from: ReceiverState,
        /// State after the tick.
        to: ReceiverState,
    },
    /// A data bit was latched on a strobe.
    BitSampled {
        /// Zero-based tick index.
        tick: u64,
        /// Position of the bit within the word, LSB first.
        index: u8,
        /// Sampled line level.
        level: bool,
    },
    /// A complete byte with a valid stop bit is now buffered.
    ByteReceived {
        /// Zero-based tick index.
        tick: u64,
        /// Buffered value.
        value: u8,
    },
    /// A framing fault was latched.
    FramingFault {
        /// Zero-based tick index.
        tick: u64,
        /// Latched cause.
        cause: FramingError,
    },
}

impl TraceEvent {
    /// Tick index the event belongs to.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        match *self {
            Self::StateChanged { tick, .. }
            | Self::BitSampled { tick, .. }
            | Self::ByteReceived { tick, .. }
            | Self::FramingFault { tick, .. } => tick,
        }
    }
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// Stable snapshot wire-version identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Initial register layout.
    V1 = 1,
}

/// Full receiver register set for export, import, and replay fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ReceiverSnapshot {
    /// Snapshot schema version.
    pub version: SnapshotVersion,
    /// Ticks per bit period.
    pub divisor: u32,
    /// Bit-period counter.
    pub counter: u32,
    /// Active state.
    pub state: ReceiverState,
    /// Receive shift register.
    pub buffer: u8,
    /// Data bit position.
    pub bit_index: u8,
    /// Acknowledge latch.
    pub ack: bool,
    /// Fix latch.
    pub fix: bool,
    /// Latched framing cause while in `Error`.
    pub fault: Option<FramingError>,
    /// Ticks elapsed since power-on or reset.
    pub ticks: u64,
}

/// Rejections raised when importing a [`ReceiverSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SnapshotError {
    /// Divisor field is zero.
    #[error("snapshot divisor must be at least 1")]
    ZeroDivisor,
    /// Counter lies outside `[0, divisor - 1]`.
    #[error("snapshot counter {counter} out of range for divisor {divisor}")]
    CounterOutOfRange {
        /// Stored counter.
        counter: u32,
        /// Stored divisor.
        divisor: u32,
    },
    /// Bit index lies outside `[0, 7]`.
    #[error("snapshot bit index {0} out of range")]
    BitIndexOutOfRange(u8),
    /// Fault cause present outside `Error`, or missing inside it.
    #[error("snapshot fault cause does not match state {0}")]
    FaultStateMismatch(ReceiverState),
}

#[cfg(test)]
mod tests {
    use super::{
        SnapshotError, TraceEvent, TraceSink, UartConfig, DEFAULT_BAUD_RATE, DEFAULT_CLK_FREQ_HZ,
    };
    use crate::{ConfigError, FramingError, ReceiverState, DEFAULT_MAX_TIMING_ERROR};

    #[test]
    fn default_config_uses_24mhz_9600_baud_and_five_percent() {
        let config = UartConfig::default();

        assert_eq!(config.clk_freq_hz, DEFAULT_CLK_FREQ_HZ);
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert!((config.max_err - DEFAULT_MAX_TIMING_ERROR).abs() < f64::EPSILON);
        assert!(!config.tracing_enabled);
        assert_eq!(config.divisor().map(crate::ClockDivisor::get), Ok(2500));
    }

    #[test]
    fn config_divisor_propagates_setup_errors() {
        let config = UartConfig::with_rates(1_000, 2_000);
        assert!(matches!(
            config.divisor(),
            Err(ConfigError::InvalidDivisor { .. })
        ));
    }

    #[test]
    fn vec_sink_records_in_order() {
        let mut sink: Vec<TraceEvent> = Vec::new();
        sink.on_event(TraceEvent::BitSampled {
            tick: 3,
            index: 0,
            level: true,
        });
        sink.on_event(TraceEvent::FramingFault {
            tick: 9,
            cause: FramingError::Overrun,
        });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].tick(), 3);
        assert_eq!(sink[1].tick(), 9);
    }

    #[test]
    fn snapshot_errors_describe_the_bad_field() {
        assert_eq!(
            SnapshotError::CounterOutOfRange {
                counter: 30,
                divisor: 24
            }
            .to_string(),
            "snapshot counter 30 out of range for divisor 24"
        );
        assert_eq!(
            SnapshotError::FaultStateMismatch(ReceiverState::Full).to_string(),
            "snapshot fault cause does not match state full"
        );
    }
}
