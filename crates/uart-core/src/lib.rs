//! Cycle-level UART receiver model.
//!
//! A system tick drives every engine in lock-step. The receiver samples its
//! line once per bit period at the bit's midpoint and decodes 8-bit words
//! framed by one start bit and one stop bit, no parity, LSB first.

/// Setup-time and line fault types.
pub mod fault;
pub use fault::{ConfigError, FramingError};

/// Clock divider derivation.
pub mod divisor;
pub use divisor::{compute_divisor, ClockDivisor, DEFAULT_MAX_TIMING_ERROR};

/// Bit-period counter and sampling strobe.
pub mod timing;
pub use timing::BitTimer;

/// Frame layout and line levels.
pub mod frame;
pub use frame::{
    frame_levels, frame_levels_with_stop, DATA_BITS, FRAME_BITS, LINE_IDLE, START_BIT_LEVEL,
    STOP_BIT_LEVEL,
};

/// Host-facing configuration, trace, and snapshot types.
pub mod api;
pub use api::{
    ReceiverSnapshot, SnapshotError, SnapshotVersion, TraceEvent, TraceSink, UartConfig,
    DEFAULT_BAUD_RATE, DEFAULT_CLK_FREQ_HZ,
};

/// Receiver protocol engine.
pub mod rx;
pub use rx::{rx_update, Receiver, ReceiverState, RxInputs, RxOutputs, RxRegisters, SampledBit};

/// Transmitter timing.
pub mod tx;
pub use tx::Transmitter;

/// Combined receiver and transmitter.
pub mod uart;
pub use uart::Uart;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
