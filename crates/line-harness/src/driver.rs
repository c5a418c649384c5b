//! Drives a [`Uart`] one system tick at a time.
//!
//! The driver owns the far end of the receive line. Bit edges are placed at
//! the configured baud rate measured in system ticks, so an inexact divisor
//! shows up as drift between the line and the receiver's sampling strobe.

use std::mem;

use uart_core::{
    frame_levels, frame_levels_with_stop, ConfigError, FramingError, Receiver, ReceiverState,
    RxInputs, RxOutputs, TraceSink, Uart, UartConfig, FRAME_BITS, LINE_IDLE, STOP_BIT_LEVEL,
};

/// External actor feeding the receive line and handshake signals.
pub struct LineDriver {
    uart: Uart,
    line: bool,
    pending_ack: bool,
    pending_fix: bool,
    elapsed: u64,
    received: Vec<u8>,
    faults: Vec<FramingError>,
    sink: Option<Box<dyn TraceSink>>,
}

impl LineDriver {
    /// Creates a driver with the line idle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` has no acceptable divisor.
    pub fn new(config: UartConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            uart: Uart::new(config)?,
            line: LINE_IDLE,
            pending_ack: false,
            pending_fix: false,
            elapsed: 0,
            received: Vec::new(),
            faults: Vec::new(),
            sink: None,
        })
    }

    /// Routes receiver trace events to `sink` when the config enables tracing.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Advances one system tick with the current line level.
    ///
    /// Pending handshake assertions ride on this tick and are then dropped;
    /// the receiver keeps its own latch.
    pub fn tick(&mut self) -> RxOutputs {
        let inputs = RxInputs {
            rx: self.line,
            ack: mem::take(&mut self.pending_ack),
            fix: mem::take(&mut self.pending_fix),
        };
        let outputs = match self.sink.as_deref_mut() {
            Some(sink) => self.uart.step_traced(inputs, sink),
            None => self.uart.step(inputs),
        };
        self.elapsed += 1;
        self.received.extend(outputs.received);
        self.faults.extend(outputs.fault);
        outputs
    }

    /// Holds the current line level for `ticks` ticks.
    pub fn wait(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Holds the current line level for `bits` bit periods at the line rate.
    pub fn wait_bits(&mut self, bits: u32) {
        self.wait(self.bit_edge(u64::from(bits)));
    }

    /// Sets the line level seen from the next tick on.
    pub fn set_line(&mut self, level: bool) {
        self.line = level;
    }

    /// Current line level.
    #[must_use]
    pub const fn line(&self) -> bool {
        self.line
    }

    /// Asserts `ack` on the next tick.
    pub fn ack(&mut self) {
        self.pending_ack = true;
    }

    /// Asserts `fix` on the next tick.
    pub fn fix(&mut self) {
        self.pending_fix = true;
    }

    /// Sends one well-formed frame for `value`.
    pub fn send_byte(&mut self, value: u8) {
        self.send_levels(frame_levels(value));
    }

    /// Sends a frame for `value` with an explicit stop-bit level.
    pub fn send_frame(&mut self, value: u8, stop_level: bool) {
        if stop_level == STOP_BIT_LEVEL {
            self.send_byte(value);
        } else {
            self.send_levels(frame_levels_with_stop(value, stop_level));
        }
    }

    /// Drives one level per bit period, leaving the line at the last level.
    pub fn send_levels(&mut self, levels: [bool; FRAME_BITS]) {
        let mut start = 0;
        for (bit, level) in (1u64..).zip(levels) {
            let end = self.bit_edge(bit);
            self.set_line(level);
            self.wait(end - start);
            start = end;
        }
    }

    /// Tick offset of the `bits`-th bit edge from the start of a frame.
    #[must_use]
    pub fn bit_edge(&self, bits: u64) -> u64 {
        let config = self.uart.config();
        bits * u64::from(config.clk_freq_hz) / u64::from(config.baud_rate)
    }

    /// Receive engine.
    #[must_use]
    pub const fn receiver(&self) -> &Receiver {
        self.uart.rx()
    }

    /// Receiver state.
    #[must_use]
    pub const fn state(&self) -> ReceiverState {
        self.uart.rx().state()
    }

    /// Ticks driven so far.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Bytes that reached `Full`, in arrival order.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Framing faults latched, in order.
    #[must_use]
    pub fn faults(&self) -> &[FramingError] {
        &self.faults
    }
}
