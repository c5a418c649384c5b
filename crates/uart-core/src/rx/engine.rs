//! Receiver register set and its per-tick update.
//!
//! Every tick reads the registers latched by the previous tick plus the live
//! line level and handshake inputs, and produces the next register set. The
//! owning [`Receiver`] only swaps the result in, so the update itself stays a
//! pure function that tests and harnesses can drive directly.

use crate::{
    BitTimer, ClockDivisor, ConfigError, FramingError, ReceiverSnapshot, ReceiverState,
    SnapshotError, SnapshotVersion, TraceEvent, TraceSink, UartConfig, DATA_BITS, LINE_IDLE,
};

/// `BitIndex` is a 3-bit register.
const BIT_INDEX_MASK: u8 = DATA_BITS - 1;

/// Externally driven inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RxInputs {
    /// Serial line level; high is idle.
    pub rx: bool,
    /// Consumer claims the buffered byte. Latched until the next start bit.
    pub ack: bool,
    /// Consumer clears a framing error. Latched until the next start bit.
    pub fix: bool,
}

impl Default for RxInputs {
    fn default() -> Self {
        Self::line(LINE_IDLE)
    }
}

impl RxInputs {
    /// Inputs carrying only a line level.
    #[must_use]
    pub const fn line(rx: bool) -> Self {
        Self {
            rx,
            ack: false,
            fix: false,
        }
    }

    /// Adds an acknowledge assertion.
    #[must_use]
    pub const fn with_ack(mut self) -> Self {
        self.ack = true;
        self
    }

    /// Adds a fix assertion.
    #[must_use]
    pub const fn with_fix(mut self) -> Self {
        self.fix = true;
        self
    }
}

/// A data bit latched on a Data-state strobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampledBit {
    /// Position within the word, LSB first.
    pub index: u8,
    /// Sampled line level.
    pub level: bool,
}

/// Observable results of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RxOutputs {
    /// Sampling strobe seen on this tick.
    pub strobe: bool,
    /// State the tick started in.
    pub previous: ReceiverState,
    /// State after the tick.
    pub state: ReceiverState,
    /// Data bit latched on this tick.
    pub sampled: Option<SampledBit>,
    /// Byte that became available on this tick.
    pub received: Option<u8>,
    /// Framing fault latched on this tick.
    pub fault: Option<FramingError>,
}

impl RxOutputs {
    const fn quiet(strobe: bool, state: ReceiverState) -> Self {
        Self {
            strobe,
            previous: state,
            state,
            sampled: None,
            received: None,
            fault: None,
        }
    }

    /// True when the tick moved the receiver to a different state.
    #[must_use]
    pub fn changed_state(&self) -> bool {
        self.previous != self.state
    }
}

/// Complete receiver register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RxRegisters {
    state: ReceiverState,
    timer: BitTimer,
    buffer: u8,
    bit_index: u8,
    ack: bool,
    fix: bool,
    fault: Option<FramingError>,
}

impl RxRegisters {
    /// Power-on register values for `divisor`.
    #[must_use]
    pub const fn new(divisor: ClockDivisor) -> Self {
        Self {
            state: ReceiverState::Idle,
            timer: BitTimer::new(divisor),
            buffer: 0,
            bit_index: 0,
            ack: false,
            fix: false,
            fault: None,
        }
    }

    /// Active state.
    #[must_use]
    pub const fn state(&self) -> ReceiverState {
        self.state
    }

    /// Bit-timing counter.
    #[must_use]
    pub const fn timer(&self) -> BitTimer {
        self.timer
    }

    /// Raw receive shift register.
    #[must_use]
    pub const fn buffer(&self) -> u8 {
        self.buffer
    }

    /// Number of data bits latched in the current word, modulo 8.
    #[must_use]
    pub const fn bit_index(&self) -> u8 {
        self.bit_index
    }

    /// Acknowledge latch.
    #[must_use]
    pub const fn ack(&self) -> bool {
        self.ack
    }

    /// Fix latch.
    #[must_use]
    pub const fn fix(&self) -> bool {
        self.fix
    }

    /// Latched framing cause; only present in `Error`.
    #[must_use]
    pub const fn fault(&self) -> Option<FramingError> {
        self.fault
    }
}

/// Computes the next register set and this tick's outputs.
///
/// Transitions read `registers` as latched by the previous tick; the line
/// level and handshake assertions in `inputs` are read live.
#[must_use]
pub fn rx_update(registers: &RxRegisters, inputs: RxInputs) -> (RxRegisters, RxOutputs) {
    let strobe = registers.timer.strobe();
    let ack = registers.ack || inputs.ack;
    let fix = registers.fix || inputs.fix;

    let mut next = RxRegisters {
        timer: registers.timer.advanced(),
        ack,
        fix,
        ..*registers
    };
    let mut outputs = RxOutputs::quiet(strobe, registers.state);

    match registers.state {
        ReceiverState::Idle => {
            if !inputs.rx {
                next.state = ReceiverState::Start;
                next.ack = false;
                next.fix = false;
                next.bit_index = 0;
                next.buffer = 0;
                next.timer = registers.timer.realigned_to_midpoint();
            }
        }
        ReceiverState::Start => {
            if strobe {
                next.state = ReceiverState::Data;
            }
        }
        ReceiverState::Data => {
            if strobe {
                next.buffer = (registers.buffer >> 1) | (u8::from(inputs.rx) << 7);
                next.bit_index = (registers.bit_index + 1) & BIT_INDEX_MASK;
                outputs.sampled = Some(SampledBit {
                    index: registers.bit_index,
                    level: inputs.rx,
                });
                if registers.bit_index == BIT_INDEX_MASK {
                    next.state = ReceiverState::Stop;
                }
            }
        }
        ReceiverState::Stop => {
            if strobe {
                if inputs.rx {
                    next.state = ReceiverState::Full;
                    outputs.received = Some(registers.buffer);
                } else {
                    next.state = ReceiverState::Error;
                    next.fault = Some(FramingError::MissingStopBit);
                    outputs.fault = next.fault;
                }
            }
        }
        ReceiverState::Full => {
            if ack {
                next.state = ReceiverState::Idle;
            } else if !inputs.rx {
                next.state = ReceiverState::Error;
                next.fault = Some(FramingError::Overrun);
                outputs.fault = next.fault;
            }
        }
        ReceiverState::Error => {
            if fix {
                next.state = ReceiverState::Idle;
                next.fault = None;
            }
        }
    }

    outputs.state = next.state;
    (next, outputs)
}

/// UART receiver owning its registers and tick count.
///
/// Samples each bit once, at the middle of its period. The first sample is
/// realigned off the start-bit edge, so divisors below 4 cannot land samples
/// inside their bit periods and are only useful for timing experiments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    registers: RxRegisters,
    ticks: u64,
}

impl Receiver {
    /// Creates an idle receiver for an already validated divisor.
    #[must_use]
    pub const fn new(divisor: ClockDivisor) -> Self {
        Self {
            registers: RxRegisters::new(divisor),
            ticks: 0,
        }
    }

    /// Creates an idle receiver from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no acceptable divisor exists.
    pub fn from_config(config: &UartConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.divisor()?))
    }

    /// Advances one tick.
    pub fn step(&mut self, inputs: RxInputs) -> RxOutputs {
        let (next, outputs) = rx_update(&self.registers, inputs);
        self.registers = next;
        self.ticks = self.ticks.wrapping_add(1);
        outputs
    }

    /// Advances one tick and reports what happened to `sink`.
    pub fn step_traced(&mut self, inputs: RxInputs, sink: &mut dyn TraceSink) -> RxOutputs {
        let tick = self.ticks;
        let outputs = self.step(inputs);
        emit_trace(tick, &outputs, sink);
        outputs
    }

    /// Restores power-on registers, keeping the divisor.
    pub fn reset(&mut self) {
        *self = Self::new(self.divisor());
    }

    /// Current register set.
    #[must_use]
    pub const fn registers(&self) -> &RxRegisters {
        &self.registers
    }

    /// Active state.
    #[must_use]
    pub const fn state(&self) -> ReceiverState {
        self.registers.state
    }

    /// Raw receive buffer, regardless of state.
    #[must_use]
    pub const fn buffer(&self) -> u8 {
        self.registers.buffer
    }

    /// Received byte; only available while `Full`.
    #[must_use]
    pub fn data(&self) -> Option<u8> {
        (self.registers.state == ReceiverState::Full).then_some(self.registers.buffer)
    }

    /// Latched framing cause while in `Error`.
    #[must_use]
    pub const fn fault(&self) -> Option<FramingError> {
        self.registers.fault
    }

    /// Ticks per bit period.
    #[must_use]
    pub const fn divisor(&self) -> ClockDivisor {
        self.registers.timer.divisor()
    }

    /// Ticks elapsed since construction or reset.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Exports the register set.
    #[must_use]
    pub const fn snapshot(&self) -> ReceiverSnapshot {
        let registers = &self.registers;
        ReceiverSnapshot {
            version: SnapshotVersion::V1,
            divisor: registers.timer.divisor().get(),
            counter: registers.timer.counter(),
            state: registers.state,
            buffer: registers.buffer,
            bit_index: registers.bit_index,
            ack: registers.ack,
            fix: registers.fix,
            fault: registers.fault,
            ticks: self.ticks,
        }
    }

    /// Rebuilds a receiver from an exported register set.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when a field violates a register invariant.
    pub fn from_snapshot(snapshot: &ReceiverSnapshot) -> Result<Self, SnapshotError> {
        let divisor = ClockDivisor::new(snapshot.divisor).ok_or(SnapshotError::ZeroDivisor)?;
        let timer = BitTimer::with_counter(divisor, snapshot.counter).ok_or(
            SnapshotError::CounterOutOfRange {
                counter: snapshot.counter,
                divisor: snapshot.divisor,
            },
        )?;
        if snapshot.bit_index > BIT_INDEX_MASK {
            return Err(SnapshotError::BitIndexOutOfRange(snapshot.bit_index));
        }
        if snapshot.fault.is_some() != (snapshot.state == ReceiverState::Error) {
            return Err(SnapshotError::FaultStateMismatch(snapshot.state));
        }

        Ok(Self {
            registers: RxRegisters {
                state: snapshot.state,
                timer,
                buffer: snapshot.buffer,
                bit_index: snapshot.bit_index,
                ack: snapshot.ack,
                fix: snapshot.fix,
                fault: snapshot.fault,
            },
            ticks: snapshot.ticks,
        })
    }
}

fn emit_trace(tick: u64, outputs: &RxOutputs, sink: &mut dyn TraceSink) {
    if let Some(bit) = outputs.sampled {
        sink.on_event(TraceEvent::BitSampled {
            tick,
            index: bit.index,
            level: bit.level,
        });
    }
    if let Some(value) = outputs.received {
        sink.on_event(TraceEvent::ByteReceived { tick, value });
    }
    if let Some(cause) = outputs.fault {
        sink.on_event(TraceEvent::FramingFault { tick, cause });
    }
    if outputs.changed_state() {
        sink.on_event(TraceEvent::StateChanged {
            tick,
            from: outputs.previous,
            to: outputs.state,
        });
    }
}
