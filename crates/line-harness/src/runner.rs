//! Executes parsed scripts against a [`LineDriver`].
//!
//! ## Execution Model
//!
//! 1. Overlay the script's `config` onto the caller's base configuration.
//! 2. Build a driver; setup errors abort the run before any tick.
//! 3. Execute commands in order. `expect` commands are evaluated against the
//!    receiver as it stands after every preceding command.
//! 4. Report bytes, faults, expectation results and a final register snapshot.

use std::fmt;

use serde::Serialize;
use uart_core::{
    ConfigError, FramingError, Receiver, ReceiverSnapshot, ReceiverState, TraceSink, UartConfig,
};

use crate::driver::LineDriver;
use crate::script::{fault_name, Command, Expectation, Script, WaitUnit};

/// Result of evaluating one `expect` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationResult {
    /// 1-indexed source line of the expectation.
    pub line: usize,
    /// The evaluated expectation.
    pub expectation: Expectation,
    /// Whether the expectation held.
    pub passed: bool,
    /// Observed value in script syntax.
    pub actual: String,
}

impl fmt::Display for ExpectationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "ok" } else { "FAILED" };
        write!(
            f,
            "line {}: expect {} ... {status} (actual: {})",
            self.line, self.expectation, self.actual
        )
    }
}

/// Pass and fail counts for a script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Expectations that held.
    pub passed: usize,
    /// Expectations that did not hold.
    pub failed: usize,
    /// All expectations.
    pub total: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)
    }
}

/// Outcome of one script run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    /// Ticks per bit period used for the run.
    pub divisor: u32,
    /// System ticks driven.
    pub ticks: u64,
    /// Bytes that reached `Full`, in arrival order.
    pub received: Vec<u8>,
    /// Framing faults latched, in order.
    pub faults: Vec<FramingError>,
    /// Receiver state after the last command.
    pub final_state: ReceiverState,
    /// Stable code of the latched framing fault, 0 when none.
    pub status: u8,
    /// True when the run ended in `Full` or `Error` without the handshake.
    pub awaiting_handshake: bool,
    /// Expectation results in script order.
    pub results: Vec<ExpectationResult>,
    /// Receiver registers after the last command.
    pub snapshot: ReceiverSnapshot,
}

impl ScriptReport {
    /// Returns true if every expectation held.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Returns counts for summary reporting.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let passed = self.results.iter().filter(|r| r.passed).count();
        RunSummary {
            passed,
            failed: self.results.len() - passed,
            total: self.results.len(),
        }
    }

    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only occurs on writer failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs `script` on a fresh driver.
///
/// # Arguments
///
/// * `script` - Parsed commands; its `config` overrides `base`.
/// * `base` - Configuration before script overrides.
/// * `sink` - Trace destination, used when the final config enables tracing.
///
/// # Errors
///
/// Returns [`ConfigError`] when the final configuration has no acceptable
/// divisor.
pub fn run_script(
    script: &Script,
    base: UartConfig,
    sink: Option<Box<dyn TraceSink>>,
) -> Result<ScriptReport, ConfigError> {
    let mut driver = LineDriver::new(script.config.apply(base))?;
    if let Some(sink) = sink {
        driver = driver.with_trace_sink(sink);
    }

    let mut results = Vec::with_capacity(script.expectation_count());
    for step in &script.steps {
        match step.command {
            Command::Send { value, stop_level } => driver.send_frame(value, stop_level),
            Command::Line(level) => driver.set_line(level),
            Command::Wait {
                count,
                unit: WaitUnit::Ticks,
            } => driver.wait(u64::from(count)),
            Command::Wait {
                count,
                unit: WaitUnit::Bits,
            } => driver.wait_bits(count),
            Command::Ack => driver.ack(),
            Command::Fix => driver.fix(),
            Command::Expect(expectation) => {
                results.push(evaluate(step.line, expectation, driver.receiver()));
            }
        }
    }

    let receiver = driver.receiver();
    Ok(ScriptReport {
        divisor: receiver.divisor().get(),
        ticks: driver.elapsed(),
        received: driver.received().to_vec(),
        faults: driver.faults().to_vec(),
        final_state: receiver.state(),
        status: receiver.fault().map_or(0, FramingError::as_u8),
        awaiting_handshake: receiver.state().awaits_handshake(),
        results,
        snapshot: receiver.snapshot(),
    })
}

fn evaluate(line: usize, expectation: Expectation, receiver: &Receiver) -> ExpectationResult {
    let (passed, actual) = match expectation {
        Expectation::State { operator, expected } => {
            let actual = receiver.state();
            (operator.holds(&actual, &expected), actual.to_string())
        }
        Expectation::Buffer { operator, expected } => {
            let actual = receiver.buffer();
            (operator.holds(&actual, &expected), format!("0x{actual:02X}"))
        }
        Expectation::Fault { operator, expected } => {
            let actual = receiver.fault();
            (
                operator.holds(&actual, &expected),
                fault_name(actual).to_string(),
            )
        }
    };

    ExpectationResult {
        line,
        expectation,
        passed,
        actual,
    }
}
