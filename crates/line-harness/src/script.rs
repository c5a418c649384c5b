//! Parsing for `.uart` line scripts.
//!
//! ## Supported Syntax
//!
//! - `config clk=<hz> baud=<rate> [max_err=<fraction>]` (first command only)
//! - `send <byte> [stop=high|low]`: one frame at the line rate
//! - `line high|low`: set the line level
//! - `wait <n> [ticks|bits]`: hold the line
//! - `ack`, `fix`: assert a handshake on the next tick
//! - `expect state ==|!= <idle|start|data|stop|full|error>`
//! - `expect buffer ==|!= <byte>`
//! - `expect fault ==|!= <none|missing-stop|overrun|status code>`
//! - Comments: `;` to end of line
//! - Literals: decimal, `0x` hex, `0b` binary

use std::fmt;

use serde::Serialize;
use uart_core::{FramingError, ReceiverState, UartConfig};

/// Rate overrides from a `config` command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScriptConfig {
    /// System clock frequency in hertz.
    pub clk_freq_hz: Option<u32>,
    /// Line rate in baud.
    pub baud_rate: Option<u32>,
    /// Timing tolerance.
    pub max_err: Option<f64>,
}

impl ScriptConfig {
    /// Overlays the fields set in the script onto `base`.
    #[must_use]
    pub fn apply(&self, base: UartConfig) -> UartConfig {
        UartConfig {
            clk_freq_hz: self.clk_freq_hz.unwrap_or(base.clk_freq_hz),
            baud_rate: self.baud_rate.unwrap_or(base.baud_rate),
            max_err: self.max_err.unwrap_or(base.max_err),
            ..base
        }
    }

    /// Returns this config with every field set in `overrides` replaced.
    #[must_use]
    pub fn overridden_by(self, overrides: Self) -> Self {
        Self {
            clk_freq_hz: overrides.clk_freq_hz.or(self.clk_freq_hz),
            baud_rate: overrides.baud_rate.or(self.baud_rate),
            max_err: overrides.max_err.or(self.max_err),
        }
    }
}

/// Comparison operator for expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOp {
    /// Expect equality (`==`).
    Equal,
    /// Expect inequality (`!=`).
    NotEqual,
}

impl ComparisonOp {
    /// Applies the operator.
    #[must_use]
    pub fn holds<T: PartialEq>(self, actual: &T, expected: &T) -> bool {
        match self {
            Self::Equal => actual == expected,
            Self::NotEqual => actual != expected,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
        }
    }
}

/// A check against the receiver's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Expectation {
    /// Receiver state comparison.
    State {
        /// The comparison operator.
        operator: ComparisonOp,
        /// Expected state.
        expected: ReceiverState,
    },
    /// Raw receive buffer comparison.
    Buffer {
        /// The comparison operator.
        operator: ComparisonOp,
        /// Expected byte.
        expected: u8,
    },
    /// Latched framing cause comparison.
    Fault {
        /// The comparison operator.
        operator: ComparisonOp,
        /// Expected cause, `None` for no fault.
        expected: Option<FramingError>,
    },
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State { operator, expected } => write!(f, "state {operator} {expected}"),
            Self::Buffer { operator, expected } => {
                write!(f, "buffer {operator} 0x{expected:02X}")
            }
            Self::Fault { operator, expected } => {
                write!(f, "fault {operator} {}", fault_name(*expected))
            }
        }
    }
}

/// Unit for `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUnit {
    /// System clock ticks.
    Ticks,
    /// Bit periods at the line rate.
    Bits,
}

/// One executable script command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Send a frame.
    Send {
        /// Data byte.
        value: u8,
        /// Stop-bit level; low corrupts the frame.
        stop_level: bool,
    },
    /// Set the line level.
    Line(bool),
    /// Hold the line.
    Wait {
        /// Duration.
        count: u32,
        /// Unit of `count`.
        unit: WaitUnit,
    },
    /// Assert `ack` on the next tick.
    Ack,
    /// Assert `fix` on the next tick.
    Fix,
    /// Check receiver state.
    Expect(Expectation),
}

/// A command with its 1-indexed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep {
    /// 1-indexed source line.
    pub line: usize,
    /// Parsed command.
    pub command: Command,
}

/// A parsed script.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    /// Rate overrides.
    pub config: ScriptConfig,
    /// Commands in order.
    pub steps: Vec<ScriptStep>,
}

impl Script {
    /// Number of `expect` commands.
    #[must_use]
    pub fn expectation_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step.command, Command::Expect(_)))
            .count()
    }
}

/// Error parsing a script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScriptError {
    /// 1-indexed source line.
    pub line: usize,
    /// The problematic text.
    pub text: String,
    /// Description of the error.
    pub message: String,
}

impl fmt::Display for ParseScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} (in '{}')", self.line, self.message, self.text)
    }
}

impl std::error::Error for ParseScriptError {}

/// Parses script text.
///
/// # Errors
///
/// Returns [`ParseScriptError`] for the first line with invalid syntax, and
/// for a `config` command that is repeated or follows another command.
pub fn parse_script(source: &str) -> Result<Script, ParseScriptError> {
    let mut script = Script::default();
    let mut seen_config = false;

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }

        let error = |message: String| ParseScriptError {
            line,
            text: text.to_string(),
            message,
        };

        let mut words = text.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        if keyword == "config" {
            if seen_config || !script.steps.is_empty() {
                return Err(error(
                    "config must appear once, before any other command".to_string(),
                ));
            }
            seen_config = true;
            script.config = parse_config(&args).map_err(error)?;
            continue;
        }

        let command = parse_command(&keyword, &args).map_err(error)?;
        script.steps.push(ScriptStep { line, command });
    }

    Ok(script)
}

fn strip_comment(line: &str) -> &str {
    line.find(';').map_or(line, |pos| &line[..pos])
}

fn parse_config(args: &[&str]) -> Result<ScriptConfig, String> {
    let mut config = ScriptConfig::default();
    if args.is_empty() {
        return Err("config needs at least one key=value pair".to_string());
    }
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
        match key.to_ascii_lowercase().as_str() {
            "clk" => config.clk_freq_hz = Some(parse_u32(value)?),
            "baud" => config.baud_rate = Some(parse_u32(value)?),
            "max_err" => {
                config.max_err = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("invalid tolerance '{value}'"))?,
                );
            }
            other => return Err(format!("unknown config key '{other}'")),
        }
    }
    Ok(config)
}

fn parse_command(keyword: &str, args: &[&str]) -> Result<Command, String> {
    match (keyword, args) {
        ("send", [value]) => Ok(Command::Send {
            value: parse_u8(value)?,
            stop_level: true,
        }),
        ("send", [value, stop]) => {
            let level = stop
                .strip_prefix("stop=")
                .ok_or_else(|| format!("expected stop=high|low, got '{stop}'"))?;
            Ok(Command::Send {
                value: parse_u8(value)?,
                stop_level: parse_level(level)?,
            })
        }
        ("line", [level]) => Ok(Command::Line(parse_level(level)?)),
        ("wait", [count]) => Ok(Command::Wait {
            count: parse_u32(count)?,
            unit: WaitUnit::Ticks,
        }),
        ("wait", [count, unit]) => {
            let unit = match unit.to_ascii_lowercase().as_str() {
                "tick" | "ticks" => WaitUnit::Ticks,
                "bit" | "bits" => WaitUnit::Bits,
                other => return Err(format!("unknown wait unit '{other}'")),
            };
            Ok(Command::Wait {
                count: parse_u32(count)?,
                unit,
            })
        }
        ("ack", []) => Ok(Command::Ack),
        ("fix", []) => Ok(Command::Fix),
        ("expect", [subject, operator, expected]) => {
            parse_expectation(subject, operator, expected).map(Command::Expect)
        }
        ("send" | "line" | "wait" | "ack" | "fix" | "expect", _) => {
            Err(format!("wrong number of arguments for '{keyword}'"))
        }
        _ => Err(format!("unknown command '{keyword}'")),
    }
}

fn parse_expectation(subject: &str, operator: &str, expected: &str) -> Result<Expectation, String> {
    let operator = match operator {
        "==" => ComparisonOp::Equal,
        "!=" => ComparisonOp::NotEqual,
        other => return Err(format!("expected '==' or '!=', got '{other}'")),
    };

    match subject.to_ascii_lowercase().as_str() {
        "state" => {
            let expected = ReceiverState::from_name(expected)
                .ok_or_else(|| format!("unknown receiver state '{expected}'"))?;
            Ok(Expectation::State { operator, expected })
        }
        "buffer" => Ok(Expectation::Buffer {
            operator,
            expected: parse_u8(expected)?,
        }),
        "fault" => Ok(Expectation::Fault {
            operator,
            expected: parse_fault(expected)?,
        }),
        other => Err(format!("unknown expectation subject '{other}'")),
    }
}

/// Script name for a latched fault.
#[must_use]
pub const fn fault_name(fault: Option<FramingError>) -> &'static str {
    match fault {
        None => "none",
        Some(FramingError::MissingStopBit) => "missing-stop",
        Some(FramingError::Overrun) => "overrun",
    }
}

fn parse_fault(text: &str) -> Result<Option<FramingError>, String> {
    match text.to_ascii_lowercase().as_str() {
        "none" => Ok(None),
        "missing-stop" => Ok(Some(FramingError::MissingStopBit)),
        "overrun" => Ok(Some(FramingError::Overrun)),
        other => match parse_u8(other) {
            Ok(0) => Ok(None),
            Ok(code) => FramingError::from_u8(code)
                .map(Some)
                .ok_or_else(|| format!("unknown fault code 0x{code:02X}")),
            Err(_) => Err(format!("unknown fault '{other}'")),
        },
    }
}

fn parse_level(text: &str) -> Result<bool, String> {
    match text.to_ascii_lowercase().as_str() {
        "high" | "1" => Ok(true),
        "low" | "0" => Ok(false),
        other => Err(format!("expected high or low, got '{other}'")),
    }
}

fn parse_u32(text: &str) -> Result<u32, String> {
    let text = text.replace('_', "");
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = text
        .strip_prefix("0b")
        .or_else(|| text.strip_prefix("0B"))
    {
        (bin, 2)
    } else {
        (text.as_str(), 10)
    };
    u32::from_str_radix(digits, radix).map_err(|_| format!("invalid number '{text}'"))
}

fn parse_u8(text: &str) -> Result<u8, String> {
    let value = parse_u32(text)?;
    u8::try_from(value).map_err(|_| format!("value {value} does not fit in a byte"))
}
