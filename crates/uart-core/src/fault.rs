use thiserror::Error;

/// Setup-time failures raised while deriving bit timing.
///
/// These are never produced by a running engine: a bad divisor corrupts all
/// downstream timing, so construction fails before the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// No positive integer divisor exists for the requested rates.
    #[error("invalid clock divider input ({clk_freq_hz} Hz / {baud_rate} baud)")]
    InvalidDivisor {
        /// System clock frequency in hertz.
        clk_freq_hz: u32,
        /// Requested baud rate.
        baud_rate: u32,
    },
    /// The closest integer divisor misses the requested rate by too much.
    #[error("clock divider error rate is too high ({error:.4} > {max_err:.4})")]
    ExcessiveTimingError {
        /// Relative deviation achieved by the floor divisor.
        error: f64,
        /// Caller-supplied tolerance.
        max_err: f64,
    },
    /// Tolerance is negative, NaN, or infinite.
    #[error("timing tolerance must be a finite non-negative fraction (got {max_err})")]
    InvalidTolerance {
        /// Rejected tolerance value.
        max_err: f64,
    },
}

/// Runtime framing faults latched by the receiver's `Error` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FramingError {
    /// Line was low when the stop bit was sampled.
    #[error("stop bit not observed after 8 data bits")]
    MissingStopBit = 0x01,
    /// A start bit arrived while the previous byte was still unclaimed.
    #[error("start bit detected before the buffered byte was acknowledged")]
    Overrun = 0x02,
}

impl FramingError {
    /// Converts a framing fault to its stable status code. Zero means no fault.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable status code back into a framing fault.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::MissingStopBit),
            0x02 => Some(Self::Overrun),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, FramingError};

    #[test]
    fn stable_code_roundtrip_is_bijective_for_defined_values() {
        for code in 0x01u8..=0x02 {
            let fault = FramingError::from_u8(code).expect("defined framing code");
            assert_eq!(fault.as_u8(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(FramingError::from_u8(0x00).is_none());
        assert!(FramingError::from_u8(0x03).is_none());
        assert!(FramingError::from_u8(0xFF).is_none());
    }

    #[test]
    fn config_error_messages_name_the_inputs() {
        let err = ConfigError::InvalidDivisor {
            clk_freq_hz: 9600,
            baud_rate: 115_200,
        };
        assert_eq!(
            err.to_string(),
            "invalid clock divider input (9600 Hz / 115200 baud)"
        );

        let err = ConfigError::ExcessiveTimingError {
            error: 0.25,
            max_err: 0.05,
        };
        assert_eq!(
            err.to_string(),
            "clock divider error rate is too high (0.2500 > 0.0500)"
        );
    }
}
