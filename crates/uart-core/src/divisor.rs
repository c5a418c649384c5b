//! Clock divider derivation for bit timing.

use crate::ConfigError;

/// Default relative timing tolerance accepted by [`compute_divisor`].
pub const DEFAULT_MAX_TIMING_ERROR: f64 = 0.05;

/// Integer number of system clock ticks per bit period.
///
/// Always at least 1. Produced once at configuration time and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ClockDivisor(u32);

impl ClockDivisor {
    /// Wraps a raw divisor, rejecting zero.
    #[must_use]
    pub const fn new(ticks_per_bit: u32) -> Option<Self> {
        if ticks_per_bit == 0 {
            None
        } else {
            Some(Self(ticks_per_bit))
        }
    }

    /// Returns the number of ticks per bit period.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Highest counter value before the bit counter wraps.
    #[must_use]
    pub const fn max_count(self) -> u32 {
        self.0 - 1
    }

    /// Counter preload that moves the next strobe to the middle of a bit.
    #[must_use]
    pub const fn half_period(self) -> u32 {
        self.0 / 2
    }

    /// Bit rate actually produced by this divisor at `clk_freq_hz`.
    #[must_use]
    pub fn achieved_rate(self, clk_freq_hz: u32) -> f64 {
        f64::from(clk_freq_hz) / f64::from(self.0)
    }

    /// Relative deviation of the achieved rate from `baud_rate`.
    #[must_use]
    pub fn relative_error(self, clk_freq_hz: u32, baud_rate: u32) -> f64 {
        let target = f64::from(baud_rate);
        ((self.achieved_rate(clk_freq_hz) - target) / target).abs()
    }
}

/// Computes the bit-period divisor for a system clock and baud rate.
///
/// The divisor is `clk_freq_hz / baud_rate` rounded down.
///
/// # Errors
///
/// - [`ConfigError::InvalidTolerance`] when `max_err` is negative or not finite.
/// - [`ConfigError::InvalidDivisor`] when the baud rate is zero or exceeds the
///   clock frequency.
/// - [`ConfigError::ExcessiveTimingError`] when the floor divisor deviates from
///   the requested rate by more than `max_err`.
pub fn compute_divisor(
    clk_freq_hz: u32,
    baud_rate: u32,
    max_err: f64,
) -> Result<ClockDivisor, ConfigError> {
    if !max_err.is_finite() || max_err < 0.0 {
        return Err(ConfigError::InvalidTolerance { max_err });
    }

    let divisor = clk_freq_hz
        .checked_div(baud_rate)
        .and_then(ClockDivisor::new)
        .ok_or(ConfigError::InvalidDivisor {
            clk_freq_hz,
            baud_rate,
        })?;

    let error = divisor.relative_error(clk_freq_hz, baud_rate);
    if error > max_err {
        return Err(ConfigError::ExcessiveTimingError { error, max_err });
    }

    Ok(divisor)
}

#[cfg(test)]
mod tests {
    use super::{compute_divisor, ClockDivisor, DEFAULT_MAX_TIMING_ERROR};
    use crate::ConfigError;

    #[test]
    fn exact_ratio_yields_floor_divisor() {
        let div = compute_divisor(24_000_000, 1_000_000, DEFAULT_MAX_TIMING_ERROR)
            .expect("24 MHz / 1 Mbaud is exact");
        assert_eq!(div.get(), 24);
        assert_eq!(div.half_period(), 12);
        assert_eq!(div.max_count(), 23);
    }

    #[test]
    fn classic_rates_from_24mhz_are_within_tolerance() {
        assert_eq!(
            compute_divisor(24_000_000, 9600, DEFAULT_MAX_TIMING_ERROR).map(ClockDivisor::get),
            Ok(2500)
        );
        assert_eq!(
            compute_divisor(24_000_000, 115_200, DEFAULT_MAX_TIMING_ERROR).map(ClockDivisor::get),
            Ok(208)
        );
    }

    #[test]
    fn equal_rates_produce_unit_divisor() {
        assert_eq!(
            compute_divisor(1_000, 1_000, 0.0).map(ClockDivisor::get),
            Ok(1)
        );
    }

    #[test]
    fn baud_above_clock_is_invalid_divisor() {
        assert_eq!(
            compute_divisor(9600, 115_200, DEFAULT_MAX_TIMING_ERROR),
            Err(ConfigError::InvalidDivisor {
                clk_freq_hz: 9600,
                baud_rate: 115_200,
            })
        );
    }

    #[test]
    fn zero_baud_is_invalid_divisor() {
        assert!(matches!(
            compute_divisor(24_000_000, 0, DEFAULT_MAX_TIMING_ERROR),
            Err(ConfigError::InvalidDivisor { .. })
        ));
    }

    #[test]
    fn coarse_divisor_exceeds_tolerance() {
        // 10 / 6 floors to 1, which runs 66% fast.
        let err = compute_divisor(10, 6, DEFAULT_MAX_TIMING_ERROR).unwrap_err();
        match err {
            ConfigError::ExcessiveTimingError { error, max_err } => {
                assert!((error - 4.0 / 6.0).abs() < 1e-12);
                assert!((max_err - DEFAULT_MAX_TIMING_ERROR).abs() < f64::EPSILON);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tolerance_must_be_finite_and_non_negative() {
        assert!(matches!(
            compute_divisor(24_000_000, 9600, -0.01),
            Err(ConfigError::InvalidTolerance { .. })
        ));
        assert!(matches!(
            compute_divisor(24_000_000, 9600, f64::NAN),
            Err(ConfigError::InvalidTolerance { .. })
        ));
        assert!(matches!(
            compute_divisor(24_000_000, 9600, f64::INFINITY),
            Err(ConfigError::InvalidTolerance { .. })
        ));
    }

    #[test]
    fn raw_divisor_rejects_zero() {
        assert_eq!(ClockDivisor::new(0), None);
        assert_eq!(ClockDivisor::new(3).map(ClockDivisor::get), Some(3));
    }
}
