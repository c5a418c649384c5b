//! Line levels for one UART frame: start bit, 8 data bits LSB-first, stop bit.

/// Number of bit periods in one frame.
pub const FRAME_BITS: usize = 10;

/// Number of data bits per frame.
pub const DATA_BITS: u8 = 8;

/// Idle (mark) level of the line.
pub const LINE_IDLE: bool = true;

/// Level of the start bit.
pub const START_BIT_LEVEL: bool = false;

/// Level of a valid stop bit.
pub const STOP_BIT_LEVEL: bool = true;

/// Returns the line level for each bit period of a well-formed frame.
#[must_use]
pub const fn frame_levels(value: u8) -> [bool; FRAME_BITS] {
    frame_levels_with_stop(value, STOP_BIT_LEVEL)
}

/// Returns the line levels of a frame with an explicit stop-bit level.
///
/// A low stop level produces a frame the receiver rejects as a framing error.
#[must_use]
pub const fn frame_levels_with_stop(value: u8, stop_level: bool) -> [bool; FRAME_BITS] {
    let mut levels = [START_BIT_LEVEL; FRAME_BITS];
    let mut bit = 0;
    while bit < DATA_BITS {
        levels[1 + bit as usize] = (value >> bit) & 1 == 1;
        bit += 1;
    }
    levels[FRAME_BITS - 1] = stop_level;
    levels
}

#[cfg(test)]
mod tests {
    use super::{frame_levels, frame_levels_with_stop, FRAME_BITS};

    #[test]
    fn frame_is_start_lsb_first_then_stop() {
        // 0xAF = 1010_1111
        assert_eq!(
            frame_levels(0xAF),
            [false, true, true, true, true, false, true, false, true, true]
        );
    }

    #[test]
    fn corrupted_stop_bit_is_low() {
        let levels = frame_levels_with_stop(0x24, false);
        assert!(!levels[FRAME_BITS - 1]);
        assert!(!levels[0]);
        assert_eq!(&levels[1..9], &[false, false, true, false, false, true, false, false]);
    }
}
