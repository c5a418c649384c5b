use core::fmt;

/// Receiver state machine position. Exactly one is active per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ReceiverState {
    /// Line idle (high); waiting for a start bit.
    #[default]
    Idle,
    /// Start bit seen; waiting for the realigned mid-bit strobe.
    Start,
    /// Shifting in the 8 data bits.
    Data,
    /// Waiting to sample the stop bit.
    Stop,
    /// Byte complete; held until acknowledged.
    Full,
    /// Framing error latched; held until fixed.
    Error,
}

impl ReceiverState {
    /// All states in protocol order.
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Start,
        Self::Data,
        Self::Stop,
        Self::Full,
        Self::Error,
    ];

    /// Stable lowercase name used in traces and scripts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Start => "start",
            Self::Data => "data",
            Self::Stop => "stop",
            Self::Full => "full",
            Self::Error => "error",
        }
    }

    /// Parses a state name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(name))
    }

    /// True in states that wait for an external handshake.
    #[must_use]
    pub const fn awaits_handshake(self) -> bool {
        matches!(self, Self::Full | Self::Error)
    }
}

impl fmt::Display for ReceiverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
