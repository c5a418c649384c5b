//! Combined receiver and transmitter sharing one configuration.

use crate::{ConfigError, Receiver, RxInputs, RxOutputs, TraceSink, Transmitter, UartConfig};

/// RX and TX engines clocked together from the same system tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Uart {
    config: UartConfig,
    rx: Receiver,
    tx: Transmitter,
}

impl Uart {
    /// Validates `config` and builds both engines.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no acceptable divisor exists.
    pub fn new(config: UartConfig) -> Result<Self, ConfigError> {
        let divisor = config.divisor()?;
        Ok(Self {
            config,
            rx: Receiver::new(divisor),
            tx: Transmitter::new(divisor),
        })
    }

    /// Configuration this instance was built from.
    #[must_use]
    pub const fn config(&self) -> &UartConfig {
        &self.config
    }

    /// Receive engine.
    #[must_use]
    pub const fn rx(&self) -> &Receiver {
        &self.rx
    }

    /// Transmit engine.
    #[must_use]
    pub const fn tx(&self) -> &Transmitter {
        &self.tx
    }

    /// Level on the transmit line.
    #[must_use]
    pub const fn tx_line(&self) -> bool {
        self.tx.tx()
    }

    /// Advances both engines one tick.
    pub fn step(&mut self, inputs: RxInputs) -> RxOutputs {
        self.tx.step();
        self.rx.step(inputs)
    }

    /// Advances both engines one tick, tracing when enabled in the config.
    pub fn step_traced(&mut self, inputs: RxInputs, sink: &mut dyn TraceSink) -> RxOutputs {
        self.tx.step();
        if self.config.tracing_enabled {
            self.rx.step_traced(inputs, sink)
        } else {
            self.rx.step(inputs)
        }
    }

    /// Restores both engines to power-on state.
    pub fn reset(&mut self) {
        self.rx.reset();
        self.tx.reset();
    }
}
