//! Receiver protocol engine.

/// Receiver state enumeration.
pub mod state;
pub use state::ReceiverState;

/// Register set, tick update function, and owning receiver.
pub mod engine;
pub use engine::{rx_update, Receiver, RxInputs, RxOutputs, RxRegisters, SampledBit};
