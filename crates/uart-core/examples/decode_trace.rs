//! Prints the receiver trace for the 24 MHz / 1 Mbaud bench sequence.

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use uart_core::{
    frame_levels, frame_levels_with_stop, ConfigError, Receiver, RxInputs, TraceEvent, TraceSink,
    UartConfig,
};

struct StdoutSink;

impl TraceSink for StdoutSink {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::StateChanged { tick, from, to } => println!("{tick:>6}  {from} -> {to}"),
            TraceEvent::BitSampled { tick, index, level } => {
                println!("{tick:>6}  bit {index} = {}", u8::from(level));
            }
            TraceEvent::ByteReceived { tick, value } => println!("{tick:>6}  byte 0x{value:02X}"),
            TraceEvent::FramingFault { tick, cause } => println!("{tick:>6}  fault: {cause}"),
        }
    }
}

fn send(rx: &mut Receiver, levels: [bool; 10], sink: &mut StdoutSink) {
    for level in levels {
        for _ in 0..rx.divisor().get() {
            rx.step_traced(RxInputs::line(level), sink);
        }
    }
}

fn main() -> Result<(), ConfigError> {
    let mut rx = Receiver::from_config(&UartConfig::with_rates(24_000_000, 1_000_000))?;
    let mut sink = StdoutSink;

    send(&mut rx, frame_levels(0xAF), &mut sink);
    rx.step_traced(RxInputs::line(true).with_ack(), &mut sink);
    send(&mut rx, frame_levels_with_stop(0x24, false), &mut sink);
    rx.step_traced(RxInputs::line(true).with_fix(), &mut sink);
    send(&mut rx, frame_levels(0x24), &mut sink);
    rx.step_traced(RxInputs::line(true).with_ack(), &mut sink);

    println!("final state: {}", rx.state());
    Ok(())
}
