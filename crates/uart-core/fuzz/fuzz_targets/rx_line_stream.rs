#![no_main]

use libfuzzer_sys::fuzz_target;
use uart_core::{compute_divisor, ClockDivisor, Receiver, ReceiverState, RxInputs};

fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }

    let clk = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let baud = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    let _ = compute_divisor(clk, baud, 0.05);

    let Some(divisor) = ClockDivisor::new(u32::from(data[8]).max(1)) else {
        return;
    };
    let mut rx = Receiver::new(divisor);

    // Each byte drives one tick: bit 0 line, bit 1 ack, bit 2 fix.
    for byte in &data[9..] {
        let inputs = RxInputs {
            rx: byte & 0x01 != 0,
            ack: byte & 0x02 != 0,
            fix: byte & 0x04 != 0,
        };
        rx.step(inputs);

        let registers = rx.registers();
        assert!(registers.timer().counter() < divisor.get());
        assert!(registers.bit_index() < 8);
        assert_eq!(
            registers.fault().is_some(),
            registers.state() == ReceiverState::Error
        );
    }
});
