//! Drain demonstration.
//!
//! Commits a batch of packets without ever reading them, then tears the
//! buffer down with `drain` instead of consuming each one individually —
//! the pattern a shutdown path uses to release outstanding packets.
//!
//! Run with: cargo run --example drain_demo

use anyhow::Result;
use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer};

fn main() -> Result<()> {
    println!("=== Packet Buffer Drain Demo ===\n");

    let mut attrs = BufferAttributes::new();
    attrs.set_size(16 * 1024)?;
    attrs.set_flags(BufferFlags::empty())?;
    let buffer = PacketBuffer::init(&attrs)?;

    println!("1. Committing 50 packets with nobody reading them");
    for i in 0..50u32 {
        let mut p = Packet::open(&buffer, Direction::Write, false)?;
        p.write(&i.to_le_bytes())?;
        p.close()?;
    }

    println!("2. Calling drain() to release every committed-but-unclaimed packet");
    let drained = buffer.drain();
    println!("   drained {drained} packets\n");

    let second = buffer.drain();
    println!("3. A second drain() call releases {second} (nothing left)\n");

    println!("4. Cancelling a producer blocked on a full buffer");
    let mut attrs = BufferAttributes::new();
    attrs.set_size(256)?;
    let small = PacketBuffer::init(&attrs)?;
    let mut filler = Packet::open(&small, Direction::Write, false)?;
    filler.setsize(200)?;
    filler.write(&[0u8; 200])?;
    filler.close()?;

    small.cancel();
    match Packet::open(&small, Direction::Write, false) {
        Err(err) => println!("   open after cancel returned: {err}"),
        Ok(_) => println!("   unexpected: open succeeded after cancel"),
    }

    Ok(())
}
