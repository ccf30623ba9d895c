//! Producer/consumer demonstration.
//!
//! Spawns a producer thread that commits variable-size packets and a
//! consumer thread that claims and reads them in FIFO order, showing the
//! buffer handing packets between threads without a shared queue.
//!
//! Run with: cargo run --example producer_consumer

use anyhow::Result;
use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    println!("=== Packet Buffer Producer/Consumer Demo ===\n");

    let mut attrs = BufferAttributes::new();
    attrs.set_size(64 * 1024)?;
    attrs.set_flags(BufferFlags::STATS)?;
    let buffer = Arc::new(PacketBuffer::init(&attrs)?);

    println!("1. Created 64 KiB buffer with stats enabled\n");

    let producer_buffer = Arc::clone(&buffer);
    let producer = thread::spawn(move || -> Result<()> {
        for i in 0..1000u32 {
            let message = format!("message #{i:04}");
            let mut p = Packet::open(&producer_buffer, Direction::Write, false)?;
            p.write(message.as_bytes())?;
            p.close()?;
            if i % 200 == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    });

    let consumer_buffer = Arc::clone(&buffer);
    let consumer = thread::spawn(move || -> Result<usize> {
        let mut count = 0usize;
        while count < 1000 {
            let mut c = Packet::open(&consumer_buffer, Direction::Read, false)?;
            let mut got = vec![0u8; c.getsize()];
            c.read(&mut got)?;
            c.close()?;
            count += 1;
            if count % 250 == 0 {
                println!("   consumer: read {count} packets, last = {:?}", String::from_utf8_lossy(&got));
            }
        }
        Ok(count)
    });

    producer.join().expect("producer thread panicked")?;
    let total = consumer.join().expect("consumer thread panicked")?;
    println!("\n2. Consumer drained {total} packets\n");

    if let Ok(stats) = buffer.stats() {
        println!("3. Buffer stats:");
        println!("   written_packets = {}", stats.written_packets);
        println!("   written_bytes   = {}", stats.written_bytes);
        println!("   read_packets    = {}", stats.read_packets);
        println!("   read_bytes      = {}", stats.read_bytes);
        println!("   uptime          = {:?}", stats.utime);
    }

    let start = Instant::now();
    let burst = 2000u32;
    for i in 0..burst {
        let mut p = Packet::open(&buffer, Direction::Write, false)?;
        p.setsize(64)?;
        p.write(&vec![i as u8; 64])?;
        p.close()?;
        let mut c = Packet::open(&buffer, Direction::Read, false)?;
        let mut scratch = vec![0u8; 64];
        c.read(&mut scratch)?;
        c.close()?;
    }
    let elapsed = start.elapsed();
    println!(
        "\n4. Round-tripped {burst} packets in {elapsed:?} ({:.0} packets/sec)",
        burst as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}
