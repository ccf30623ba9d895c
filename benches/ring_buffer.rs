//! Criterion benchmarks for the packet ring buffer's hot paths.
//!
//! Key metrics:
//! - Producer throughput (open/setsize/write/close) for various payload sizes
//! - Consumer throughput (open/read/close)
//! - Concurrent producer/consumer mixes
//! - Wrap-around overhead when the arena is small relative to the payload
//!
//! Run with: cargo bench --bench ring_buffer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer};
use std::sync::Arc;
use std::thread;

fn make_buffer(size: usize) -> PacketBuffer {
    let mut attrs = BufferAttributes::new();
    attrs.set_size(size).unwrap();
    attrs.set_flags(BufferFlags::empty()).unwrap();
    PacketBuffer::init(&attrs).unwrap()
}

/// Benchmarks the producer path (open, setsize, write, close) across payload
/// sizes, draining with a consumer between iterations so the arena never
/// fills.
fn packet_write_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_write");

    let sizes = vec![
        ("64B", 64),
        ("1KB", 1024),
        ("16KB", 16 * 1024),
        ("256KB", 256 * 1024),
    ];

    for (name, size) in sizes {
        let buffer = make_buffer((size + 16) * 4);
        let data = vec![0xABu8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("write", name), &size, |b, _| {
            b.iter(|| {
                let mut p = Packet::open(&buffer, Direction::Write, false).unwrap();
                p.setsize(size).unwrap();
                p.write(black_box(&data)).unwrap();
                p.close().unwrap();

                let mut r = Packet::open(&buffer, Direction::Read, false).unwrap();
                let mut scratch = vec![0u8; size];
                r.read(&mut scratch).unwrap();
                r.close().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmarks reading a pre-committed packet of various sizes.
fn packet_read_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_read");

    let sizes = vec![("64B", 64), ("1KB", 1024), ("16KB", 16 * 1024)];

    for (name, size) in sizes {
        let buffer = make_buffer((size + 16) * 8);
        let data = vec![0xCDu8; size];

        group.bench_with_input(BenchmarkId::new("read", name), &size, |b, _| {
            b.iter(|| {
                let mut w = Packet::open(&buffer, Direction::Write, false).unwrap();
                w.setsize(size).unwrap();
                w.write(&data).unwrap();
                w.close().unwrap();

                let mut r = Packet::open(&buffer, Direction::Read, false).unwrap();
                let mut scratch = vec![0u8; size];
                r.read(black_box(&mut scratch)).unwrap();
                r.close().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmarks concurrent producers writing fixed-size packets while a single
/// consumer drains them, to characterize lock/semaphore contention.
fn packet_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_concurrent");

    let thread_counts = vec![1, 2, 4];

    for thread_count in thread_counts {
        let payload = vec![0u8; 256];

        group.bench_with_input(
            BenchmarkId::new("producers", thread_count),
            &thread_count,
            |b, &thread_count| {
                b.iter(|| {
                    let buffer = Arc::new(make_buffer(1 << 20));
                    let consumer_buffer = Arc::clone(&buffer);
                    let total = thread_count * 50;

                    let consumer = thread::spawn(move || {
                        for _ in 0..total {
                            let mut r =
                                Packet::open(&consumer_buffer, Direction::Read, false).unwrap();
                            let mut scratch = vec![0u8; 256];
                            r.read(&mut scratch).unwrap();
                            r.close().unwrap();
                        }
                    });

                    let mut handles = Vec::new();
                    for _ in 0..thread_count {
                        let writer_buffer = Arc::clone(&buffer);
                        let data = payload.clone();
                        handles.push(thread::spawn(move || {
                            for _ in 0..50 {
                                let mut w =
                                    Packet::open(&writer_buffer, Direction::Write, false).unwrap();
                                w.setsize(256).unwrap();
                                w.write(&data).unwrap();
                                w.close().unwrap();
                            }
                        }));
                    }

                    for h in handles {
                        h.join().unwrap();
                    }
                    consumer.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmarks the position-arithmetic wrap path by forcing every packet's
/// header slot to straddle the arena end.
fn packet_wrap_around(c: &mut Criterion) {
    let size = 4096usize;
    let payload = size / 2 - 16;
    let buffer = make_buffer(size);
    let data = vec![0xEEu8; payload];

    c.bench_function("packet_wrap_write_read", |b| {
        b.iter(|| {
            let mut w = Packet::open(&buffer, Direction::Write, false).unwrap();
            w.setsize(payload).unwrap();
            w.write(black_box(&data)).unwrap();
            w.close().unwrap();

            let mut r = Packet::open(&buffer, Direction::Read, false).unwrap();
            let mut scratch = vec![0u8; payload];
            r.read(&mut scratch).unwrap();
            r.close().unwrap();
        });
    });
}

criterion_group!(
    benches,
    packet_write_throughput,
    packet_read_latency,
    packet_concurrent_producers,
    packet_wrap_around
);
criterion_main!(benches);
