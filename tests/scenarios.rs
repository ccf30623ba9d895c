//! End-to-end scenarios exercising the producer/consumer protocol across
//! threads, mirroring the packet buffer's design scenarios.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use psbuf::{BufferAttributes, BufferFlags, Direction, Packet, PacketBuffer, PsError};

fn make_buffer(size: usize) -> PacketBuffer {
    let mut attrs = BufferAttributes::new();
    attrs.set_size(size).unwrap();
    attrs.set_flags(BufferFlags::empty()).unwrap();
    PacketBuffer::init(&attrs).unwrap()
}

#[test]
fn single_producer_single_consumer_exact_fit() {
    let buffer = make_buffer(1024);
    for i in 0..10u8 {
        let byte = b'A' + i;
        let mut p = Packet::open(&buffer, Direction::Write, false).unwrap();
        p.setsize(80).unwrap();
        p.write(&vec![byte; 80]).unwrap();
        p.close().unwrap();
    }
    for i in 0..10u8 {
        let byte = b'A' + i;
        let mut c = Packet::open(&buffer, Direction::Read, false).unwrap();
        let mut buf = vec![0u8; 80];
        c.read(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == byte));
        c.close().unwrap();
    }
    // Nothing left uncommitted or unread once every packet has been
    // written and consumed in lockstep.
    assert_eq!(buffer.drain(), 0);
}

#[test]
fn wrap_forces_new_packet_to_offset_zero() {
    let buffer = make_buffer(256);

    let mut p1 = Packet::open(&buffer, Direction::Write, false).unwrap();
    p1.setsize(120).unwrap();
    p1.write(&vec![0x11u8; 120]).unwrap();
    p1.close().unwrap();

    let mut c1 = Packet::open(&buffer, Direction::Read, false).unwrap();
    let mut buf = vec![0u8; 120];
    c1.read(&mut buf).unwrap();
    c1.close().unwrap();

    let mut p2 = Packet::open(&buffer, Direction::Write, false).unwrap();
    p2.setsize(120).unwrap();
    p2.write(&vec![0x22u8; 120]).unwrap();
    p2.close().unwrap();

    let mut c2 = Packet::open(&buffer, Direction::Read, false).unwrap();
    let mut buf2 = vec![0u8; 120];
    c2.read(&mut buf2).unwrap();
    assert!(buf2.iter().all(|&b| b == 0x22));
    c2.close().unwrap();
}

#[test]
fn backpressure_blocks_writer_until_reader_releases() {
    let buffer = Arc::new(make_buffer(256));
    let writer_buffer = Arc::clone(&buffer);

    // Fill the arena with one 200-byte packet, leaving no room for another.
    let mut first = Packet::open(&buffer, Direction::Write, false).unwrap();
    first.setsize(200).unwrap();
    first.write(&vec![1u8; 200]).unwrap();
    first.close().unwrap();

    let blocked = Arc::new(AtomicBool::new(true));
    let blocked_writer = Arc::clone(&blocked);
    let writer = thread::spawn(move || {
        let mut second = Packet::open(&writer_buffer, Direction::Write, false).unwrap();
        second.setsize(200).unwrap();
        blocked_writer.store(false, Ordering::SeqCst);
        second.write(&vec![2u8; 200]).unwrap();
        second.close().unwrap();
    });

    thread::sleep(Duration::from_millis(50));
    assert!(
        blocked.load(Ordering::SeqCst),
        "writer should still be blocked in reserve/setsize"
    );

    let mut reader = Packet::open(&buffer, Direction::Read, false).unwrap();
    let mut buf = vec![0u8; 200];
    reader.read(&mut buf).unwrap();
    reader.close().unwrap();

    writer.join().unwrap();
}

#[test]
fn cancellation_unblocks_writer_and_restores_free_bytes() {
    let buffer = Arc::new(make_buffer(256));
    let writer_buffer = Arc::clone(&buffer);

    let mut first = Packet::open(&buffer, Direction::Write, false).unwrap();
    first.setsize(200).unwrap();
    first.write(&vec![1u8; 200]).unwrap();
    first.close().unwrap();

    let result = thread::spawn(move || {
        let mut second = Packet::open(&writer_buffer, Direction::Write, false).unwrap();
        second.setsize(200)
    });

    thread::sleep(Duration::from_millis(30));
    buffer.cancel();

    let outcome = result.join().unwrap();
    assert_eq!(outcome, Err(PsError::Interrupted));
}

#[test]
fn drain_releases_all_unread_packets() {
    let buffer = make_buffer(4096);
    for _ in 0..50 {
        let mut p = Packet::open(&buffer, Direction::Write, false).unwrap();
        p.setsize(10).unwrap();
        p.write(&[0u8; 10]).unwrap();
        p.close().unwrap();
    }
    assert_eq!(buffer.drain(), 50);
    assert_eq!(buffer.drain(), 0);
}

#[test]
fn setsize_boundary_exact_fit_succeeds_one_byte_over_fails() {
    let buffer = make_buffer(256);
    let arena_minus_two_headers = 256 - 2 * 16;

    let mut ok = Packet::open(&buffer, Direction::Write, true).unwrap();
    assert!(ok.setsize(arena_minus_two_headers).is_ok());
    ok.close().unwrap();

    let mut too_big = Packet::open(&buffer, Direction::Write, true).unwrap();
    assert_eq!(
        too_big.setsize(arena_minus_two_headers + 1),
        Err(PsError::NoBufs)
    );
    too_big.cancel().unwrap();
}

#[test]
fn out_of_order_close_holds_tail_until_earlier_writer_commits() {
    let buffer = Arc::new(make_buffer(4096));

    // W_A opens first and holds write_mutex through setsize; W_B can only
    // open once W_A's setsize releases it, so spawn W_A, let it reserve,
    // then hand off to W_B on a second thread and have W_B close first.
    let mut writer_a = Packet::open(&buffer, Direction::Write, false).unwrap();
    writer_a.setsize(16).unwrap();

    let buffer_b = Arc::clone(&buffer);
    let writer_b = thread::spawn(move || {
        let mut p = Packet::open(&buffer_b, Direction::Write, false).unwrap();
        p.setsize(16).unwrap();
        p.write(&[0x42u8; 16]).unwrap();
        p.close().unwrap();
    });

    // Give W_B a chance to open and close before W_A commits.
    thread::sleep(Duration::from_millis(30));

    let reader_buffer = Arc::clone(&buffer);
    let no_packets_yet = Arc::new(AtomicBool::new(false));
    let probe_flag = Arc::clone(&no_packets_yet);
    let prober = thread::spawn(move || {
        let busy = Packet::open(&reader_buffer, Direction::Read, true).is_err();
        probe_flag.store(busy, Ordering::SeqCst);
    });
    prober.join().unwrap();
    assert!(
        no_packets_yet.load(Ordering::SeqCst),
        "no packet should be visible until W_A (opened first) commits"
    );

    writer_a.write(&[0x41u8; 16]).unwrap();
    writer_a.close().unwrap();
    writer_b.join().unwrap();

    let mut first = Packet::open(&buffer, Direction::Read, false).unwrap();
    let mut buf = vec![0u8; 16];
    first.read(&mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0x41), "A must become visible first");
    first.close().unwrap();

    let mut second = Packet::open(&buffer, Direction::Read, false).unwrap();
    let mut buf2 = vec![0u8; 16];
    second.read(&mut buf2).unwrap();
    assert!(buf2.iter().all(|&b| b == 0x42), "B becomes visible only after A");
    second.close().unwrap();
}

#[test]
fn try_open_on_empty_buffer_is_busy() {
    let buffer = make_buffer(256);
    let result = Packet::open(&buffer, Direction::Read, true);
    assert_eq!(result.err(), Some(PsError::Busy));
}
