//! Optional usage counters. The counters themselves are in scope; rendering
//! them as human-readable text is not (see the crate's design notes).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Running counters for a buffer created with `BufferFlags::STATS`.
#[derive(Default)]
pub(crate) struct StatsCounters {
    pub(crate) written_packets: AtomicU64,
    pub(crate) written_bytes: AtomicU64,
    pub(crate) read_packets: AtomicU64,
    pub(crate) read_bytes: AtomicU64,
    pub(crate) write_wait_nsec: AtomicU64,
    pub(crate) read_wait_nsec: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self, create_time: Instant) -> Stats {
        Stats {
            written_packets: self.written_packets.load(Ordering::Relaxed),
            written_bytes: self.written_bytes.load(Ordering::Relaxed),
            read_packets: self.read_packets.load(Ordering::Relaxed),
            read_bytes: self.read_bytes.load(Ordering::Relaxed),
            write_wait_nsec: self.write_wait_nsec.load(Ordering::Relaxed),
            read_wait_nsec: self.read_wait_nsec.load(Ordering::Relaxed),
            utime: create_time.elapsed(),
        }
    }
}

/// A point-in-time snapshot of a buffer's usage counters.
///
/// Read under no lock, matching the original's `sem_getvalue`-based dump:
/// best-effort, not synchronized with the position indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Total packets committed by producers.
    pub written_packets: u64,
    /// Total payload bytes committed by producers.
    pub written_bytes: u64,
    /// Total packets released by consumers.
    pub read_packets: u64,
    /// Total payload bytes released by consumers.
    pub read_bytes: u64,
    /// Accumulated nanoseconds producers spent blocked in `reserve`.
    pub write_wait_nsec: u64,
    /// Accumulated nanoseconds consumers spent blocked waiting to open.
    pub read_wait_nsec: u64,
    /// Monotonic time elapsed since the buffer was created.
    pub utime: std::time::Duration,
}
