//! Shared buffer state: position indices, free-byte accounting, the four
//! head/tail mutexes, and the two counting semaphores.
//!
//! Where the original expresses this as free-standing mutexes beside plain
//! struct fields, each mutex here owns exactly the field group it protects,
//! so the locking discipline is enforced by the type system rather than by
//! convention.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::arena::Arena;
use crate::flags::BufferFlags;
use crate::semaphore::Semaphore;
use crate::stats::StatsCounters;

/// Fields guarded by `read_mutex`: the read-side claim head.
pub(crate) struct ReadHead {
    pub(crate) read_next: usize,
}

/// Fields guarded by `write_mutex`: the write-side claim head, plus
/// `free_bytes` and `read_first`, which the design assigns to the writer.
pub(crate) struct WriteHead {
    pub(crate) write_next: usize,
    pub(crate) free_bytes: i64,
    pub(crate) read_first: usize,
}

pub(crate) struct BufferState {
    pub(crate) arena: Arena,
    pub(crate) size: usize,
    flags: AtomicU32,
    pub(crate) read_mutex: Mutex<ReadHead>,
    pub(crate) write_mutex: Mutex<WriteHead>,
    pub(crate) read_close_mutex: Mutex<usize>,
    pub(crate) write_close_mutex: Mutex<usize>,
    pub(crate) read_packets: Semaphore,
    pub(crate) written_packets: Semaphore,
    pub(crate) stats: Option<StatsCounters>,
    pub(crate) create_time: Instant,
}

impl BufferState {
    pub(crate) fn new(arena: Arena, size: usize, flags: BufferFlags) -> Self {
        let stats = flags
            .contains(BufferFlags::STATS)
            .then(StatsCounters::default);
        Self {
            arena,
            size,
            flags: AtomicU32::new(flags.bits()),
            read_mutex: Mutex::new(ReadHead { read_next: 0 }),
            write_mutex: Mutex::new(WriteHead {
                write_next: 0,
                free_bytes: size as i64 - crate::position::HEADER_SIZE as i64,
                read_first: 0,
            }),
            read_close_mutex: Mutex::new(0),
            write_close_mutex: Mutex::new(0),
            read_packets: Semaphore::new(0),
            written_packets: Semaphore::new(0),
            stats,
            create_time: Instant::now(),
        }
    }

    pub(crate) fn flags(&self) -> BufferFlags {
        BufferFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.flags().contains(BufferFlags::CANCELLED)
    }

    /// Sets the buffer-wide cancellation flag and, the first time it is
    /// set, posts both semaphores once to wake any blocked waiter.
    /// Level-triggered and one-shot: once `CANCELLED`, stays set until the
    /// buffer is destroyed; later calls are no-ops.
    pub(crate) fn cancel(&self) {
        let prev = self
            .flags
            .fetch_or(BufferFlags::CANCELLED.bits(), Ordering::AcqRel);
        if prev & BufferFlags::CANCELLED.bits() == 0 {
            self.read_packets.post();
            self.written_packets.post();
        }
    }
}
