//! Packet handles: the per-operation cursor, reservation accounting, and
//! fake-DMA staging list bound to one open/close cycle on a buffer.

use std::sync::atomic::Ordering;
use std::sync::{MutexGuard, TryLockError};
use std::time::Instant;

use tracing::{trace, warn};

use crate::buffer::PacketBuffer;
use crate::dma::FakeDmaList;
use crate::error::{PsError, PsResult};
use crate::flags::PacketHeaderFlags;
use crate::position::{self, HEADER_SIZE};
use crate::semaphore::SemaphoreError;
use crate::state::WriteHead;

/// Which side of the buffer a packet handle is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Consumer: claims a committed packet and reads its payload.
    Read,
    /// Producer: reserves space, streams a payload, and commits it.
    Write,
}

/// A handle to one packet, bound to a buffer for the handle's lifetime.
///
/// Write handles hold `write_mutex` from [`Packet::open`] through
/// [`Packet::setsize`] or [`Packet::cancel`]; read handles release
/// `read_mutex` as soon as they are bound.
pub struct Packet<'a> {
    buffer: &'a PacketBuffer,
    direction: Direction,
    try_open: bool,
    size_set: bool,
    buffer_pos: usize,
    pos: usize,
    payload_size: usize,
    reserved: i64,
    write_guard: Option<MutexGuard<'a, WriteHead>>,
    dma: FakeDmaList,
    closed: bool,
}

impl<'a> Packet<'a> {
    /// Opens a packet on `buffer` in the given `direction`.
    ///
    /// With `try_open`, a lock or semaphore wait that would block instead
    /// returns [`PsError::Busy`] immediately.
    pub fn open(buffer: &'a PacketBuffer, direction: Direction, try_open: bool) -> PsResult<Self> {
        match direction {
            Direction::Write => Self::open_write(buffer, try_open),
            Direction::Read => Self::open_read(buffer, try_open),
        }
    }

    fn open_write(buffer: &'a PacketBuffer, try_open: bool) -> PsResult<Self> {
        let guard = lock_or_try(&buffer.state.write_mutex, try_open)?;
        if buffer.is_cancelled() {
            drop(guard);
            return Err(PsError::Interrupted);
        }
        let buffer_pos = guard.write_next;
        buffer.state.arena.write_header(buffer_pos, 0, 0);
        trace!(buffer_pos, "packet opened for write");
        Ok(Self {
            buffer,
            direction: Direction::Write,
            try_open,
            size_set: false,
            buffer_pos,
            pos: 0,
            payload_size: 0,
            reserved: 0,
            write_guard: Some(guard),
            dma: FakeDmaList::default(),
            closed: false,
        })
    }

    fn open_read(buffer: &'a PacketBuffer, try_open: bool) -> PsResult<Self> {
        let mut read_guard = lock_or_try(&buffer.state.read_mutex, try_open)?;
        if buffer.is_cancelled() {
            return Err(PsError::Interrupted);
        }
        let wait = if try_open {
            buffer.state.written_packets.try_wait()
        } else {
            let start = Instant::now();
            let result = buffer.state.written_packets.wait();
            if let Some(stats) = &buffer.state.stats {
                stats
                    .read_wait_nsec
                    .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
            }
            result
        };
        match wait {
            Ok(()) => {}
            Err(SemaphoreError::WouldBlock) => return Err(PsError::Busy),
            Err(SemaphoreError::TimedOut) => return Err(PsError::Invalid),
        }
        if buffer.is_cancelled() {
            return Err(PsError::Interrupted);
        }
        let buffer_pos = read_guard.read_next;
        let (_flags, size) = buffer.state.arena.read_header(buffer_pos);
        let (next, _padding) = position::advance(buffer_pos, buffer.state.size, size as usize);
        read_guard.read_next = next;
        drop(read_guard);
        trace!(buffer_pos, size, "packet opened for read");
        Ok(Self {
            buffer,
            direction: Direction::Read,
            try_open,
            size_set: true,
            buffer_pos,
            pos: 0,
            payload_size: size as usize,
            reserved: 0,
            write_guard: None,
            dma: FakeDmaList::default(),
            closed: false,
        })
    }

    /// `true` for a write packet, `false` for a read packet.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current cursor position into the payload.
    ///
    /// Returns the value directly rather than through an out-parameter:
    /// a bound handle always has a well-defined cursor, so there is no
    /// failure mode to report alongside it.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Current (possibly still-growing) payload size.
    pub fn getsize(&self) -> usize {
        self.payload_size
    }

    /// Freezes a write packet's payload length at `n` bytes.
    ///
    /// Valid only once, and only before the packet is closed or cancelled.
    pub fn setsize(&mut self, n: usize) -> PsResult<()> {
        if !matches!(self.direction, Direction::Write) || self.size_set {
            return Err(PsError::Invalid);
        }
        let arena_size = self.buffer.state.size;
        if n + 2 * HEADER_SIZE > arena_size {
            return Err(PsError::NoBufs);
        }
        let (next_header, padding) = position::advance(self.buffer_pos, arena_size, n);
        self.reserve((HEADER_SIZE + n) as i64 + padding as i64)?;
        {
            let guard = self
                .write_guard
                .as_mut()
                .expect("write packet holds write_mutex until setsize or cancel");
            guard.write_next = next_header;
        }
        self.payload_size = n;
        self.size_set = true;
        self.buffer.state.arena.write_header(self.buffer_pos, 0, n as u64);
        self.buffer.state.arena.write_header(next_header, 0, 0);
        self.dma.cut(n);
        self.write_guard = None;
        Ok(())
    }

    /// Writes `src` at the current cursor, advancing it by `src.len()`.
    pub fn write(&mut self, src: &[u8]) -> PsResult<()> {
        if !matches!(self.direction, Direction::Write) {
            return Err(PsError::Invalid);
        }
        let n = src.len();
        let new_pos = self.bounds_check_and_reserve(n)?;
        let offset = self.payload_offset();
        self.buffer.state.arena.write_bytes(offset, src);
        self.pos = new_pos;
        if !self.size_set && self.pos > self.payload_size {
            self.payload_size = self.pos;
        }
        Ok(())
    }

    /// Reads `dst.len()` bytes at the current cursor into `dst`, advancing
    /// it by that amount.
    pub fn read(&mut self, dst: &mut [u8]) -> PsResult<()> {
        if !matches!(self.direction, Direction::Read) {
            return Err(PsError::Invalid);
        }
        let n = dst.len();
        if self.pos + n > self.payload_size {
            return Err(PsError::Invalid);
        }
        let offset = self.payload_offset();
        self.buffer.state.arena.read_bytes(offset, dst);
        self.pos += n;
        Ok(())
    }

    /// Moves the cursor to `n` without reading or writing, subject to the
    /// same bounds and reservation rules as [`Packet::write`] / [`Packet::read`].
    pub fn seek(&mut self, n: usize) -> PsResult<()> {
        match self.direction {
            Direction::Write => {
                let target = self.bounds_check_and_reserve_absolute(n)?;
                self.pos = target;
                if !self.size_set && self.pos > self.payload_size {
                    self.payload_size = self.pos;
                }
                Ok(())
            }
            Direction::Read => {
                if n > self.payload_size {
                    return Err(PsError::Invalid);
                }
                self.pos = n;
                Ok(())
            }
        }
    }

    /// Exposes a contiguous `n`-byte view at the current cursor.
    ///
    /// Returns a real pointer into the arena when `[pos, pos+n)` does not
    /// cross the arena wrap. Otherwise, without `accept_fake_dma`, fails
    /// with [`PsError::Again`]; with it, returns a handle-owned staging
    /// buffer that is copied back into the arena at close (writes) or
    /// pre-filled from the arena (reads).
    pub fn dma(&mut self, n: usize, accept_fake_dma: bool) -> PsResult<&mut [u8]> {
        match self.direction {
            Direction::Write => {
                self.bounds_check_and_reserve(n)?;
            }
            Direction::Read => {
                if self.pos + n > self.payload_size {
                    return Err(PsError::Invalid);
                }
            }
        }
        let offset = self.payload_offset();
        let is_write = matches!(self.direction, Direction::Write);
        if let Some(ptr) = self.buffer.state.arena.contiguous_ptr(offset, n) {
            self.pos += n;
            if is_write && !self.size_set && self.pos > self.payload_size {
                self.payload_size = self.pos;
            }
            // SAFETY: contiguous_ptr only returns Some when [offset, offset+n)
            // lies within the arena allocation, and this packet's protocol
            // position (reserved via claim-head/commit-tail advance) gives it
            // exclusive access to that byte range for the handle's lifetime.
            return Ok(unsafe { std::slice::from_raw_parts_mut(ptr, n) });
        }
        if !accept_fake_dma {
            return Err(PsError::Again);
        }
        let idx = self.dma.alloc(n, self.pos);
        if matches!(self.direction, Direction::Read) {
            self.buffer.state.arena.read_bytes(offset, self.dma.buffer_mut(idx));
        }
        self.pos += n;
        if is_write && !self.size_set && self.pos > self.payload_size {
            self.payload_size = self.pos;
        }
        Ok(self.dma.buffer_mut(idx))
    }

    /// Commits the packet. For a write packet whose size was never frozen,
    /// this calls [`Packet::setsize`] with the cursor-implied length first.
    pub fn close(mut self) -> PsResult<()> {
        let result = match self.direction {
            Direction::Write => self.close_write(),
            Direction::Read => self.close_read(),
        };
        if result.is_ok() {
            self.closed = true;
        }
        result
    }

    /// Abandons a write packet before its size was frozen, refunding its
    /// reservation and releasing `write_mutex`.
    pub fn cancel(mut self) -> PsResult<()> {
        if !matches!(self.direction, Direction::Write) || self.size_set {
            return Err(PsError::Invalid);
        }
        {
            let guard = self
                .write_guard
                .as_mut()
                .expect("write packet holds write_mutex until setsize or cancel");
            guard.free_bytes += self.reserved;
        }
        self.buffer.state.arena.write_header(self.buffer_pos, 0, 0);
        self.write_guard = None;
        self.dma.free_all();
        self.closed = true;
        Ok(())
    }

    fn close_write(&mut self) -> PsResult<()> {
        if !self.size_set {
            self.setsize(self.pos)?;
        }
        let payload_base = self.buffer_pos + HEADER_SIZE;
        self.dma.commit_all(&self.buffer.state.arena, payload_base);
        let mut write_pos = self
            .buffer
            .state
            .write_close_mutex
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(stats) = &self.buffer.state.stats {
            stats.written_packets.fetch_add(1, Ordering::Relaxed);
            stats
                .written_bytes
                .fetch_add(self.payload_size as u64, Ordering::Relaxed);
        }
        let (flags, size) = self.buffer.state.arena.read_header(self.buffer_pos);
        let mut header_flags = PacketHeaderFlags::from_bits_truncate(flags);
        header_flags.insert(PacketHeaderFlags::WRITTEN);
        self.buffer
            .state
            .arena
            .write_header(self.buffer_pos, header_flags.bits(), size);
        if self.buffer_pos == *write_pos {
            let mut pos = self.buffer_pos;
            loop {
                let (flags, size) = self.buffer.state.arena.read_header(pos);
                if !PacketHeaderFlags::from_bits_truncate(flags).contains(PacketHeaderFlags::WRITTEN) {
                    break;
                }
                self.buffer.state.written_packets.post();
                let (next, _padding) = position::advance(pos, self.buffer.state.size, size as usize);
                pos = next;
            }
            *write_pos = pos;
        }
        self.dma.free_all();
        Ok(())
    }

    fn close_read(&mut self) -> PsResult<()> {
        let mut read_pos = self
            .buffer
            .state
            .read_close_mutex
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(stats) = &self.buffer.state.stats {
            stats.read_packets.fetch_add(1, Ordering::Relaxed);
            stats
                .read_bytes
                .fetch_add(self.payload_size as u64, Ordering::Relaxed);
        }
        let (flags, size) = self.buffer.state.arena.read_header(self.buffer_pos);
        let mut header_flags = PacketHeaderFlags::from_bits_truncate(flags);
        header_flags.insert(PacketHeaderFlags::READ);
        self.buffer
            .state
            .arena
            .write_header(self.buffer_pos, header_flags.bits(), size);
        if self.buffer_pos == *read_pos {
            let mut pos = self.buffer_pos;
            loop {
                let (flags, size) = self.buffer.state.arena.read_header(pos);
                if !PacketHeaderFlags::from_bits_truncate(flags).contains(PacketHeaderFlags::READ) {
                    break;
                }
                self.buffer.state.read_packets.post();
                let (next, _padding) = position::advance(pos, self.buffer.state.size, size as usize);
                pos = next;
            }
            *read_pos = pos;
        }
        self.dma.free_all();
        Ok(())
    }

    /// Reserve/restore `len - reserved` against `free_bytes`, blocking
    /// (subject to `try_open`) to reclaim released packets when the
    /// request outgrows what is currently free.
    fn reserve(&mut self, len: i64) -> PsResult<()> {
        let delta = len - self.reserved;
        if delta == 0 {
            return Ok(());
        }
        let buffer = self.buffer;
        let try_open = self.try_open;
        let guard = self
            .write_guard
            .as_mut()
            .expect("reserve is only valid while write_mutex is held");
        if delta < 0 {
            guard.free_bytes += -delta;
            self.reserved = len;
            return Ok(());
        }
        guard.free_bytes -= delta;
        while guard.free_bytes < 0 {
            let wait = if try_open {
                buffer.state.read_packets.try_wait()
            } else {
                let start = Instant::now();
                let result = buffer.state.read_packets.wait();
                if let Some(stats) = &buffer.state.stats {
                    stats
                        .write_wait_nsec
                        .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
                }
                result
            };
            match wait {
                Ok(()) => {}
                Err(SemaphoreError::WouldBlock) => {
                    guard.free_bytes += delta;
                    return Err(PsError::Busy);
                }
                Err(SemaphoreError::TimedOut) => {
                    guard.free_bytes += delta;
                    return Err(PsError::Invalid);
                }
            }
            reclaim_one(guard, buffer);
            while buffer.state.read_packets.try_wait().is_ok() {
                reclaim_one(guard, buffer);
                if guard.free_bytes >= 0 {
                    break;
                }
            }
            if buffer.is_cancelled() {
                guard.free_bytes += delta;
                return Err(PsError::Interrupted);
            }
        }
        self.reserved = len;
        Ok(())
    }

    /// Bounds-check a write/read/dma request of `n` bytes at the current
    /// cursor and, for an unfrozen write packet, reserve the bytes it
    /// needs. Returns the cursor value after the operation.
    fn bounds_check_and_reserve(&mut self, n: usize) -> PsResult<usize> {
        self.bounds_check_and_reserve_absolute(self.pos + n)
    }

    fn bounds_check_and_reserve_absolute(&mut self, target: usize) -> PsResult<usize> {
        if self.size_set {
            if target > self.payload_size {
                return Err(PsError::Invalid);
            }
        } else {
            let max_payload = self.buffer.state.size - 2 * HEADER_SIZE;
            if target > max_payload {
                return Err(PsError::NoBufs);
            }
            self.reserve(target as i64)?;
        }
        Ok(target)
    }

    fn payload_offset(&self) -> usize {
        (self.buffer_pos + HEADER_SIZE + self.pos) % self.buffer.state.size
    }
}

impl<'a> Drop for Packet<'a> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if matches!(self.direction, Direction::Write) && !self.size_set {
            warn!("write packet dropped without close/cancel; auto-cancelling");
            if let Some(guard) = self.write_guard.as_mut() {
                guard.free_bytes += self.reserved;
            }
            self.buffer.state.arena.write_header(self.buffer_pos, 0, 0);
        } else {
            warn!("packet handle dropped without close; slot left unresolved");
        }
        self.dma.free_all();
    }
}

fn reclaim_one(guard: &mut WriteHead, buffer: &PacketBuffer) {
    let (_flags, size) = buffer.state.arena.read_header(guard.read_first);
    let (next, padding) = position::advance(guard.read_first, buffer.state.size, size as usize);
    guard.free_bytes += HEADER_SIZE as i64 + size as i64 + padding as i64;
    guard.read_first = next;
}

fn lock_or_try<'a, T>(
    mutex: &'a std::sync::Mutex<T>,
    try_lock: bool,
) -> PsResult<MutexGuard<'a, T>> {
    if try_lock {
        match mutex.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(PsError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        }
    } else {
        Ok(mutex.lock().unwrap_or_else(|e| e.into_inner()))
    }
}
