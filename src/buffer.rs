//! The packet buffer: owns the arena and shared state, and exposes the
//! buffer-level operations (`init`/`destroy`/`cancel`/`drain`/`stats`).

use tracing::{debug, trace};

use crate::arena::Arena;
use crate::attributes::BufferAttributes;
use crate::error::{PsError, PsResult};
use crate::flags::{BufferFlags, PacketHeaderFlags};
use crate::position;
use crate::state::BufferState;
use crate::stats::Stats;

/// A bounded, multi-producer/multi-consumer packet ring buffer.
///
/// Owns the arena and all shared state. Packet handles ([`crate::packet::Packet`])
/// borrow a `PacketBuffer` for their lifetime and must not outlive it.
///
/// # Safety precondition
/// Dropping a `PacketBuffer` while any [`crate::packet::Packet`] handle bound to it
/// is still open is undefined: the source leaves this undefined and this
/// crate does not attempt to enforce it beyond the compile-time borrow that
/// ties every handle's lifetime to its buffer.
pub struct PacketBuffer {
    pub(crate) state: BufferState,
}

impl PacketBuffer {
    /// Initializes a new buffer from validated attributes.
    pub fn init(attrs: &BufferAttributes) -> PsResult<Self> {
        let size = attrs.size();
        if size < 2 * position::HEADER_SIZE {
            return Err(PsError::Invalid);
        }
        let flags = attrs.flags();
        let arena = if flags.contains(BufferFlags::PSHARED) {
            match attrs.shmid() {
                crate::attributes::ShmId::Create => Arena::new_shared(size)?,
                crate::attributes::ShmId::Attach(_) => return Err(PsError::NotSup),
            }
        } else {
            Arena::new_heap(size)?
        };
        // The first header slot starts life zeroed (flags=0, size=0),
        // matching a freshly-initialized arena's all-zero bytes.
        let state = BufferState::new(arena, size, flags | BufferFlags::READY);
        debug!(size, pshared = flags.contains(BufferFlags::PSHARED), "buffer initialized");
        Ok(Self { state })
    }

    /// Sets the buffer-wide cancellation flag. Level-triggered, one-shot:
    /// every blocked and future operation returns [`PsError::Interrupted`]
    /// until the buffer is destroyed.
    pub fn cancel(&self) {
        trace!("buffer cancelled");
        self.state.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Returns a snapshot of the usage counters, if the buffer was created
    /// with `BufferFlags::STATS`.
    pub fn stats(&self) -> PsResult<Stats> {
        self.state
            .stats
            .as_ref()
            .map(|s| s.snapshot(self.state.create_time))
            .ok_or(PsError::NotSup)
    }

    /// Interface-level accessor for a `PSHARED` buffer's segment id. Always
    /// fails: this crate only creates anonymous, process-local shared
    /// mappings and never attaches to an externally identified segment, so
    /// there is no meaningful id to hand back.
    pub fn shmid(&self) -> PsResult<i32> {
        Err(PsError::NotSup)
    }

    /// Reports whether the arena is backed by shared memory.
    pub fn is_shared(&self) -> bool {
        self.state.arena.is_shared()
    }

    /// Forcibly releases every committed-but-unclaimed packet without
    /// reading it: marks each `READ`, advances `read_next` past it, and
    /// posts `read_packets` for the prefix that was also at `read_pos`.
    /// Intended for teardown, not for use alongside active readers.
    ///
    /// Returns the number of packets whose release actually advanced
    /// `read_pos` (the commit tail), matching the source's count of
    /// packets it reports as freed rather than every header it marks
    /// `READ` along the way.
    pub fn drain(&self) -> usize {
        let mut read_guard = self.state.read_mutex.lock().unwrap_or_else(|e| e.into_inner());
        let mut read_pos = self
            .state
            .read_close_mutex
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut drained = 0usize;
        while self.state.written_packets.try_wait().is_ok() {
            let pos = read_guard.read_next;
            let (flags, size) = self.state.arena.read_header(pos);
            let mut header_flags = PacketHeaderFlags::from_bits_truncate(flags);
            header_flags.insert(PacketHeaderFlags::READ);
            self.state
                .arena
                .write_header(pos, header_flags.bits(), size);
            let (next, _padding) = position::advance(pos, self.state.size, size as usize);
            read_guard.read_next = next;
            if pos == *read_pos {
                self.state.read_packets.post();
                *read_pos = next;
                drained += 1;
            }
        }
        drained
    }
}
