//! Flag bitsets for buffers and packet headers.

use bitflags::bitflags;

bitflags! {
    /// Buffer-wide state and configuration flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferFlags: u32 {
        /// Buffer has completed initialization and is safe to use.
        const READY = 0b0001;
        /// Arena and state live in a shared-memory segment.
        const PSHARED = 0b0010;
        /// Statistics counters are enabled.
        const STATS = 0b0100;
        /// Buffer has been cancelled; level-triggered, one-shot.
        const CANCELLED = 0b1000;
    }
}

bitflags! {
    /// Per-packet header flags, stored inline in the arena.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct PacketHeaderFlags: u32 {
        /// Payload bytes are fully present and committed.
        const WRITTEN = 0b01;
        /// Consumer has released the packet.
        const READ = 0b10;
    }
}
