//! Buffer configuration object: size, flags, and optional shared-memory
//! segment selection, validated eagerly rather than deferred to init.

use crate::error::{PsError, PsResult};
use crate::flags::BufferFlags;
use crate::position::HEADER_SIZE;

/// Which shared-memory segment a `PSHARED` buffer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmId {
    /// Create a new anonymous segment for this process's own use.
    Create,
    /// Attach to an existing segment. Not supported by this crate: segment
    /// lifecycle across processes is specified only at the interface level.
    Attach(i32),
}

/// Configuration for [`crate::buffer::PacketBuffer::init`].
#[derive(Debug, Clone)]
pub struct BufferAttributes {
    size: usize,
    flags: BufferFlags,
    shmid: ShmId,
    shmmode: u32,
}

impl Default for BufferAttributes {
    fn default() -> Self {
        Self {
            size: 0,
            flags: BufferFlags::empty(),
            shmid: ShmId::Create,
            shmmode: 0o600,
        }
    }
}

impl BufferAttributes {
    /// Creates an empty attributes object; `size` must still be set before
    /// use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the arena size. Must be at least twice the header size.
    pub fn set_size(&mut self, size: usize) -> PsResult<()> {
        if size < 2 * HEADER_SIZE {
            return Err(PsError::Invalid);
        }
        self.size = size;
        Ok(())
    }

    /// Sets user-settable flags. `READY` and `CANCELLED` are internal and
    /// rejected here.
    pub fn set_flags(&mut self, flags: BufferFlags) -> PsResult<()> {
        if flags.intersects(BufferFlags::READY | BufferFlags::CANCELLED) {
            return Err(PsError::Invalid);
        }
        self.flags = flags;
        Ok(())
    }

    /// Selects which shared-memory segment a `PSHARED` buffer binds to.
    pub fn set_shmid(&mut self, shmid: ShmId) {
        self.shmid = shmid;
    }

    /// Sets POSIX-style permission bits for a newly created segment.
    pub fn set_shmmode(&mut self, shmmode: u32) {
        self.shmmode = shmmode;
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub(crate) fn shmid(&self) -> ShmId {
        self.shmid
    }

    pub(crate) fn shmmode(&self) -> u32 {
        self.shmmode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_size_below_two_headers() {
        let mut attrs = BufferAttributes::new();
        assert_eq!(attrs.set_size(HEADER_SIZE), Err(PsError::Invalid));
        assert!(attrs.set_size(2 * HEADER_SIZE).is_ok());
    }

    #[test]
    fn rejects_internal_flags() {
        let mut attrs = BufferAttributes::new();
        assert_eq!(
            attrs.set_flags(BufferFlags::READY),
            Err(PsError::Invalid)
        );
        assert_eq!(
            attrs.set_flags(BufferFlags::CANCELLED),
            Err(PsError::Invalid)
        );
        assert!(attrs.set_flags(BufferFlags::STATS).is_ok());
    }
}
