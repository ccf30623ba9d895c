//! Raw byte storage backing a [`crate::buffer::PacketBuffer`].
//!
//! Holds either a heap allocation or an anonymous [`memmap2::MmapMut`]
//! region. Concurrent producers/consumers write to disjoint byte ranges by
//! protocol (mutexes and semaphores serialize who owns which range), not by
//! the borrow checker, so reads and writes go through raw pointers guarded
//! by `unsafe` with the invariant documented at each call site.

use std::ptr;

use memmap2::{MmapMut, MmapOptions};

use crate::error::{PsError, PsResult};

enum Backing {
    Heap(Box<[u8]>),
    Mapped(MmapMut),
}

/// Contiguous byte region holding packet headers and payloads.
///
/// # Safety
/// `ptr` points into `backing` and remains valid for the lifetime of the
/// `Arena`, since `backing` is never resized or moved out from under it
/// after construction.
pub(crate) struct Arena {
    backing: Backing,
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the arena's raw pointer is only ever dereferenced through
// `read_bytes`/`write_bytes`/`read_header`/`write_header`/`ptr_range`, whose
// callers hold the mutex or semaphore that the protocol assigns to the byte
// range being touched. No two callers are ever given overlapping live
// ranges at the same time.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    pub(crate) fn new_heap(size: usize) -> PsResult<Self> {
        let mut backing = vec![0u8; size].into_boxed_slice();
        let ptr = backing.as_mut_ptr();
        Ok(Self {
            backing: Backing::Heap(backing),
            ptr,
            len: size,
        })
    }

    pub(crate) fn new_shared(size: usize) -> PsResult<Self> {
        let mut mmap = MmapOptions::new()
            .len(size)
            .map_anon()
            .map_err(|_| PsError::NoMem)?;
        let ptr = mmap.as_mut_ptr();
        Ok(Self {
            backing: Backing::Mapped(mmap),
            ptr,
            len: size,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_shared(&self) -> bool {
        matches!(self.backing, Backing::Mapped(_))
    }

    /// Reads the 16-byte header at `offset`: a `u32` flags word, 4 bytes of
    /// padding, and an 8-byte `size` (the spec's `size_t`). The caller must
    /// guarantee the header does not straddle the arena end (an invariant of
    /// every offset this crate produces via [`crate::position::advance`]).
    pub(crate) fn read_header(&self, offset: usize) -> (u32, u64) {
        debug_assert!(offset + crate::position::HEADER_SIZE <= self.len);
        let mut flag_bytes = [0u8; 4];
        let mut size_bytes = [0u8; 8];
        // SAFETY: offset + 16 <= len by the invariant above; reads are
        // non-overlapping with the destination stack buffers.
        unsafe {
            let p = self.ptr.add(offset);
            ptr::copy_nonoverlapping(p, flag_bytes.as_mut_ptr(), 4);
            ptr::copy_nonoverlapping(p.add(8), size_bytes.as_mut_ptr(), 8);
        }
        (u32::from_le_bytes(flag_bytes), u64::from_le_bytes(size_bytes))
    }

    pub(crate) fn write_header(&self, offset: usize, flags: u32, size: u64) {
        debug_assert!(offset + crate::position::HEADER_SIZE <= self.len);
        let flag_bytes = flags.to_le_bytes();
        let size_bytes = size.to_le_bytes();
        // SAFETY: see read_header.
        unsafe {
            let p = self.ptr.add(offset);
            ptr::copy_nonoverlapping(flag_bytes.as_ptr(), p, 4);
            ptr::copy_nonoverlapping(size_bytes.as_ptr(), p.add(8), 8);
        }
    }

    /// Copies `data` into the arena starting at `offset`, splitting the copy
    /// across the arena end if the span wraps.
    pub(crate) fn write_bytes(&self, offset: usize, data: &[u8]) {
        let n = data.len();
        if n == 0 {
            return;
        }
        debug_assert!(offset < self.len);
        let until_end = self.len - offset;
        // SAFETY: offset < len, and each copy_nonoverlapping target span is
        // within [0, len); the split point `until_end` keeps both halves in
        // bounds.
        unsafe {
            if n <= until_end {
                ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.add(offset), n);
            } else {
                ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.add(offset), until_end);
                ptr::copy_nonoverlapping(data.as_ptr().add(until_end), self.ptr, n - until_end);
            }
        }
    }

    /// Copies from the arena starting at `offset` into `out`, splitting the
    /// read across the arena end if the span wraps.
    pub(crate) fn read_bytes(&self, offset: usize, out: &mut [u8]) {
        let n = out.len();
        if n == 0 {
            return;
        }
        debug_assert!(offset < self.len);
        let until_end = self.len - offset;
        // SAFETY: see write_bytes.
        unsafe {
            if n <= until_end {
                ptr::copy_nonoverlapping(self.ptr.add(offset), out.as_mut_ptr(), n);
            } else {
                ptr::copy_nonoverlapping(self.ptr.add(offset), out.as_mut_ptr(), until_end);
                ptr::copy_nonoverlapping(self.ptr, out.as_mut_ptr().add(until_end), n - until_end);
            }
        }
    }

    /// Returns a raw pointer to `offset`, valid for `len` bytes, only when
    /// that span does not cross the arena end. Used for zero-copy DMA.
    pub(crate) fn contiguous_ptr(&self, offset: usize, len: usize) -> Option<*mut u8> {
        if offset + len <= self.len {
            // SAFETY: offset + len <= self.len, so the returned pointer is
            // valid for `len` bytes within the arena allocation.
            Some(unsafe { self.ptr.add(offset) })
        } else {
            None
        }
    }
}
