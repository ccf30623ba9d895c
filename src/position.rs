//! Wrap-around offset arithmetic shared by the producer and consumer paths.

/// Size in bytes of a packet header: `flags: u32` followed by `size: u64`
/// (the spec's `size_t`), naturally aligned to 8 bytes — 4 bytes of flags,
/// 4 bytes of padding, 8 bytes of size.
pub(crate) const HEADER_SIZE: usize = 16;

/// Computes the next header offset after a packet of `payload_size` bytes
/// starting at `pos`, and the end-of-arena padding consumed by a wrap.
///
/// `q = (pos + HEADER_SIZE + payload_size) mod arena_size`; if fewer than
/// `HEADER_SIZE` bytes remain between `q` and the end of the arena, the
/// header cannot fit there and `q` resets to `0`. The bytes between the raw
/// `q` and the arena end in that case are unusable padding, returned
/// separately so callers can credit it to `free_bytes`.
pub(crate) fn advance(pos: usize, arena_size: usize, payload_size: usize) -> (usize, usize) {
    debug_assert!(arena_size >= 2 * HEADER_SIZE);
    let raw = (pos + HEADER_SIZE + payload_size) % arena_size;
    if raw + HEADER_SIZE > arena_size {
        (0, arena_size - raw)
    } else {
        (raw, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_wrap_when_space_remains() {
        let (next, pad) = advance(0, 1024, 80);
        assert_eq!(next, 96);
        assert_eq!(pad, 0);
    }

    #[test]
    fn wraps_to_zero_when_reaching_arena_end() {
        // arena of 256, packet at 240 sized 0: raw = 240 + 16 + 0 = 256 % 256 = 0,
        // and 0 + 16 <= 256, so it lands exactly at 0 with no padding.
        let (next, pad) = advance(240, 256, 0);
        assert_eq!(next, 0);
        assert_eq!(pad, 0);

        // a 200-byte packet right after the wrap: raw = 0 + 16 + 200 = 216, fits.
        let (next2, pad2) = advance(next, 256, 200);
        assert_eq!(next2, 216);
        assert_eq!(pad2, 0);
    }

    #[test]
    fn wraps_with_padding_when_header_straddles() {
        // arena of 100, packet at 76 sized 0: raw = 76 + 16 + 0 = 92, 92+16=108 > 100, must wrap.
        let (next, pad) = advance(76, 100, 0);
        assert_eq!(next, 0);
        assert_eq!(pad, 8);

        // packet at 60 sized 8: raw = 60 + 16 + 8 = 84, 84 + 16 = 100 <= 100, fits exactly.
        let (next2, pad2) = advance(60, 100, 8);
        assert_eq!(next2, 84);
        assert_eq!(pad2, 0);
    }
}
