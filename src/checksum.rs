//! Seeded XXH32 block checksum.
//!
//! Thin wrapper around the `xxhash-rust` crate: the rest of the crate
//! never touches `xxhash_rust` directly, only this module's
//! `block_checksum`.

use crate::config::MAGIC;

/// Hash `data` with XXH32 seeded with the stream magic. Used over the
/// pre-transform bytes of a block when the header's checksum flag is set.
#[inline]
pub fn block_checksum(data: &[u8]) -> u32 {
    xxhash_rust::xxh32::xxh32(data, MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_stable() {
        let h1 = block_checksum(b"");
        let h2 = block_checksum(b"");
        assert_eq!(h1, h2);
    }

    #[test]
    fn differing_inputs_differ() {
        assert_ne!(block_checksum(b"mississippi"), block_checksum(b"mississippo"));
    }

    #[test]
    fn single_bit_flip_changes_hash() {
        let mut data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let base = block_checksum(&data);
        data[3] ^= 0x01;
        assert_ne!(base, block_checksum(&data));
    }
}
