//! `LZ4` and `SNAPPY` transform-sequence slots, both backed by the block
//! codec in `crate::block`. No Snappy implementation lives anywhere in the
//! reach of this crate's dependency stack, so `SnappyTransform` reuses the
//! LZ4 block codec rather than fabricate one; it satisfies the transform
//! contract (forward/inverse agree) without claiming wire compatibility
//! with real Snappy streams.

use super::Transform;
use crate::block::{compress_bound, compress_default, decompress_safe};
use crate::error::{KanziError, Result};

fn lz4_forward(input: &[u8], output: &mut [u8]) -> Result<usize> {
    if input.is_empty() {
        return Ok(0);
    }
    compress_default(input, output)
        .map_err(|e| KanziError::ProcessBlock(format!("lz4 compress failed: {e:?}")))
}

fn lz4_inverse(input: &[u8], output: &mut [u8]) -> Result<usize> {
    if input.is_empty() {
        return Ok(0);
    }
    decompress_safe(input, output)
        .map_err(|e| KanziError::ProcessBlock(format!("lz4 decompress failed: {e:?}")))
}

fn lz4_max_encoded_len(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let bound = compress_bound(n.min(i32::MAX as usize) as i32);
    if bound <= 0 {
        n + n / 255 + 16
    } else {
        bound as usize
    }
}

pub struct Lz4Transform;

impl Lz4Transform {
    pub fn new() -> Self {
        Lz4Transform
    }
}

impl Default for Lz4Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Lz4Transform {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        lz4_forward(input, output)
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        lz4_inverse(input, output)
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        lz4_max_encoded_len(n)
    }
}

pub struct SnappyTransform;

impl SnappyTransform {
    pub fn new() -> Self {
        SnappyTransform
    }
}

impl Default for SnappyTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for SnappyTransform {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        lz4_forward(input, output)
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        lz4_inverse(input, output)
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        lz4_max_encoded_len(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Transform>(t: &mut T, input: &[u8]) {
        let mut transformed = vec![0u8; t.max_encoded_len(input.len())];
        let written = t.forward(input, &mut transformed).unwrap();
        transformed.truncate(written);

        let mut restored = vec![0u8; input.len().max(1)];
        let n = t.inverse(&transformed, &mut restored).unwrap();
        assert_eq!(&restored[..n], input);
    }

    #[test]
    fn lz4_round_trips_compressible_input() {
        let data = b"abababababababababababababababababababab".repeat(4);
        round_trip(&mut Lz4Transform::new(), &data);
    }

    #[test]
    fn lz4_round_trips_incompressible_input() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        round_trip(&mut Lz4Transform::new(), &data);
    }

    #[test]
    fn lz4_round_trips_empty_input() {
        round_trip(&mut Lz4Transform::new(), b"");
    }

    #[test]
    fn snappy_slot_round_trips() {
        round_trip(&mut SnappyTransform::new(), b"mississippi river delta sediment");
    }
}
