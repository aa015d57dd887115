//! Burrows-Wheeler Transform: forward via suffix array, inverse via a
//! bucket-histogram LF walk. Two inverse code paths exist only because the
//! packed `(count << 8) | byte` word used for small blocks no longer fits a
//! `u32` once the block is large enough that the count alone needs more
//! than 24 bits; the LF-walk recurrence is identical either way.

mod suffix_array;

use suffix_array::build_suffix_array;

use super::Transform;
use crate::config::BWT_BIG_BLOCK_THRESHOLD;
use crate::error::{KanziError, Result};

const PRIMARY_INDEX_BYTES: usize = 4;

pub struct Bwt;

impl Bwt {
    pub fn new() -> Self {
        Bwt
    }
}

impl Default for Bwt {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Bwt {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let n = input.len();
        if output.len() < n + PRIMARY_INDEX_BYTES {
            return Err(KanziError::ProcessBlock("bwt: output buffer too small".into()));
        }
        if n == 0 {
            output[..PRIMARY_INDEX_BYTES].copy_from_slice(&0u32.to_be_bytes());
            return Ok(PRIMARY_INDEX_BYTES);
        }

        let sa = build_suffix_array(input);
        let mut primary_index = 0u32;
        for (i, &s) in sa.iter().enumerate() {
            output[i] = if s == 0 {
                primary_index = i as u32;
                input[n - 1]
            } else {
                input[s as usize - 1]
            };
        }
        output[n..n + PRIMARY_INDEX_BYTES].copy_from_slice(&primary_index.to_be_bytes());
        Ok(n + PRIMARY_INDEX_BYTES)
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        if input.len() < PRIMARY_INDEX_BYTES {
            return Err(KanziError::InvalidStream("bwt: frame too short for primary index".into()));
        }
        let n = input.len() - PRIMARY_INDEX_BYTES;
        let transformed = &input[..n];
        let primary_index = u32::from_be_bytes(input[n..n + PRIMARY_INDEX_BYTES].try_into().unwrap());
        if n == 0 {
            return Ok(0);
        }
        if primary_index as usize >= n {
            return Err(KanziError::InvalidStream(format!(
                "bwt: primary index {primary_index} out of range for block of {n} bytes"
            )));
        }
        if output.len() < n {
            return Err(KanziError::ProcessBlock("bwt: output buffer too small".into()));
        }

        if n < BWT_BIG_BLOCK_THRESHOLD {
            inverse_small(transformed, primary_index, &mut output[..n]);
        } else {
            inverse_big(transformed, primary_index, &mut output[..n]);
        }
        Ok(n)
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        n + PRIMARY_INDEX_BYTES
    }
}

fn inverse_small(transformed: &[u8], primary_index: u32, output: &mut [u8]) {
    let n = transformed.len();
    let mut buckets = [0u32; 256];
    let mut data = vec![0u32; n];
    for (i, &v) in transformed.iter().enumerate() {
        data[i] = (buckets[v as usize] << 8) | v as u32;
        buckets[v as usize] += 1;
    }
    let mut sum = 0u32;
    for b in buckets.iter_mut() {
        let c = *b;
        *b = sum;
        sum += c;
    }

    let mut cur = primary_index as usize;
    output[n - 1] = (data[cur] & 0xFF) as u8;
    for i in (0..n - 1).rev() {
        let sym = (data[cur] & 0xFF) as usize;
        let count = (data[cur] >> 8) as usize;
        cur = count + buckets[sym] as usize;
        output[i] = (data[cur] & 0xFF) as u8;
    }
}

fn inverse_big(transformed: &[u8], primary_index: u32, output: &mut [u8]) {
    let n = transformed.len();
    let mut buckets = [0u32; 256];
    let mut counts = vec![0u32; n];
    let symbols = transformed;
    for (i, &v) in transformed.iter().enumerate() {
        counts[i] = buckets[v as usize];
        buckets[v as usize] += 1;
    }
    let mut sum = 0u32;
    for b in buckets.iter_mut() {
        let c = *b;
        *b = sum;
        sum += c;
    }

    let mut cur = primary_index as usize;
    output[n - 1] = symbols[cur];
    for i in (0..n - 1).rev() {
        let sym = symbols[cur] as usize;
        cur = counts[cur] as usize + buckets[sym] as usize;
        output[i] = symbols[cur];
    }
}
