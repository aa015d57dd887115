//! Run-length transforms: `Rlt` is a general escape-byte RLE, `Zrlt` only
//! compresses runs of the zero byte (the common case immediately after a
//! BWT/MTF stage, where long zero runs dominate and every other byte should
//! be left untouched).

use super::Transform;
use crate::error::{KanziError, Result};

fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| KanziError::InvalidStream("rlt: truncated run length".into()))?;
        *pos += 1;
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(KanziError::InvalidStream("rlt: run length overflow".into()));
        }
    }
    Ok(value)
}

/// Minimum run length worth spending 3 escape bytes on; shorter runs of a
/// byte other than the chosen escape value are emitted literally.
const MIN_RUN: usize = 4;

/// General-purpose run-length transform. The output starts with one byte
/// naming the escape value used for the rest of the block (the least
/// frequent input byte, chosen so escaping costs as little as possible).
/// A run is encoded as `escape, symbol, varint(length)`; every occurrence of
/// the escape byte itself is always run-encoded (even a run of length one)
/// so a bare escape byte never appears in literal position.
pub struct Rlt;

impl Rlt {
    pub fn new() -> Self {
        Rlt
    }
}

impl Default for Rlt {
    fn default() -> Self {
        Self::new()
    }
}

fn least_frequent_byte(input: &[u8]) -> u8 {
    let mut counts = [0u32; 256];
    for &b in input {
        counts[b as usize] += 1;
    }
    let mut best = 0usize;
    for c in 1..256 {
        if counts[c] < counts[best] {
            best = c;
        }
    }
    best as u8
}

impl Transform for Rlt {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let n = input.len();
        if n == 0 {
            return Ok(0);
        }
        let escape = least_frequent_byte(input);
        let mut out = Vec::with_capacity(n + 1);
        out.push(escape);

        let mut i = 0;
        while i < n {
            let b = input[i];
            let mut run = 1;
            while i + run < n && input[i + run] == b {
                run += 1;
            }
            if b == escape || run >= MIN_RUN {
                out.push(escape);
                out.push(b);
                push_varint(&mut out, run as u64);
            } else {
                out.extend(std::iter::repeat(b).take(run));
            }
            i += run;
        }

        if out.len() > output.len() {
            return Err(KanziError::ProcessBlock("rlt: output buffer too small".into()));
        }
        output[..out.len()].copy_from_slice(&out);
        Ok(out.len())
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        if input.is_empty() {
            return Ok(0);
        }
        let escape = input[0];
        let body = &input[1..];
        let mut out = Vec::new();
        let mut i = 0;
        while i < body.len() {
            let b = body[i];
            if b == escape {
                i += 1;
                let symbol = *body
                    .get(i)
                    .ok_or_else(|| KanziError::InvalidStream("rlt: truncated run".into()))?;
                i += 1;
                let run = read_varint(body, &mut i)? as usize;
                if out.len() + run > output.len() {
                    return Err(KanziError::ProcessBlock("rlt: output buffer too small".into()));
                }
                out.extend(std::iter::repeat(symbol).take(run));
            } else {
                out.push(b);
                i += 1;
            }
        }
        if out.len() > output.len() {
            return Err(KanziError::ProcessBlock("rlt: output buffer too small".into()));
        }
        output[..out.len()].copy_from_slice(&out);
        Ok(out.len())
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        n.saturating_mul(3) + 4
    }
}

/// Zero-run-length transform: every maximal run of zero bytes (including a
/// lone zero) is replaced by `0x00, varint(length)`; any other byte passes
/// through untouched. No escape-value bookkeeping is needed because a
/// literal zero can never occur outside a run marker.
pub struct Zrlt;

impl Zrlt {
    pub fn new() -> Self {
        Zrlt
    }
}

impl Default for Zrlt {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Zrlt {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let n = input.len();
        let mut out = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            let b = input[i];
            if b == 0 {
                let mut run = 1;
                while i + run < n && input[i + run] == 0 {
                    run += 1;
                }
                out.push(0);
                push_varint(&mut out, run as u64);
                i += run;
            } else {
                out.push(b);
                i += 1;
            }
        }
        if out.len() > output.len() {
            return Err(KanziError::ProcessBlock("zrlt: output buffer too small".into()));
        }
        output[..out.len()].copy_from_slice(&out);
        Ok(out.len())
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < input.len() {
            let b = input[i];
            if b == 0 {
                i += 1;
                let run = read_varint(input, &mut i)? as usize;
                if out.len() + run > output.len() {
                    return Err(KanziError::ProcessBlock("zrlt: output buffer too small".into()));
                }
                out.extend(std::iter::repeat(0u8).take(run));
            } else {
                out.push(b);
                i += 1;
            }
        }
        if out.len() > output.len() {
            return Err(KanziError::ProcessBlock("zrlt: output buffer too small".into()));
        }
        output[..out.len()].copy_from_slice(&out);
        Ok(out.len())
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        n.saturating_mul(2) + 2
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
    fn rlt_round_trips_long_runs() {
        let mut data = vec![b'a'; 50];
        data.extend(vec![b'b'; 3]);
        data.extend(b"hello world");
        round_trip(&mut Rlt::new(), &data);
    }

    #[test]
    fn rlt_round_trips_no_runs() {
        round_trip(&mut Rlt::new(), b"abcdefgh");
    }

    #[test]
    fn rlt_round_trips_empty() {
        round_trip(&mut Rlt::new(), b"");
    }

    #[test]
    fn zrlt_round_trips_zero_runs() {
        let mut data = vec![0u8; 30];
        data.extend(b"payload");
        data.extend(vec![0u8; 1]);
        data.extend(b"tail");
        round_trip(&mut Zrlt::new(), &data);
    }

    #[test]
    fn zrlt_round_trips_no_zeros() {
        round_trip(&mut Zrlt::new(), b"mississippi");
    }
}
