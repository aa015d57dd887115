use std::io::Read;

use crate::error::{KanziError, Result};

/// Reads bits MSB-first from a backing reader, refilling a 64-bit
/// accumulator 8 bytes at a time. The exact inverse of `OutputBitStream`.
pub struct InputBitStream<R: Read> {
    inner: Option<R>,
    acc: u64,
    acc_bits: u32,
    read: u64,
}

impl<R: Read> InputBitStream<R> {
    pub fn new(inner: R) -> Self {
        InputBitStream {
            inner: Some(inner),
            acc: 0,
            acc_bits: 0,
            read: 0,
        }
    }

    /// Total number of bits consumed so far.
    pub fn read(&self) -> u64 {
        self.read
    }

    /// Reads `n` bits (`1..=64`), returning them right-aligned in the
    /// low bits of the result.
    pub fn read_bits(&mut self, n: u32) -> Result<u64> {
        debug_assert!((1..=64).contains(&n));
        let mut remaining = n;
        let mut result: u64 = 0;
        while remaining > 0 {
            if self.acc_bits == 0 {
                self.refill()?;
            }
            let take = remaining.min(self.acc_bits);
            let shift = self.acc_bits - take;
            let chunk = (self.acc >> shift) & mask(take);
            result = if take >= 64 { chunk } else { (result << take) | chunk };
            self.acc_bits -= take;
            remaining -= take;
        }
        self.read += n as u64;
        Ok(result)
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<u64> {
        self.read_bits(1)
    }

    fn refill(&mut self) -> Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| KanziError::ReadFile("bitstream is closed".into()))?;
        let mut bytes = [0u8; 8];
        let n = read_up_to(inner, &mut bytes)?;
        if n == 0 {
            return Err(KanziError::ReadFile("end-of-stream".into()));
        }
        if n == 8 {
            self.acc = u64::from_be_bytes(bytes);
            self.acc_bits = 64;
        } else {
            // Final partial word: only the first `n` bytes are meaningful;
            // right-align them as the `8*n` most significant bits read so far.
            let mut v: u64 = 0;
            for b in &bytes[..n] {
                v = (v << 8) | (*b as u64);
            }
            self.acc = v;
            self.acc_bits = (n * 8) as u32;
        }
        Ok(())
    }

    /// Closes the backing resource. Any read after close fails.
    pub fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

#[inline]
fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Reads as many bytes as available into `buf`, short of EOF, returning the
/// count actually filled (may be 0 at true EOF, 1..=7 on a final partial
/// word, or 8 on a full word).
fn read_up_to<R: Read>(inner: &mut R, buf: &mut [u8; 8]) -> Result<usize> {
    let mut total = 0;
    while total < 8 {
        match inner.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(KanziError::ReadFile(e.to_string())),
        }
    }
    Ok(total)
}
