use std::io::Write;

use crate::error::{KanziError, Result};

/// Writes bits MSB-first into a 64-bit accumulator, draining full bytes to
/// the backing writer as they fill. `close()` flushes any partial byte,
/// zero-padded on the low (least-significant / "high side" of the bit
/// position) end, and poisons the stream against further writes.
pub struct OutputBitStream<W: Write> {
    inner: Option<W>,
    /// Bits currently buffered, left-justified: the next bit to drain is the
    /// most significant occupied bit.
    acc: u64,
    /// Number of valid bits currently sitting in `acc`.
    acc_bits: u32,
    /// Total number of bits written so far (including ones still buffered).
    written: u64,
}

impl<W: Write> OutputBitStream<W> {
    pub fn new(inner: W) -> Self {
        OutputBitStream {
            inner: Some(inner),
            acc: 0,
            acc_bits: 0,
            written: 0,
        }
    }

    /// Total number of bits appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Appends the low `n` bits of `value`, MSB-first. `n` must be in `1..=64`.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        debug_assert!((1..=64).contains(&n));
        if self.inner.is_none() {
            return Err(KanziError::WriteFile("bitstream is closed".into()));
        }
        let masked = if n == 64 { value } else { value & ((1u64 << n) - 1) };
        self.written += n as u64;

        let mut remaining = n;
        let mut bits = masked;
        while remaining > 0 {
            let space = 64 - self.acc_bits;
            let take = remaining.min(space);
            // Shift the `take` highest bits of `bits` (among the `remaining`
            // significant ones) into position at the bottom of the free
            // space in `acc`.
            let chunk = if take == remaining {
                bits
            } else {
                bits >> (remaining - take)
            };
            let chunk = if take == 64 { chunk } else { chunk & ((1u64 << take) - 1) };
            self.acc = if space == 64 {
                chunk
            } else {
                (self.acc << take) | chunk
            };
            self.acc_bits += take;
            remaining -= take;
            if take < 64 {
                bits &= (1u64 << (remaining)) - 1;
            } else {
                bits = 0;
            }

            if self.acc_bits == 64 {
                self.drain_word()?;
            }
        }
        Ok(())
    }

    /// Appends a single bit (0 or 1).
    #[inline]
    pub fn write_bit(&mut self, bit: u64) -> Result<()> {
        self.write_bits(bit & 1, 1)
    }

    fn drain_word(&mut self) -> Result<()> {
        let bytes = self.acc.to_be_bytes();
        self.inner
            .as_mut()
            .unwrap()
            .write_all(&bytes)
            .map_err(|e| KanziError::WriteFile(e.to_string()))?;
        self.acc = 0;
        self.acc_bits = 0;
        Ok(())
    }

    /// Flushes any partial byte (zero-padded) and closes the backing
    /// resource. Idempotent: a second call is a no-op, matching the
    /// pipeline's overall `close()` idempotency.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };
        if self.acc_bits > 0 {
            // Left-justify the remaining bits within full bytes, zero-padding
            // the low end, then emit only the whole bytes touched.
            let full_bytes = self.acc_bits.div_ceil(8);
            let pad = full_bytes * 8 - self.acc_bits;
            let word = self.acc << pad;
            let bytes = word.to_be_bytes();
            let start = 8 - full_bytes as usize;
            inner
                .write_all(&bytes[start..])
                .map_err(|e| KanziError::WriteFile(e.to_string()))?;
            self.acc = 0;
            self.acc_bits = 0;
        }
        inner.flush().map_err(|e| KanziError::WriteFile(e.to_string()))?;
        Ok(())
    }
}

impl<W: Write> Drop for OutputBitStream<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
