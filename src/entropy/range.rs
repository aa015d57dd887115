//! Adaptive order-0 byte range coder.
//!
//! A carryless (Subbotin-style) range coder: renormalization forces the
//! top byte of `low`/`low+range` to agree, or clamps `range` to the
//! distance to the next power-of-two boundary, which avoids the
//! cache/carry bookkeeping a classic LZMA-style coder needs. The
//! underlying byte stream rides on the crate's bit-stream via 8-bit
//! `write_bits`/`read_bits` calls.
//!
//! The probability model is a flat order-0 adaptive frequency table over
//! all 256 byte values, periodically rescaled to keep the cumulative total
//! bounded.

use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const TOP: u32 = 1 << 24;
const BOT: u32 = 1 << 16;
const NUM_SYMBOLS: usize = 256;
const INCREMENT: u32 = 24;
const MAX_TOTAL: u32 = 1 << 15;

struct Model {
    freq: [u32; NUM_SYMBOLS],
    total: u32,
}

impl Model {
    fn new() -> Self {
        Model {
            freq: [1; NUM_SYMBOLS],
            total: NUM_SYMBOLS as u32,
        }
    }

    /// Returns `(cum_freq, freq, total)` for `sym`.
    fn range_of(&self, sym: u8) -> (u32, u32, u32) {
        let mut cum = 0u32;
        for f in &self.freq[..sym as usize] {
            cum += *f;
        }
        (cum, self.freq[sym as usize], self.total)
    }

    /// Finds the symbol whose cumulative range contains `target`, returning
    /// `(symbol, cum_freq, freq)`.
    fn find(&self, target: u32) -> (u8, u32, u32) {
        let mut cum = 0u32;
        for (sym, &f) in self.freq.iter().enumerate() {
            if target < cum + f {
                return (sym as u8, cum, f);
            }
            cum += f;
        }
        unreachable!("target out of range of cumulative frequency table");
    }

    fn update(&mut self, sym: u8) {
        self.freq[sym as usize] += INCREMENT;
        self.total += INCREMENT;
        if self.total >= MAX_TOTAL {
            self.total = 0;
            for f in self.freq.iter_mut() {
                *f = (*f >> 1).max(1);
                self.total += *f;
            }
        }
    }
}

struct Encoder {
    low: u32,
    range: u32,
}

impl Encoder {
    fn new() -> Self {
        Encoder { low: 0, range: 0xFFFF_FFFF }
    }

    fn encode<W: Write>(&mut self, cum: u32, freq: u32, total: u32, bs: &mut OutputBitStream<W>) -> Result<()> {
        self.range /= total;
        self.low = self.low.wrapping_add(cum.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(freq);
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) < TOP {
                // top byte stable
            } else if self.range < BOT {
                self.range = (!self.low).wrapping_add(1) & (BOT - 1);
            } else {
                break;
            }
            bs.write_bits((self.low >> 24) as u64, 8)?;
            self.low <<= 8;
            self.range <<= 8;
        }
        Ok(())
    }

    fn flush<W: Write>(&mut self, bs: &mut OutputBitStream<W>) -> Result<()> {
        for _ in 0..4 {
            bs.write_bits((self.low >> 24) as u64, 8)?;
            self.low <<= 8;
        }
        Ok(())
    }
}

struct Decoder {
    low: u32,
    range: u32,
    code: u32,
    initialized: bool,
}

impl Decoder {
    fn new() -> Self {
        Decoder { low: 0, range: 0xFFFF_FFFF, code: 0, initialized: false }
    }

    fn ensure_init<R: Read>(&mut self, bs: &mut InputBitStream<R>) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        for _ in 0..4 {
            self.code = (self.code << 8) | bs.read_bits(8)? as u32;
        }
        self.initialized = true;
        Ok(())
    }

    fn get_freq(&mut self, total: u32) -> u32 {
        self.range /= total;
        let v = self.code.wrapping_sub(self.low) / self.range;
        v.min(total - 1)
    }

    fn decode<R: Read>(&mut self, cum: u32, freq: u32, bs: &mut InputBitStream<R>) -> Result<()> {
        self.low = self.low.wrapping_add(cum.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(freq);
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) < TOP {
            } else if self.range < BOT {
                self.range = (!self.low).wrapping_add(1) & (BOT - 1);
            } else {
                break;
            }
            self.code = (self.code << 8) | bs.read_bits(8)? as u32;
            self.low <<= 8;
            self.range <<= 8;
        }
        Ok(())
    }
}

pub struct RangeEncoder<W: Write> {
    bs: OutputBitStream<W>,
    enc: Encoder,
    model: Model,
    any_symbol: bool,
}

impl<W: Write> RangeEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        RangeEncoder { bs, enc: Encoder::new(), model: Model::new(), any_symbol: false }
    }
}

impl<W: Write> EntropyEncoder<W> for RangeEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        for &b in bytes {
            let (cum, freq, total) = self.model.range_of(b);
            self.enc.encode(cum, freq, total, &mut self.bs)?;
            self.model.update(b);
            self.any_symbol = true;
        }
        Ok(bytes.len())
    }

    fn dispose(&mut self) -> Result<()> {
        // Symmetric with the decoder, which only primes its code register
        // (reading 4 bytes) when asked to decode a non-empty block; an
        // unconditional flush here would leak padding bytes into the next
        // frame on the shared bit-stream.
        if self.any_symbol {
            self.enc.flush(&mut self.bs)?;
        }
        Ok(())
    }

    fn into_bitstream(self: Box<Self>) -> OutputBitStream<W> {
        self.bs
    }
}

pub struct RangeDecoder<R: Read> {
    bs: InputBitStream<R>,
    dec: Decoder,
    model: Model,
}

impl<R: Read> RangeDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        RangeDecoder { bs, dec: Decoder::new(), model: Model::new() }
    }
}

impl<R: Read> EntropyDecoder<R> for RangeDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        self.dec.ensure_init(&mut self.bs)?;
        for slot in out.iter_mut() {
            let target = self.dec.get_freq(self.model.total);
            let (sym, cum, freq) = self.model.find(target);
            self.dec.decode(cum, freq, &mut self.bs)?;
            self.model.update(sym);
            *slot = sym;
        }
        Ok(out.len())
    }

    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_bitstream(self: Box<Self>) -> InputBitStream<R> {
        self.bs
    }
}
