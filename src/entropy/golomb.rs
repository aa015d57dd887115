//! Exponential-Golomb and Rice-Golomb byte codes: fixed, stateless
//! variable-length codes with no adaptive model, useful when a block's
//! byte distribution is already known to be geometric-ish (small values
//! dominant) and the per-block table overhead of `range`/`ans` isn't worth
//! paying.

use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const RICE_K: u32 = 4;

pub struct ExpGolombEncoder<W: Write> {
    bs: OutputBitStream<W>,
}

impl<W: Write> ExpGolombEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        ExpGolombEncoder { bs }
    }
}

impl<W: Write> EntropyEncoder<W> for ExpGolombEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        for &b in bytes {
            let v1 = b as u32 + 1;
            let nbits = 32 - v1.leading_zeros();
            for _ in 0..nbits - 1 {
                self.bs.write_bit(0)?;
            }
            self.bs.write_bits(v1 as u64, nbits)?;
        }
        Ok(bytes.len())
    }

    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_bitstream(self: Box<Self>) -> OutputBitStream<W> {
        self.bs
    }
}

pub struct ExpGolombDecoder<R: Read> {
    bs: InputBitStream<R>,
}

impl<R: Read> ExpGolombDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        ExpGolombDecoder { bs }
    }
}

impl<R: Read> EntropyDecoder<R> for ExpGolombDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        for slot in out.iter_mut() {
            let mut zeros = 0u32;
            while self.bs.read_bit()? == 0 {
                zeros += 1;
            }
            let rest = if zeros == 0 { 0 } else { self.bs.read_bits(zeros)? };
            let v1 = (1u64 << zeros) | rest;
            *slot = (v1 - 1) as u8;
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

pub struct RiceGolombEncoder<W: Write> {
    bs: OutputBitStream<W>,
}

impl<W: Write> RiceGolombEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        RiceGolombEncoder { bs }
    }
}

impl<W: Write> EntropyEncoder<W> for RiceGolombEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        for &b in bytes {
            let v = b as u32;
            let q = v >> RICE_K;
            let r = v & ((1 << RICE_K) - 1);
            for _ in 0..q {
                self.bs.write_bit(1)?;
            }
            self.bs.write_bit(0)?;
            self.bs.write_bits(r as u64, RICE_K)?;
        }
        Ok(bytes.len())
    }

    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_bitstream(self: Box<Self>) -> OutputBitStream<W> {
        self.bs
    }
}

pub struct RiceGolombDecoder<R: Read> {
    bs: InputBitStream<R>,
}

impl<R: Read> RiceGolombDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        RiceGolombDecoder { bs }
    }
}

impl<R: Read> EntropyDecoder<R> for RiceGolombDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        for slot in out.iter_mut() {
            let mut q = 0u32;
            while self.bs.read_bit()? == 1 {
                q += 1;
            }
            let r = self.bs.read_bits(RICE_K)? as u32;
            *slot = ((q << RICE_K) | r) as u8;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::{InputBitStream, OutputBitStream};
    use std::io::Cursor;

    #[test]
    fn exp_golomb_handles_every_byte_value() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut buf = Vec::new();
        {
            let bs = OutputBitStream::new(&mut buf);
            let mut enc = ExpGolombEncoder::new(bs);
            enc.encode(&data).unwrap();
            enc.into_bitstream().close().unwrap();
        }
        let bs = InputBitStream::new(Cursor::new(buf));
        let mut dec = ExpGolombDecoder::new(bs);
        let mut out = vec![0u8; data.len()];
        dec.decode(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn rice_golomb_handles_every_byte_value() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut buf = Vec::new();
        {
            let bs = OutputBitStream::new(&mut buf);
            let mut enc = RiceGolombEncoder::new(bs);
            enc.encode(&data).unwrap();
            enc.into_bitstream().close().unwrap();
        }
        let bs = InputBitStream::new(Cursor::new(buf));
        let mut dec = RiceGolombDecoder::new(bs);
        let mut out = vec![0u8; data.len()];
        dec.decode(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
