//! `NONE` entropy codec: writes/reads bytes through the bit-stream verbatim.
//! Serves as the baseline case in the codec id enum and is used by tests
//! and by the `--codec none` CLI option.

use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

pub struct NoneEncoder<W: Write> {
    bs: OutputBitStream<W>,
}

impl<W: Write> NoneEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        NoneEncoder { bs }
    }
}

impl<W: Write> EntropyEncoder<W> for NoneEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        for &b in bytes {
            self.bs.write_bits(b as u64, 8)?;
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

pub struct NoneDecoder<R: Read> {
    bs: InputBitStream<R>,
}

impl<R: Read> NoneDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        NoneDecoder { bs }
    }
}

impl<R: Read> EntropyDecoder<R> for NoneDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        for slot in out.iter_mut() {
            *slot = self.bs.read_bits(8)? as u8;
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
