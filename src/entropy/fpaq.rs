//! `FPAQ`: order-0 binary arithmetic coding over a per-byte bit-tree.
//! The simplest member of the binary-arithmetic family; `cm`/`paq`/`tpaq`
//! extend this with additional context orders mixed together.

use std::io::{Read, Write};

use super::binary_arithmetic::{BinaryArithmeticDecoder, BinaryArithmeticEncoder, BitTree, Predictor};
use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

struct Order0 {
    tree: BitTree,
    node: usize,
}

impl Order0 {
    fn new() -> Self {
        Order0 { tree: BitTree::new(1), node: 1 }
    }
}

impl Predictor for Order0 {
    fn begin_byte(&mut self) {
        self.node = 1;
    }

    fn predict(&mut self) -> u16 {
        self.tree.predict(0, self.node)
    }

    fn update(&mut self, bit: u8) {
        self.tree.update(0, self.node, bit, 5);
        self.node = (self.node << 1) | bit as usize;
    }
}

pub struct FpaqEncoder<W: Write> {
    inner: Option<BinaryArithmeticEncoder<W, Order0>>,
    any: bool,
}

impl<W: Write> FpaqEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        FpaqEncoder { inner: Some(BinaryArithmeticEncoder::new(bs, Order0::new())), any: false }
    }
}

impl<W: Write> EntropyEncoder<W> for FpaqEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        let enc = self.inner.as_mut().unwrap();
        for &b in bytes {
            enc.encode_byte(b)?;
            self.any = true;
        }
        Ok(bytes.len())
    }

    fn dispose(&mut self) -> Result<()> {
        if self.any {
            self.inner.as_mut().unwrap().flush()?;
        }
        Ok(())
    }

    fn into_bitstream(self: Box<Self>) -> OutputBitStream<W> {
        self.inner.unwrap().into_bitstream()
    }
}

pub struct FpaqDecoder<R: Read> {
    inner: BinaryArithmeticDecoder<R, Order0>,
}

impl<R: Read> FpaqDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        FpaqDecoder { inner: BinaryArithmeticDecoder::new(bs, Order0::new()) }
    }
}

impl<R: Read> EntropyDecoder<R> for FpaqDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        for slot in out.iter_mut() {
            *slot = self.inner.decode_byte()?;
        }
        Ok(out.len())
    }

    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_bitstream(self: Box<Self>) -> InputBitStream<R> {
        self.inner.into_bitstream()
    }
}
