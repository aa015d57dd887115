//! `CM`: context-mixing binary arithmetic coder blending an order-0 and an
//! order-1 (previous byte) bit-tree by simple averaging. One step up from
//! `fpaq`; `tpaq` goes further and mixes adaptively instead of averaging.

use std::io::{Read, Write};

use super::binary_arithmetic::{BinaryArithmeticDecoder, BinaryArithmeticEncoder, BitTree, Predictor};
use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

struct Order01 {
    order0: BitTree,
    order1: BitTree, // 256 contexts, one per previous byte value
    node: usize,
    prev_byte: usize,
}

impl Order01 {
    fn new() -> Self {
        Order01 { order0: BitTree::new(1), order1: BitTree::new(256), node: 1, prev_byte: 0 }
    }
}

impl Predictor for Order01 {
    fn begin_byte(&mut self) {
        self.node = 1;
    }

    fn predict(&mut self) -> u16 {
        let p0 = self.order0.predict(0, self.node) as u32;
        let p1 = self.order1.predict(self.prev_byte, self.node) as u32;
        (((p0 + p1) / 2).clamp(1, 4095)) as u16
    }

    fn update(&mut self, bit: u8) {
        self.order0.update(0, self.node, bit, 5);
        self.order1.update(self.prev_byte, self.node, bit, 5);
        self.node = (self.node << 1) | bit as usize;
    }

    fn end_byte(&mut self, byte: u8) {
        self.prev_byte = byte as usize;
    }
}

pub struct CmEncoder<W: Write> {
    inner: Option<BinaryArithmeticEncoder<W, Order01>>,
    any: bool,
}

impl<W: Write> CmEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        CmEncoder { inner: Some(BinaryArithmeticEncoder::new(bs, Order01::new())), any: false }
    }
}

impl<W: Write> EntropyEncoder<W> for CmEncoder<W> {
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

pub struct CmDecoder<R: Read> {
    inner: BinaryArithmeticDecoder<R, Order01>,
}

impl<R: Read> CmDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        CmDecoder { inner: BinaryArithmeticDecoder::new(bs, Order01::new()) }
    }
}

impl<R: Read> EntropyDecoder<R> for CmDecoder<R> {
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
