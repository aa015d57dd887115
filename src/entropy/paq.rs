//! `PAQ`: binary arithmetic coding blending an order-0 and an order-2
//! (previous two bytes, hashed) bit-tree by simple averaging.

use std::io::{Read, Write};

use super::binary_arithmetic::{BinaryArithmeticDecoder, BinaryArithmeticEncoder, BitTree, Predictor};
use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const ORDER2_CONTEXTS: usize = 1 << 16;

#[inline]
fn hash2(h1: u8, h2: u8) -> usize {
    ((h1 as usize) << 8 | h2 as usize) & (ORDER2_CONTEXTS - 1)
}

struct Order02 {
    order0: BitTree,
    order2: BitTree,
    node: usize,
    h1: u8,
    h2: u8,
}

impl Order02 {
    fn new() -> Self {
        Order02 { order0: BitTree::new(1), order2: BitTree::new(ORDER2_CONTEXTS), node: 1, h1: 0, h2: 0 }
    }
}

impl Predictor for Order02 {
    fn begin_byte(&mut self) {
        self.node = 1;
    }

    fn predict(&mut self) -> u16 {
        let ctx2 = hash2(self.h1, self.h2);
        let p0 = self.order0.predict(0, self.node) as u32;
        let p2 = self.order2.predict(ctx2, self.node) as u32;
        (((p0 + p2) / 2).clamp(1, 4095)) as u16
    }

    fn update(&mut self, bit: u8) {
        let ctx2 = hash2(self.h1, self.h2);
        self.order0.update(0, self.node, bit, 5);
        self.order2.update(ctx2, self.node, bit, 5);
        self.node = (self.node << 1) | bit as usize;
    }

    fn end_byte(&mut self, byte: u8) {
        self.h2 = self.h1;
        self.h1 = byte;
    }
}

pub struct PaqEncoder<W: Write> {
    inner: Option<BinaryArithmeticEncoder<W, Order02>>,
    any: bool,
}

impl<W: Write> PaqEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        PaqEncoder { inner: Some(BinaryArithmeticEncoder::new(bs, Order02::new())), any: false }
    }
}

impl<W: Write> EntropyEncoder<W> for PaqEncoder<W> {
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

pub struct PaqDecoder<R: Read> {
    inner: BinaryArithmeticDecoder<R, Order02>,
}

impl<R: Read> PaqDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        PaqDecoder { inner: BinaryArithmeticDecoder::new(bs, Order02::new()) }
    }
}

impl<R: Read> EntropyDecoder<R> for PaqDecoder<R> {
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
