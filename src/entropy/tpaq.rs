//! `TPAQ`: order-0/order-1/order-2 bit-trees combined by an adaptively
//! weighted logistic mix (stretch, weighted sum, squash) rather than the
//! flat averaging `cm`/`paq` use — the mixer's weights are nudged towards
//! whichever sub-model was closer to the observed bit after every update.

use std::io::{Read, Write};

use super::binary_arithmetic::{stretch, squash, BinaryArithmeticDecoder, BinaryArithmeticEncoder, BitTree, Predictor};
use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::Result;

const ORDER2_CONTEXTS: usize = 1 << 16;
const MIX_LEARNING_RATE: f64 = 0.0008;

#[inline]
fn hash2(h1: u8, h2: u8) -> usize {
    ((h1 as usize) << 8 | h2 as usize) & (ORDER2_CONTEXTS - 1)
}

struct Mixer {
    weights: [f64; 3],
}

impl Mixer {
    fn new() -> Self {
        Mixer { weights: [0.34, 0.33, 0.33] }
    }

    fn mix(&self, st: [f64; 3]) -> f64 {
        self.weights[0] * st[0] + self.weights[1] * st[1] + self.weights[2] * st[2]
    }

    fn train(&mut self, st: [f64; 3], bit: u8, mixed_p: u16) {
        let target = if bit == 1 { 1.0 } else { 0.0 };
        let err = target - (mixed_p as f64 / 4096.0);
        for i in 0..3 {
            self.weights[i] += MIX_LEARNING_RATE * err * st[i];
        }
    }
}

struct MixedOrders {
    order0: BitTree,
    order1: BitTree,
    order2: BitTree,
    mixer: Mixer,
    node: usize,
    h1: u8,
    h2: u8,
    last_stretch: [f64; 3],
}

impl MixedOrders {
    fn new() -> Self {
        MixedOrders {
            order0: BitTree::new(1),
            order1: BitTree::new(256),
            order2: BitTree::new(ORDER2_CONTEXTS),
            mixer: Mixer::new(),
            node: 1,
            h1: 0,
            h2: 0,
            last_stretch: [0.0; 3],
        }
    }
}

impl Predictor for MixedOrders {
    fn begin_byte(&mut self) {
        self.node = 1;
    }

    fn predict(&mut self) -> u16 {
        let ctx1 = self.h1 as usize;
        let ctx2 = hash2(self.h1, self.h2);
        let p0 = self.order0.predict(0, self.node);
        let p1 = self.order1.predict(ctx1, self.node);
        let p2 = self.order2.predict(ctx2, self.node);
        let st = [stretch(p0), stretch(p1), stretch(p2)];
        self.last_stretch = st;
        squash(self.mixer.mix(st)).clamp(1, 4095)
    }

    fn update(&mut self, bit: u8) {
        let ctx1 = self.h1 as usize;
        let ctx2 = hash2(self.h1, self.h2);
        self.order0.update(0, self.node, bit, 5);
        self.order1.update(ctx1, self.node, bit, 5);
        self.order2.update(ctx2, self.node, bit, 5);
        let mixed_p = squash(self.mixer.mix(self.last_stretch));
        self.mixer.train(self.last_stretch, bit, mixed_p);
        self.node = (self.node << 1) | bit as usize;
    }

    fn end_byte(&mut self, byte: u8) {
        self.h2 = self.h1;
        self.h1 = byte;
    }
}

pub struct TpaqEncoder<W: Write> {
    inner: Option<BinaryArithmeticEncoder<W, MixedOrders>>,
    any: bool,
}

impl<W: Write> TpaqEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        TpaqEncoder { inner: Some(BinaryArithmeticEncoder::new(bs, MixedOrders::new())), any: false }
    }
}

impl<W: Write> EntropyEncoder<W> for TpaqEncoder<W> {
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

pub struct TpaqDecoder<R: Read> {
    inner: BinaryArithmeticDecoder<R, MixedOrders>,
}

impl<R: Read> TpaqDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        TpaqDecoder { inner: BinaryArithmeticDecoder::new(bs, MixedOrders::new()) }
    }
}

impl<R: Read> EntropyDecoder<R> for TpaqDecoder<R> {
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
