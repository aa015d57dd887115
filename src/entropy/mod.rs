//! Entropy coder interface and factory.
//!
//! Every `EntropyEncoder`/`EntropyDecoder` is built fresh for a single
//! block and discarded afterwards, so per-block statistics never leak
//! across unrelated blocks: the pipeline always calls `new_encoder`/
//! `new_decoder` immediately before encoding/decoding one block's payload
//! and disposes of it immediately after.

mod ans;
mod binary_arithmetic;
mod cm;
mod fpaq;
mod golomb;
mod huffman;
mod none;
mod paq;
mod range;
mod tpaq;

use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::{KanziError, Result};
use std::io::{Read, Write};

/// 5-bit entropy codec identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntropyCodecId {
    None = 0,
    Huffman = 1,
    Range = 2,
    AnsRank0 = 3,
    AnsRank1 = 4,
    Fpaq = 5,
    Cm = 6,
    Paq = 7,
    Tpaq = 8,
    ExpGolomb = 9,
    RiceGolomb = 10,
}

impl EntropyCodecId {
    pub fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            0 => EntropyCodecId::None,
            1 => EntropyCodecId::Huffman,
            2 => EntropyCodecId::Range,
            3 => EntropyCodecId::AnsRank0,
            4 => EntropyCodecId::AnsRank1,
            5 => EntropyCodecId::Fpaq,
            6 => EntropyCodecId::Cm,
            7 => EntropyCodecId::Paq,
            8 => EntropyCodecId::Tpaq,
            9 => EntropyCodecId::ExpGolomb,
            10 => EntropyCodecId::RiceGolomb,
            other => return Err(KanziError::InvalidCodec(format!("unknown entropy id {other}"))),
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Encodes one block's worth of bytes onto a shared bit-stream. A fresh
/// instance is constructed per block; `dispose` must be called before
/// the next coder runs on the same bit-stream, since some coders (range,
/// ans, the arithmetic family) hold pending state that only the final flush
/// commits to the stream.
pub trait EntropyEncoder<W: Write> {
    /// Encodes `bytes`, returning the number of bytes consumed (always
    /// `bytes.len()` for a well-formed call; kept as a return value to match
    /// the interface contract.
    fn encode(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Flushes any buffered state. Must be called exactly once, after the
    /// last `encode` call and before the bit-stream is touched by anything
    /// else.
    fn dispose(&mut self) -> Result<()>;

    /// Reclaims the bit-stream, consuming the encoder.
    fn into_bitstream(self: Box<Self>) -> OutputBitStream<W>;
}

/// Symmetric decoder.
pub trait EntropyDecoder<R: Read> {
    /// Decodes exactly `len` bytes into `out` (which must have length `len`).
    fn decode(&mut self, out: &mut [u8]) -> Result<usize>;

    fn dispose(&mut self) -> Result<()>;

    fn into_bitstream(self: Box<Self>) -> InputBitStream<R>;
}

/// Builds a fresh encoder bound to `bitstream` for the given codec id.
pub fn new_encoder<W: Write + 'static>(
    id: EntropyCodecId,
    bitstream: OutputBitStream<W>,
) -> Result<Box<dyn EntropyEncoder<W>>> {
    Ok(match id {
        EntropyCodecId::None => Box::new(none::NoneEncoder::new(bitstream)),
        EntropyCodecId::Huffman => Box::new(huffman::HuffmanEncoder::new(bitstream)),
        EntropyCodecId::Range => Box::new(range::RangeEncoder::new(bitstream)),
        EntropyCodecId::AnsRank0 => Box::new(ans::AnsEncoder::new(bitstream, ans::Order::Rank0)),
        EntropyCodecId::AnsRank1 => Box::new(ans::AnsEncoder::new(bitstream, ans::Order::Rank1)),
        EntropyCodecId::Fpaq => Box::new(fpaq::FpaqEncoder::new(bitstream)),
        EntropyCodecId::Cm => Box::new(cm::CmEncoder::new(bitstream)),
        EntropyCodecId::Paq => Box::new(paq::PaqEncoder::new(bitstream)),
        EntropyCodecId::Tpaq => Box::new(tpaq::TpaqEncoder::new(bitstream)),
        EntropyCodecId::ExpGolomb => Box::new(golomb::ExpGolombEncoder::new(bitstream)),
        EntropyCodecId::RiceGolomb => Box::new(golomb::RiceGolombEncoder::new(bitstream)),
    })
}

/// Builds a fresh decoder bound to `bitstream` for the given codec id.
pub fn new_decoder<R: Read + 'static>(
    id: EntropyCodecId,
    bitstream: InputBitStream<R>,
) -> Result<Box<dyn EntropyDecoder<R>>> {
    Ok(match id {
        EntropyCodecId::None => Box::new(none::NoneDecoder::new(bitstream)),
        EntropyCodecId::Huffman => Box::new(huffman::HuffmanDecoder::new(bitstream)),
        EntropyCodecId::Range => Box::new(range::RangeDecoder::new(bitstream)),
        EntropyCodecId::AnsRank0 => Box::new(ans::AnsDecoder::new(bitstream, ans::Order::Rank0)),
        EntropyCodecId::AnsRank1 => Box::new(ans::AnsDecoder::new(bitstream, ans::Order::Rank1)),
        EntropyCodecId::Fpaq => Box::new(fpaq::FpaqDecoder::new(bitstream)),
        EntropyCodecId::Cm => Box::new(cm::CmDecoder::new(bitstream)),
        EntropyCodecId::Paq => Box::new(paq::PaqDecoder::new(bitstream)),
        EntropyCodecId::Tpaq => Box::new(tpaq::TpaqDecoder::new(bitstream)),
        EntropyCodecId::ExpGolomb => Box::new(golomb::ExpGolombDecoder::new(bitstream)),
        EntropyCodecId::RiceGolomb => Box::new(golomb::RiceGolombDecoder::new(bitstream)),
    })
}

pub use binary_arithmetic::{BinaryArithmeticDecoder, BinaryArithmeticEncoder, Predictor};

#[cfg(test)]
mod roundtrip_tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(id: EntropyCodecId, data: &[u8]) {
        let mut buf = Vec::new();
        {
            let bs = OutputBitStream::new(&mut buf);
            let mut enc = new_encoder(id, bs).unwrap();
            enc.encode(data).unwrap();
            enc.dispose().unwrap();
            enc.into_bitstream().close().unwrap();
        }
        let bs = InputBitStream::new(Cursor::new(buf));
        let mut dec = new_decoder(id, bs).unwrap();
        let mut out = vec![0u8; data.len()];
        dec.decode(&mut out).unwrap();
        dec.dispose().unwrap();
        assert_eq!(out, data, "round-trip mismatch for {id:?}");
    }

    const SAMPLES: &[&[u8]] = &[
        b"",
        b"a",
        b"mississippi",
        b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        b"3.14159265358979323846264338327950288419716939937510",
    ];

    macro_rules! codec_test {
        ($name:ident, $id:expr) => {
            #[test]
            fn $name() {
                for sample in SAMPLES {
                    roundtrip($id, sample);
                }
            }
        };
    }

    codec_test!(none_roundtrips, EntropyCodecId::None);
    codec_test!(huffman_roundtrips, EntropyCodecId::Huffman);
    codec_test!(range_roundtrips, EntropyCodecId::Range);
    codec_test!(ans_rank0_roundtrips, EntropyCodecId::AnsRank0);
    codec_test!(ans_rank1_roundtrips, EntropyCodecId::AnsRank1);
    codec_test!(fpaq_roundtrips, EntropyCodecId::Fpaq);
    codec_test!(cm_roundtrips, EntropyCodecId::Cm);
    codec_test!(paq_roundtrips, EntropyCodecId::Paq);
    codec_test!(tpaq_roundtrips, EntropyCodecId::Tpaq);
    codec_test!(exp_golomb_roundtrips, EntropyCodecId::ExpGolomb);
    codec_test!(rice_golomb_roundtrips, EntropyCodecId::RiceGolomb);
}
