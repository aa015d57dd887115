//! Canonical Huffman entropy codec.
//!
//! Static per block: a 256-entry code-length table (5 bits each, 0 = symbol
//! unused) is written ahead of the payload. Code assignment follows the
//! usual canonical rule (codes ordered by `(length, symbol)`), so the
//! decoder can rebuild the identical code table from the lengths alone
//! without shipping an explicit code-to-symbol map.

use std::collections::BinaryHeap;
use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::{KanziError, Result};

const NUM_SYMBOLS: usize = 256;
const LENGTH_BITS: u32 = 5;
const MAX_CODE_LENGTH: u8 = 24;

#[derive(Eq, PartialEq)]
struct HeapNode {
    freq: u64,
    // Tie-break on insertion order so the heap is a total order (BinaryHeap
    // requires Ord); the actual tree shape this produces does not affect
    // correctness, only which of several equal-cost trees is chosen.
    seq: u64,
    kind: NodeKind,
}

#[derive(Eq, PartialEq)]
enum NodeKind {
    Leaf(u8),
    Internal(Box<HeapNode>, Box<HeapNode>),
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; we want the smallest frequency first.
        other
            .freq
            .cmp(&self.freq)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn code_lengths(freqs: &[u64; NUM_SYMBOLS]) -> [u8; NUM_SYMBOLS] {
    let mut lengths = [0u8; NUM_SYMBOLS];
    let present: Vec<u8> = (0..NUM_SYMBOLS as u16)
        .filter(|&s| freqs[s as usize] > 0)
        .map(|s| s as u8)
        .collect();

    if present.is_empty() {
        return lengths;
    }
    if present.len() == 1 {
        lengths[present[0] as usize] = 1;
        return lengths;
    }

    let mut heap: BinaryHeap<HeapNode> = BinaryHeap::new();
    let mut seq = 0u64;
    for &s in &present {
        heap.push(HeapNode {
            freq: freqs[s as usize],
            seq,
            kind: NodeKind::Leaf(s),
        });
        seq += 1;
    }

    while heap.len() > 1 {
        let a = heap.pop().unwrap();
        let b = heap.pop().unwrap();
        let merged = HeapNode {
            freq: a.freq + b.freq,
            seq,
            kind: NodeKind::Internal(Box::new(a), Box::new(b)),
        };
        seq += 1;
        heap.push(merged);
    }

    fn walk(node: &HeapNode, depth: u8, lengths: &mut [u8; NUM_SYMBOLS]) {
        match &node.kind {
            NodeKind::Leaf(s) => lengths[*s as usize] = depth.max(1),
            NodeKind::Internal(a, b) => {
                walk(a, depth + 1, lengths);
                walk(b, depth + 1, lengths);
            }
        }
    }
    walk(&heap.pop().unwrap(), 0, &mut lengths);
    lengths
}

/// Builds canonical codes from a lengths table: `(code, length)` per symbol,
/// plus per-length bookkeeping (`first_code`, `counts`, and symbols sorted
/// ascending within each length) shared by both encoder and decoder.
struct CanonicalCodes {
    codes: [(u32, u8); NUM_SYMBOLS],
    first_code: [u32; MAX_CODE_LENGTH as usize + 1],
    symbols_by_length: Vec<Vec<u8>>, // index 0 unused
}

fn build_canonical(lengths: &[u8; NUM_SYMBOLS]) -> Result<CanonicalCodes> {
    let mut symbols_by_length: Vec<Vec<u8>> = vec![Vec::new(); MAX_CODE_LENGTH as usize + 1];
    for (sym, &len) in lengths.iter().enumerate() {
        if len == 0 {
            continue;
        }
        if len as u8 > MAX_CODE_LENGTH {
            return Err(KanziError::ProcessBlock(format!(
                "huffman code length {len} exceeds maximum {MAX_CODE_LENGTH}"
            )));
        }
        symbols_by_length[len as usize].push(sym as u8);
    }

    let mut first_code = [0u32; MAX_CODE_LENGTH as usize + 1];
    let mut codes = [(0u32, 0u8); NUM_SYMBOLS];
    let mut code: u32 = 0;
    for len in 1..=MAX_CODE_LENGTH as usize {
        first_code[len] = code;
        for (rank, &sym) in symbols_by_length[len].iter().enumerate() {
            codes[sym as usize] = (code + rank as u32, len as u8);
        }
        code = (code + symbols_by_length[len].len() as u32) << 1;
    }

    Ok(CanonicalCodes {
        codes,
        first_code,
        symbols_by_length,
    })
}

pub struct HuffmanEncoder<W: Write> {
    bs: OutputBitStream<W>,
}

impl<W: Write> HuffmanEncoder<W> {
    pub fn new(bs: OutputBitStream<W>) -> Self {
        HuffmanEncoder { bs }
    }
}

impl<W: Write> EntropyEncoder<W> for HuffmanEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut freqs = [0u64; NUM_SYMBOLS];
        for &b in bytes {
            freqs[b as usize] += 1;
        }
        let lengths = code_lengths(&freqs);
        for &len in lengths.iter() {
            self.bs.write_bits(len as u64, LENGTH_BITS)?;
        }
        if bytes.is_empty() {
            return Ok(0);
        }
        let table = build_canonical(&lengths)?;
        for &b in bytes {
            let (code, len) = table.codes[b as usize];
            self.bs.write_bits(code as u64, len as u32)?;
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

pub struct HuffmanDecoder<R: Read> {
    bs: InputBitStream<R>,
}

impl<R: Read> HuffmanDecoder<R> {
    pub fn new(bs: InputBitStream<R>) -> Self {
        HuffmanDecoder { bs }
    }
}

impl<R: Read> EntropyDecoder<R> for HuffmanDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut lengths = [0u8; NUM_SYMBOLS];
        for slot in lengths.iter_mut() {
            *slot = self.bs.read_bits(LENGTH_BITS)? as u8;
        }
        if out.is_empty() {
            return Ok(0);
        }
        let table = build_canonical(&lengths)?;

        for slot in out.iter_mut() {
            let mut code: u32 = 0;
            let mut matched = None;
            for len in 1..=MAX_CODE_LENGTH {
                code = (code << 1) | self.bs.read_bit()? as u32;
                let count = table.symbols_by_length[len as usize].len() as u32;
                if count == 0 {
                    continue;
                }
                let first = table.first_code[len as usize];
                if code >= first && code - first < count {
                    matched = Some(table.symbols_by_length[len as usize][(code - first) as usize]);
                    break;
                }
            }
            *slot = matched.ok_or_else(|| {
                KanziError::ProcessBlock("huffman code did not match any symbol".into())
            })?;
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
