//! Static range-Asymmetric Numeral System coder (rANS), in order-0
//! (`Rank0`) and order-1 (`Rank1`, context = previous byte) flavours.
//!
//! Both flavours share one engine; `Order` only changes how many
//! probability contexts are modelled and how a context is derived from the
//! bytes seen so far.
//!
//! rANS encodes symbols in reverse order but, unlike the classic
//! decrement-a-pointer ryg_rans implementation, this version buffers each
//! symbol's emitted renormalization bytes into its own small vector (in
//! correct internal order) and only reverses the *order of those vectors*
//! once encoding finishes. That sidesteps the raw-pointer trick entirely,
//! at the cost of more small allocations.

use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder};
use crate::bitstream::{InputBitStream, OutputBitStream};
use crate::error::{KanziError, Result};

const SCALE_BITS: u32 = 12;
const SCALE: u32 = 1 << SCALE_BITS;
const FREQ_BITS: u32 = 13;
const RANS_L: u32 = 1 << 23;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Rank0,
    Rank1,
}

impl Order {
    fn num_contexts(self) -> usize {
        match self {
            Order::Rank0 => 1,
            Order::Rank1 => 256,
        }
    }

    #[inline]
    fn context_of(self, prev: u8) -> usize {
        match self {
            Order::Rank0 => 0,
            Order::Rank1 => prev as usize,
        }
    }
}

struct FreqTable {
    freq: [u32; 256],
    cum: [u32; 257],
}

impl FreqTable {
    fn from_counts(counts: &[u64; 256]) -> Self {
        let total: u64 = counts.iter().sum();
        let mut freq = [0u32; 256];
        if total == 0 {
            // Never queried: context absent from the block.
            return FreqTable { freq, cum: [0u32; 257] };
        }
        let mut assigned = 0u32;
        for (sym, &c) in counts.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let f = ((c * SCALE as u64) / total).max(1) as u32;
            freq[sym] = f;
            assigned += f;
        }
        // Largest-remainder style fixup so totals sum to exactly SCALE.
        while assigned > SCALE {
            let sym = freq.iter().enumerate().filter(|&(_, &f)| f > 1).max_by_key(|&(_, &f)| f).map(|(i, _)| i);
            let sym = sym.expect("cannot reduce: all frequencies already at minimum");
            freq[sym] -= 1;
            assigned -= 1;
        }
        while assigned < SCALE {
            let sym = freq.iter().enumerate().filter(|&(_, &f)| f > 0).max_by_key(|&(_, &f)| f).map(|(i, _)| i).unwrap();
            freq[sym] += 1;
            assigned += 1;
        }
        let mut cum = [0u32; 257];
        let mut acc = 0u32;
        for s in 0..256 {
            cum[s] = acc;
            acc += freq[s];
        }
        cum[256] = acc;
        FreqTable { freq, cum }
    }

    fn find(&self, slot: u32) -> u8 {
        // Linear scan: table has at most 256 entries and this is a
        // correctness-first contract implementation, not a perf-tuned one.
        for s in 0..256 {
            if slot >= self.cum[s] && slot < self.cum[s + 1] {
                return s as u8;
            }
        }
        unreachable!("slot out of range of cumulative frequency table")
    }
}

fn write_freq_table<W: Write>(bs: &mut OutputBitStream<W>, table: &FreqTable) -> Result<()> {
    for s in 0..256 {
        bs.write_bits(table.freq[s] as u64, FREQ_BITS)?;
    }
    Ok(())
}

fn read_freq_table<R: Read>(bs: &mut InputBitStream<R>) -> Result<FreqTable> {
    let mut freq = [0u32; 256];
    for slot in freq.iter_mut() {
        *slot = bs.read_bits(FREQ_BITS)? as u32;
    }
    let mut cum = [0u32; 257];
    let mut acc = 0u32;
    for s in 0..256 {
        cum[s] = acc;
        acc += freq[s];
    }
    cum[256] = acc;
    Ok(FreqTable { freq, cum })
}

pub struct AnsEncoder<W: Write> {
    bs: OutputBitStream<W>,
    order: Order,
}

impl<W: Write> AnsEncoder<W> {
    pub fn new(bs: OutputBitStream<W>, order: Order) -> Self {
        AnsEncoder { bs, order }
    }
}

impl<W: Write> EntropyEncoder<W> for AnsEncoder<W> {
    fn encode(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let n = self.order.num_contexts();
        let mut counts: Vec<[u64; 256]> = vec![[0u64; 256]; n];
        let mut prev = 0u8;
        for &b in bytes {
            counts[self.order.context_of(prev)][b as usize] += 1;
            prev = b;
        }
        let tables: Vec<FreqTable> = counts.iter().map(FreqTable::from_counts).collect();

        if self.order == Order::Rank1 {
            for (ctx, c) in counts.iter().enumerate() {
                let used = c.iter().sum::<u64>() > 0;
                self.bs.write_bit(used as u64)?;
                let _ = ctx;
            }
        }
        for (ctx, table) in tables.iter().enumerate() {
            let used = counts[ctx].iter().sum::<u64>() > 0;
            if used {
                write_freq_table(&mut self.bs, table)?;
            }
        }

        // Reverse-order rANS encode. Each symbol's renormalization bytes are
        // collected into their own buffer so per-symbol byte order survives
        // the later "reverse symbol order" step untouched.
        let mut contexts = vec![0u8; bytes.len()];
        {
            let mut prev = 0u8;
            for (i, &b) in bytes.iter().enumerate() {
                contexts[i] = self.order.context_of(prev) as u8;
                prev = b;
            }
        }

        let mut state: u32 = RANS_L;
        let mut per_symbol: Vec<Vec<u8>> = Vec::with_capacity(bytes.len());
        for i in (0..bytes.len()).rev() {
            let ctx = contexts[i] as usize;
            let table = &tables[ctx];
            let sym = bytes[i];
            let freq = table.freq[sym as usize];
            let start = table.cum[sym as usize];
            let mut out_bytes = Vec::new();
            let x_max = ((RANS_L >> SCALE_BITS) << 8) * freq;
            while state >= x_max {
                out_bytes.push((state & 0xff) as u8);
                state >>= 8;
            }
            state = ((state / freq) << SCALE_BITS) + (state % freq) + start;
            per_symbol.push(out_bytes);
        }
        per_symbol.reverse();

        for b in state.to_be_bytes() {
            self.bs.write_bits(b as u64, 8)?;
        }
        for buf in per_symbol {
            for b in buf {
                self.bs.write_bits(b as u64, 8)?;
            }
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

pub struct AnsDecoder<R: Read> {
    bs: InputBitStream<R>,
    order: Order,
}

impl<R: Read> AnsDecoder<R> {
    pub fn new(bs: InputBitStream<R>, order: Order) -> Self {
        AnsDecoder { bs, order }
    }
}

impl<R: Read> EntropyDecoder<R> for AnsDecoder<R> {
    fn decode(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let n = self.order.num_contexts();
        let mut used = vec![true; n];
        if self.order == Order::Rank1 {
            for slot in used.iter_mut() {
                *slot = self.bs.read_bit()? == 1;
            }
        }
        let mut tables: Vec<FreqTable> = Vec::with_capacity(n);
        for &u in &used {
            if u {
                tables.push(read_freq_table(&mut self.bs)?);
            } else {
                tables.push(FreqTable { freq: [0; 256], cum: [0; 257] });
            }
        }

        let mut state: u32 = 0;
        for _ in 0..4 {
            state = (state << 8) | self.bs.read_bits(8)? as u32;
        }

        let mut prev = 0u8;
        for slot in out.iter_mut() {
            let ctx = self.order.context_of(prev);
            let table = &tables[ctx];
            if table.cum[256] == 0 {
                return Err(KanziError::ProcessBlock(
                    "ans: referenced context has no frequency table".into(),
                ));
            }
            let s = state & (SCALE - 1);
            let sym = table.find(s);
            let freq = table.freq[sym as usize];
            let start = table.cum[sym as usize];
            state = freq * (state >> SCALE_BITS) + s - start;
            while state < RANS_L {
                state = (state << 8) | self.bs.read_bits(8)? as u32;
            }
            *slot = sym;
            prev = sym;
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
