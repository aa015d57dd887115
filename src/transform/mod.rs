//! Byte-transform interface and the transform-sequence composition that
//! chains up to four of them behind one 16-bit id.

mod bwt;
mod bwts;
mod lz4;
mod mtft;
mod rlt;
mod sbrt;

pub use bwt::Bwt;
pub use bwts::Bwts;
pub use lz4::{Lz4Transform, SnappyTransform};
pub use mtft::Mtft;
pub use rlt::{Rlt, Zrlt};
pub use sbrt::{Sbrt, SbrtMode};

use crate::error::{KanziError, Result};

/// `forward`/`inverse` consume all of `input` and write to `output`
/// (pre-sized to at least `max_encoded_len(input.len())`), returning the
/// number of bytes actually written. Implementations may keep scratch
/// state across calls but must not assume anything about the relationship
/// between successive calls' inputs.
pub trait Transform {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize>;
    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize>;
    fn max_encoded_len(&self, n: usize) -> usize;
}

/// Named transform-sequence nibble ids (stream header's transform field,
/// four of these packed high-to-low).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransformId {
    None = 0,
    Bwt = 1,
    Bwts = 2,
    Lz4 = 3,
    Snappy = 4,
    Rlt = 5,
    Zrlt = 6,
    Mtft = 7,
    Rank = 8,
    Timestamp = 9,
}

impl TransformId {
    pub fn from_nibble(nibble: u8) -> Result<Self> {
        Ok(match nibble {
            0 => TransformId::None,
            1 => TransformId::Bwt,
            2 => TransformId::Bwts,
            3 => TransformId::Lz4,
            4 => TransformId::Snappy,
            5 => TransformId::Rlt,
            6 => TransformId::Zrlt,
            7 => TransformId::Mtft,
            8 => TransformId::Rank,
            9 => TransformId::Timestamp,
            other => return Err(KanziError::InvalidTransform(format!("unknown transform nibble {other}"))),
        })
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }
}

fn build(id: TransformId) -> Option<Box<dyn Transform + Send>> {
    match id {
        TransformId::None => None,
        TransformId::Bwt => Some(Box::new(Bwt::new())),
        TransformId::Bwts => Some(Box::new(Bwts::new())),
        TransformId::Lz4 => Some(Box::new(Lz4Transform::new())),
        TransformId::Snappy => Some(Box::new(SnappyTransform::new())),
        TransformId::Rlt => Some(Box::new(Rlt::new())),
        TransformId::Zrlt => Some(Box::new(Zrlt::new())),
        TransformId::Mtft => Some(Box::new(Mtft::new())),
        TransformId::Rank => Some(Box::new(Sbrt::new(SbrtMode::Rank))),
        TransformId::Timestamp => Some(Box::new(Sbrt::new(SbrtMode::Timestamp))),
    }
}

/// Decodes a 16-bit transform-sequence id into up to four stages (highest
/// nibble applied first) and runs them forward/inverse with per-stage skip
/// flags, mirroring the frame `mode` byte's bits 6..2.
pub struct TransformSequence {
    stages: Vec<(TransformId, Option<Box<dyn Transform + Send>>)>,
    skip_flags: u8,
}

impl TransformSequence {
    pub fn new(id: u16) -> Self {
        let nibbles = [
            ((id >> 12) & 0xF) as u8,
            ((id >> 8) & 0xF) as u8,
            ((id >> 4) & 0xF) as u8,
            (id & 0xF) as u8,
        ];
        let mut stages = Vec::new();
        if id == 0 {
            // The only-identity case: id == 0 carries no real stage at all,
            // so the single NULL nibble stands on its own.
            stages.push((TransformId::None, None));
        } else {
            // Every other NULL nibble is skipped entirely so the first real
            // transform always lands on bit 0 of the frame's skip-flag
            // field, regardless of which nibble position it came from
            // (e.g. id 0x0001 must put its one stage at bit 0, not bit 1).
            for n in nibbles {
                if n == 0 {
                    continue;
                }
                let tid = TransformId::from_nibble(n).unwrap_or(TransformId::None);
                stages.push((tid, build(tid)));
            }
        }
        TransformSequence { stages, skip_flags: 0 }
    }

    pub fn max_encoded_len(&self, n: usize) -> usize {
        self.stages
            .iter()
            .map(|(_, t)| t.as_ref().map(|t| t.max_encoded_len(n)).unwrap_or(n))
            .max()
            .unwrap_or(n)
            .max(n)
    }

    /// Runs every non-identity stage left to right. On a stage failing (or
    /// overflowing `output`'s capacity), that stage is skipped: its bit is
    /// set in the returned mask and the buffer from before the stage is
    /// carried forward unchanged. Returns `(skip_flags, post_len)`.
    pub fn forward(&mut self, input: &[u8], scratch: &mut Vec<u8>) -> (u8, usize) {
        let mut skip_flags = 0u8;
        let mut buf = input.to_vec();
        for (bit, (_, transform)) in self.stages.iter_mut().enumerate() {
            let Some(transform) = transform else { continue };
            let cap = transform.max_encoded_len(buf.len());
            scratch.clear();
            scratch.resize(cap, 0);
            match transform.forward(&buf, scratch) {
                Ok(written) => {
                    scratch.truncate(written);
                    std::mem::swap(&mut buf, scratch);
                }
                Err(_) => {
                    skip_flags |= 1 << bit;
                }
            }
        }
        let post_len = buf.len();
        *scratch = buf;
        (skip_flags, post_len)
    }

    pub fn set_skip_flags(&mut self, flags: u8) {
        self.skip_flags = flags;
    }

    /// Runs non-skipped stages in reverse order.
    pub fn inverse(&mut self, input: &[u8], scratch: &mut Vec<u8>, block_size: usize) -> Result<usize> {
        let mut buf = input.to_vec();
        for (bit, (_, transform)) in self.stages.iter_mut().enumerate().rev() {
            let Some(transform) = transform else { continue };
            if self.skip_flags & (1 << bit) != 0 {
                continue;
            }
            scratch.clear();
            scratch.resize(block_size.max(buf.len()), 0);
            let written = transform.inverse(&buf, scratch)?;
            scratch.truncate(written);
            std::mem::swap(&mut buf, scratch);
        }
        let len = buf.len();
        *scratch = buf;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A leading NULL nibble (e.g. `0x0001`, nibbles `[0, 0, 0, 1]`) must not
    /// push an identity placeholder ahead of the real stage: the lone real
    /// transform always lands at index 0, so its skip-flag bit is bit 0 per
    /// the frame `mode` layout (§3: "bit 0 = first stage"), matching an id
    /// that names the same transform in the leading nibble instead.
    #[test]
    fn leading_null_nibble_does_not_shift_the_first_real_stage() {
        let leading_zero = TransformSequence::new(0x0001);
        let leading_nonzero = TransformSequence::new(0x1000);
        assert_eq!(leading_zero.stages.len(), 1);
        assert_eq!(leading_zero.stages.len(), leading_nonzero.stages.len());
        assert_eq!(leading_zero.stages[0].0, TransformId::Bwt);
        assert_eq!(leading_zero.stages[0].0, leading_nonzero.stages[0].0);
    }

    /// `id == 0` is the only case that keeps an explicit identity stage.
    #[test]
    fn all_zero_id_is_a_single_identity_stage() {
        let seq = TransformSequence::new(0x0000);
        assert_eq!(seq.stages.len(), 1);
        assert_eq!(seq.stages[0].0, TransformId::None);
    }

    fn round_trip(id: u16, input: &[u8]) -> Vec<u8> {
        let mut forward_seq = TransformSequence::new(id);
        let mut scratch = Vec::new();
        let (skip_flags, post_len) = forward_seq.forward(input, &mut scratch);
        scratch.truncate(post_len);

        let mut inverse_seq = TransformSequence::new(id);
        inverse_seq.set_skip_flags(skip_flags);
        let mut restored = Vec::new();
        let n = inverse_seq.inverse(&scratch, &mut restored, input.len().max(64)).unwrap();
        restored.truncate(n);
        restored
    }

    #[test]
    fn single_stage_round_trips_regardless_of_which_nibble_holds_it() {
        let input = b"mississippi river system".repeat(4);
        // Bwt in the highest nibble (0x1000) and in the lowest (0x0001) must
        // produce the same stage list and therefore the same round trip.
        assert_eq!(round_trip(0x1000, &input), input);
        assert_eq!(round_trip(0x0001, &input), input);
    }

    #[test]
    fn two_stage_sequence_round_trips() {
        let input = b"the quick brown fox jumps over the lazy dog".repeat(8);
        // Bwt (first, highest nibble) then Mtft (second nibble).
        assert_eq!(round_trip(0x1700, &input), input);
    }
}
