//! Move-to-front transform: each input byte is replaced by its current rank
//! in a recency-ordered list of all 256 byte values, and that byte is then
//! moved to the front of the list. The list is kept as a flat array with
//! index-based moves (no `next`/`prev` pointers), the simplification the
//! big sibling `Sbrt` transform already demonstrates for a 16-way segmented
//! version of the same idea; this transform stays with the single flat
//! list since 256 elements is cheap to shift per symbol.

use super::Transform;
use crate::error::Result;

pub struct Mtft {
    order: [u8; 256],
}

impl Mtft {
    pub fn new() -> Self {
        let mut order = [0u8; 256];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Mtft { order }
    }

    fn reset(&mut self) {
        for (i, slot) in self.order.iter_mut().enumerate() {
            *slot = i as u8;
        }
    }

    fn rank_of(&self, byte: u8) -> usize {
        self.order.iter().position(|&b| b == byte).expect("order holds every byte value")
    }

    fn move_to_front(&mut self, rank: usize) {
        let byte = self.order[rank];
        self.order.copy_within(0..rank, 1);
        self.order[0] = byte;
    }
}

impl Default for Mtft {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Mtft {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        self.reset();
        for (i, &b) in input.iter().enumerate() {
            let rank = self.rank_of(b);
            output[i] = rank as u8;
            self.move_to_front(rank);
        }
        Ok(input.len())
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        self.reset();
        for (i, &rank) in input.iter().enumerate() {
            let rank = rank as usize;
            let byte = self.order[rank];
            output[i] = byte;
            self.move_to_front(rank);
        }
        Ok(input.len())
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &[u8]) {
        let mut fwd = Mtft::new();
        let mut transformed = vec![0u8; input.len()];
        fwd.forward(input, &mut transformed).unwrap();

        let mut inv = Mtft::new();
        let mut restored = vec![0u8; input.len()];
        inv.inverse(&transformed, &mut restored).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn round_trips_mississippi() {
        round_trip(b"mississippi");
    }

    #[test]
    fn round_trips_repeated_bytes_to_mostly_zeros() {
        let input = vec![b'q'; 32];
        let mut fwd = Mtft::new();
        let mut out = vec![0u8; input.len()];
        fwd.forward(&input, &mut out).unwrap();
        assert_eq!(out[0], b'q');
        assert!(out[1..].iter().all(|&r| r == 0));
    }

    #[test]
    fn round_trips_empty_input() {
        round_trip(b"");
    }
}
