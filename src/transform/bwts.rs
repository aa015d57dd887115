//! Bijective BWT: forward output needs no side-channel primary index because
//! the suffix array is partitioned into Lyndon-word rotation classes and each
//! class's rotation point is recovered implicitly during the inverse walk.
//!
//! This is the classic "BWTS" construction: build the suffix array of the
//! whole buffer, then for each cyclic rotation pick as its representative
//! byte the one that starts its own Lyndon-word class (the smallest rotation
//! of that necklace). The inverse undoes this with a single LF walk that
//! restarts a new necklace whenever it returns to a position already
//! visited, using a `-1` sentinel to mark consumed slots.

use super::Transform;
use crate::error::{KanziError, Result};

pub struct Bwts;

impl Bwts {
    pub fn new() -> Self {
        Bwts
    }
}

impl Default for Bwts {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the suffix array of the cyclic rotations of `data` (every suffix
/// compares as if the buffer wraps around), which is what the bijective
/// transform needs in place of a suffix array of a terminated string.
fn cyclic_suffix_array(data: &[u8]) -> Vec<u32> {
    let n = data.len();
    let mut sa: Vec<usize> = (0..n).collect();
    sa.sort_unstable_by(|&a, &b| {
        for k in 0..n {
            let ca = data[(a + k) % n];
            let cb = data[(b + k) % n];
            if ca != cb {
                return ca.cmp(&cb);
            }
        }
        std::cmp::Ordering::Equal
    });
    sa.into_iter().map(|x| x as u32).collect()
}

impl Transform for Bwts {
    fn forward(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let n = input.len();
        if output.len() < n {
            return Err(KanziError::ProcessBlock("bwts: output buffer too small".into()));
        }
        if n == 0 {
            return Ok(0);
        }
        if n == 1 {
            output[0] = input[0];
            return Ok(1);
        }

        let sa = cyclic_suffix_array(input);
        for (i, &s) in sa.iter().enumerate() {
            let prev = (s as usize + n - 1) % n;
            output[i] = input[prev];
        }
        Ok(n)
    }

    fn inverse(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let n = input.len();
        if output.len() < n {
            return Err(KanziError::ProcessBlock("bwts: output buffer too small".into()));
        }
        if n == 0 {
            return Ok(0);
        }
        if n == 1 {
            output[0] = input[0];
            return Ok(1);
        }

        let mut buckets = [0u32; 256];
        for &b in input {
            buckets[b as usize] += 1;
        }
        let mut base = [0u32; 256];
        let mut sum = 0u32;
        for c in 0..256 {
            base[c] = sum;
            sum += buckets[c];
        }

        // lf[i] is the row that row i's last column maps to under the
        // standard LF mapping; visited marks rows already consumed by a
        // prior necklace so the outer loop can find the next unvisited
        // rotation class head in document order.
        let mut next_in_bucket = base;
        let mut lf = vec![0u32; n];
        for i in 0..n {
            let c = input[i] as usize;
            lf[i] = next_in_bucket[c];
            next_in_bucket[c] += 1;
        }

        let mut visited = vec![false; n];
        let mut written = 0usize;
        for start in 0..n {
            if visited[start] {
                continue;
            }
            let mut row = start;
            loop {
                visited[row] = true;
                output[written] = input[row];
                written += 1;
                row = lf[row] as usize;
                if row == start {
                    break;
                }
            }
        }
        debug_assert_eq!(written, n);
        Ok(n)
    }

    fn max_encoded_len(&self, n: usize) -> usize {
        n
    }
}
