//! Suffix array construction used by the forward BWT.
//!
//! A prefix-doubling construction (`O(n log^2 n)`, sort-based): ranks are
//! refined a power-of-two prefix length at a time until every suffix has a
//! unique rank. This is a correctness-first stand-in for a dedicated
//! induced-sorting algorithm — fine for a contract implementation where the
//! suffix array itself is the published artifact under test, not the
//! constant factor.

/// Builds `SA[0..n)` such that `data[SA[i]..]` is the `i`-th suffix in
/// ascending lexicographic order.
pub fn build_suffix_array(data: &[u8]) -> Vec<u32> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<i64> = data.iter().map(|&b| b as i64).collect();
    let mut tmp: Vec<i64> = vec![0; n];
    let mut k: usize = 1;

    let key = |i: usize, rank: &[i64], k: usize, n: usize| -> (i64, i64) {
        let hi = if i + k < n { rank[i + k] } else { -1 };
        (rank[i], hi)
    };

    loop {
        sa.sort_unstable_by(|&a, &b| key(a, &rank, k, n).cmp(&key(b, &rank, k, n)));

        tmp[sa[0]] = 0;
        for i in 1..n {
            let prev = key(sa[i - 1], &rank, k, n);
            let cur = key(sa[i], &rank, k, n);
            tmp[sa[i]] = tmp[sa[i - 1]] + if prev < cur { 1 } else { 0 };
        }
        rank.copy_from_slice(&tmp);

        if rank[sa[n - 1]] as usize == n - 1 {
            break;
        }
        if k >= n {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes_sorted(data: &[u8], sa: &[u32]) -> bool {
        for w in sa.windows(2) {
            let a = &data[w[0] as usize..];
            let b = &data[w[1] as usize..];
            if a >= b {
                return false;
            }
        }
        true
    }

    #[test]
    fn sorts_suffixes_of_mississippi() {
        let data = b"mississippi";
        let sa = build_suffix_array(data);
        assert_eq!(sa.len(), data.len());
        assert!(suffixes_sorted(data, &sa));
    }

    #[test]
    fn handles_repeated_bytes() {
        let data = vec![b'a'; 64];
        let sa = build_suffix_array(&data);
        assert_eq!(sa, (0..64).rev().collect::<Vec<u32>>());
    }

    #[test]
    fn handles_empty_and_singleton() {
        assert!(build_suffix_array(b"").is_empty());
        assert_eq!(build_suffix_array(b"x"), vec![0]);
    }
}
