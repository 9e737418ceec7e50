//! Deterministic ticket lottery.
//!
//! A counter-mode Blake2b-256 stream seeded by the block hash. Every digest
//! yields eight big-endian `u32` words; once they are used the counter is
//! bumped and the seed rehashed.

use ticketchain_consensus::{blake2b256, Hash};

/// Pseudo-random `u32` stream derived from a 32-byte IV.
pub struct Hash256Prng {
    seed: Hash,
    counter: u32,
    cached: [u8; 32],
    word: usize,
}

impl Hash256Prng {
    pub fn new(iv: Hash) -> Self {
        Self {
            seed: iv,
            counter: 0,
            cached: blake2b256(&[iv.as_bytes(), &0u32.to_be_bytes()]),
            word: 0,
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.word == 8 {
            self.counter = self.counter.wrapping_add(1);
            self.cached = blake2b256(&[self.seed.as_bytes(), &self.counter.to_be_bytes()]);
            self.word = 0;
        }
        let start = self.word * 4;
        let bytes = [
            self.cached[start],
            self.cached[start + 1],
            self.cached[start + 2],
            self.cached[start + 3],
        ];
        self.word += 1;
        u32::from_be_bytes(bytes)
    }

    /// Uniform value in `[0, upper)`.
    ///
    /// Draws below `2^32 mod upper` are rejected so every residue is equally
    /// likely.
    pub fn uniform(&mut self, upper: u32) -> u32 {
        if upper < 2 {
            return 0;
        }
        let min = upper.wrapping_neg() % upper;
        loop {
            let r = self.next_u32();
            if r >= min {
                return r % upper;
            }
        }
    }
}

/// Pick `count` distinct indices in `[0, pool_size)`, in draw order.
///
/// When the pool is smaller than `count` every index is returned.
pub fn find_ticket_idxs(pool_size: usize, count: usize, prng: &mut Hash256Prng) -> Vec<usize> {
    let upper = pool_size.min(u32::MAX as usize) as u32;
    let wanted = count.min(upper as usize);
    let mut picked: Vec<usize> = Vec::with_capacity(wanted);
    while picked.len() < wanted {
        let idx = prng.uniform(upper) as usize;
        if !picked.contains(&idx) {
            picked.push(idx);
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_is_deterministic() {
        let iv = Hash::digest(b"block");
        let mut a = Hash256Prng::new(iv);
        let mut b = Hash256Prng::new(iv);
        let xs: Vec<u32> = (0..20).map(|_| a.next_u32()).collect();
        let ys: Vec<u32> = (0..20).map(|_| b.next_u32()).collect();
        assert_eq!(xs, ys);

        let mut c = Hash256Prng::new(Hash::digest(b"other"));
        assert_ne!(c.next_u32(), xs[0]);
    }

    #[test]
    fn test_first_words_come_from_seed_digest() {
        let iv = Hash::digest(b"seed");
        let digest = blake2b256(&[iv.as_bytes(), &0u32.to_be_bytes()]);
        let mut prng = Hash256Prng::new(iv);
        for chunk in digest.chunks(4) {
            assert_eq!(prng.next_u32(), u32::from_be_bytes(chunk.try_into().unwrap()));
        }
        let next = blake2b256(&[iv.as_bytes(), &1u32.to_be_bytes()]);
        assert_eq!(prng.next_u32(), u32::from_be_bytes(next[..4].try_into().unwrap()));
    }

    #[test]
    fn test_uniform_in_range() {
        let mut prng = Hash256Prng::new(Hash::ZERO);
        assert_eq!(prng.uniform(0), 0);
        assert_eq!(prng.uniform(1), 0);
        for upper in [2u32, 3, 7, 1000, 0x8000_0001] {
            for _ in 0..50 {
                assert!(prng.uniform(upper) < upper);
            }
        }
    }

    #[test]
    fn test_find_ticket_idxs_distinct() {
        let mut prng = Hash256Prng::new(Hash::digest(b"lottery"));
        let idxs = find_ticket_idxs(10, 5, &mut prng);
        assert_eq!(idxs.len(), 5);
        let mut sorted = idxs.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
        assert!(idxs.iter().all(|&i| i < 10));
    }

    #[test]
    fn test_find_ticket_idxs_small_pool() {
        let mut prng = Hash256Prng::new(Hash::digest(b"small"));
        let mut idxs = find_ticket_idxs(3, 5, &mut prng);
        idxs.sort_unstable();
        assert_eq!(idxs, vec![0, 1, 2]);
        assert!(find_ticket_idxs(0, 5, &mut prng).is_empty());
    }
}
