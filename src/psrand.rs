use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Number of independent pseudorandom streams the tester walks through.
pub const STREAM_COUNT: usize = 64;

/// Width of the word drawn from the generator.
pub const WORD_BITS: u32 = u32::BITS;

/// Per-stream seeds, derived once from a master seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTable {
    seeds: [u64; STREAM_COUNT],
}

impl SeedTable {
    pub fn new(master: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(master);
        let mut seeds = [0u64; STREAM_COUNT];
        for s in seeds.iter_mut() {
            *s = rng.next_u64();
        }
        Self { seeds }
    }

    pub fn get(&self, stream: usize) -> u64 {
        self.seeds[stream]
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.seeds.iter().copied()
    }
}

/// Deterministic bit source that hands out `n`-bit chunks of 32-bit words.
///
/// Reseeding discards whatever was left of the current word, so a stream
/// replays identically after every reseed no matter how many bits the
/// previous pass consumed.
pub struct BitStream {
    rng: SmallRng,
    word: u32,
    remaining: u32,
}

impl BitStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            word: 0,
            remaining: 0,
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
        self.word = 0;
        self.remaining = 0;
    }

    /// Unconsumed bits left in the buffered word.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Take the next `n` bits (1..=32, checked when the job is submitted).
    /// A fresh word is drawn when fewer than `n` bits are buffered; leftover
    /// bits of the old word are dropped.
    pub fn next_bits(&mut self, n: u32) -> u32 {
        debug_assert!((1..=WORD_BITS).contains(&n));
        if self.remaining < n {
            self.word = self.rng.next_u32();
            self.remaining = WORD_BITS;
        }
        let out = self.word & crate::chip::data_mask(n);
        self.word = self.word.checked_shr(n).unwrap_or(0);
        self.remaining -= n;
        out
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn reseed_reproduces_sequence(
            seed in any::<u64>(),
            bits in 1u32..=32,
            cells in 0usize..200,
            prefix in 0usize..40,
        ) {
            let mut s = BitStream::new(seed ^ 1);
            for _ in 0..prefix {
                s.next_bits(bits);
            }
            s.reseed(seed);
            let a: Vec<u32> = (0..cells).map(|_| s.next_bits(bits)).collect();
            s.reseed(seed);
            let b: Vec<u32> = (0..cells).map(|_| s.next_bits(bits)).collect();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn chunks_fit_requested_width(seed in any::<u64>(), bits in 1u32..32) {
            let mut s = BitStream::new(seed);
            for _ in 0..64 {
                prop_assert!(s.next_bits(bits) < (1u32 << bits));
            }
        }
    }
}
