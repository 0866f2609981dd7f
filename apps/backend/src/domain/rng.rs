//! Game randomness.
//!
//! Every engine state owns a [`GameRng`]: a ChaCha20 stream seeded once at
//! game start from the OS-backed thread RNG. Given the seed the whole game is
//! replayable; without it outcomes cannot be predicted by an observer.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub type Seed = [u8; 32];

/// Draw a fresh, unpredictable seed for a new game or hand.
pub fn fresh_seed() -> Seed {
    rand::rng().random::<Seed>()
}

#[derive(Clone)]
pub struct GameRng(ChaCha20Rng);

impl GameRng {
    pub fn from_seed(seed: Seed) -> Self {
        Self(ChaCha20Rng::from_seed(seed))
    }

    /// Deterministic rng for tests and replays.
    pub fn from_u64(seed: u64) -> Self {
        Self(ChaCha20Rng::seed_from_u64(seed))
    }

    /// Uniform index in `0..upper`.
    pub fn below(&mut self, upper: usize) -> usize {
        debug_assert!(upper > 0, "below() needs a non-empty range");
        self.0.random_range(0..upper)
    }

    /// One fair six-sided die.
    pub fn die(&mut self) -> u8 {
        self.0.random_range(1..=6)
    }

    /// Uniform Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.0.random_range(0..=i);
            items.swap(i, j);
        }
    }
}

impl fmt::Debug for GameRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GameRng { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = GameRng::from_u64(7);
        let mut b = GameRng::from_u64(7);
        let da: Vec<u8> = (0..20).map(|_| a.die()).collect();
        let db: Vec<u8> = (0..20).map(|_| b.die()).collect();
        assert_eq!(da, db);
    }

    #[test]
    fn dice_stay_in_range() {
        let mut rng = GameRng::from_u64(99);
        for _ in 0..500 {
            let d = rng.die();
            assert!((1..=6).contains(&d));
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = GameRng::from_u64(3);
        let mut items: Vec<u32> = (0..52).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..52).collect::<Vec<_>>());
    }

    #[test]
    fn fresh_seeds_differ() {
        assert_ne!(fresh_seed(), fresh_seed());
    }
}
