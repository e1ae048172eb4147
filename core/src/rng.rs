//! Deterministic random number generation.
//!
//! RULE: Nothing in the gameplay core may call any platform RNG.
//! All randomness flows through EntityRng instances derived from the
//! single master seed in the config.
//!
//! Each entity gets its own stream per in-game day, seeded from
//! (master_seed, unique_id, day). This means:
//!   - Spawning another entity never changes an existing entity's rolls.
//!   - Re-entering a scene on the same day reproduces the same rolls.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for a single entity.
pub struct EntityRng {
    inner: Pcg64Mcg,
}

impl EntityRng {
    pub fn new(derived_seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(derived_seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to its weight.
    /// Returns None when every weight is zero.
    pub fn weighted_index(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        if total == 0 {
            return None;
        }
        let roll = self.next_u64_below(total);
        let mut acc = 0u64;
        for (i, w) in weights.iter().enumerate() {
            acc += u64::from(*w);
            if roll < acc {
                return Some(i);
            }
        }
        None
    }
}

/// Hands out entity RNG streams for one session.
#[derive(Debug, Clone)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_entity(&self, unique_id: &str, day: u32) -> EntityRng {
        let derived_seed = self.master_seed
            ^ fnv1a(unique_id.as_bytes())
            ^ u64::from(day).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        EntityRng::new(derived_seed)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
