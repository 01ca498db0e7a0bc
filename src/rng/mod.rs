//! Deterministic random number generation
//!
//! ChaCha8 streams derived from (master seed, system, entity, tick) so bot
//! wander, swarm patrol and choice auto-resolution replay under a fixed seed.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct RngManager {
    master_seed: u64,
    current_tick: u64,
    system_rngs: HashMap<u64, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master_seed: seed,
            current_tick: 0,
            system_rngs: HashMap::new(),
        }
    }

    /// Advance to the next tick; per-system streams reset.
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
        self.system_rngs.clear();
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Get or create this tick's RNG stream for a named system.
    pub fn stream(&mut self, system: &str) -> &mut ChaCha8Rng {
        let key = hash_name(system);
        let seed = self.derive_seed(key, 0, self.current_tick);
        self.system_rngs
            .entry(key)
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(seed))
    }

    /// A fresh stream for a specific (system, entity) pair this tick;
    /// stable regardless of iteration order.
    pub fn entity_stream(&self, system: &str, entity: u64) -> ChaCha8Rng {
        let seed = self.derive_seed(hash_name(system), entity, self.current_tick);
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn derive_seed(&self, system_key: u64, entity_id: u64, tick: u64) -> u64 {
        let mut seed = self.master_seed;
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= system_key.wrapping_mul(1103515245);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= entity_id.wrapping_mul(48271);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= tick.wrapping_mul(69069);
        seed
    }
}

fn hash_name(name: &str) -> u64 {
    // FNV-1a; only needs to separate a handful of system names
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in name.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}
