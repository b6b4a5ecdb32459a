//! Deterministic random number generation.
//!
//! RULE: Nothing in the synthesizer may call any platform RNG.
//! All randomness flows through one SynthRng seeded once by the engine
//! and passed by `&mut` into every sampling call, in a fixed order.
//!
//! The only other generators are short-lived keyed sub-generators built
//! by a ReseedStrategy. They never touch the shared stream, so plugging a
//! strategy in or out changes only the draws it owns.

use crate::types::{CustomerId, Season};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG stream.
pub struct SynthRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SynthRng {
    pub fn new(seed: u64) -> Self {
        Self {
            name: "shared",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [low, high].
    pub fn range_inclusive(&mut self, low: u32, high: u32) -> u32 {
        assert!(low <= high, "empty range {low}..={high}");
        low + self.next_u64_below(u64::from(high - low) + 1) as u32
    }

    /// Roll a float uniformly in [low, high).
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// `amount` distinct indices from `0..len`, without replacement.
    /// `amount` is capped at `len`.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.inner, len, amount.min(len)).into_vec()
    }
}

/// Decides whether a season-scoped date draw runs on a keyed
/// sub-generator instead of the shared stream.
pub trait ReseedStrategy {
    fn name(&self) -> &'static str;

    /// Seed for the sub-generator, or None to keep drawing from the
    /// shared stream.
    fn seed_for(&self, customer_id: CustomerId, season: Season, year: i32) -> Option<u64>;

    /// Build the sub-generator for this key, if the strategy reseeds.
    fn sub_rng(&self, customer_id: CustomerId, season: Season, year: i32) -> Option<SynthRng> {
        self.seed_for(customer_id, season, year)
            .map(|seed| SynthRng::new(seed).with_name("keyed"))
    }
}

/// Seed = customer id + season hash + year.
///
/// Two customers that share (id, season, year) get identical draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyedReseed;

impl ReseedStrategy for KeyedReseed {
    fn name(&self) -> &'static str {
        "keyed"
    }

    fn seed_for(&self, customer_id: CustomerId, season: Season, year: i32) -> Option<u64> {
        Some(
            customer_id
                .wrapping_add(season_hash(season))
                .wrapping_add(year as u64),
        )
    }
}

/// Never reseeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedStream;

impl ReseedStrategy for SharedStream {
    fn name(&self) -> &'static str {
        "shared"
    }

    fn seed_for(&self, _customer_id: CustomerId, _season: Season, _year: i32) -> Option<u64> {
        None
    }
}

/// FNV-1a over the season name. Stable across runs and platforms.
pub fn season_hash(season: Season) -> u64 {
    season.name().bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
