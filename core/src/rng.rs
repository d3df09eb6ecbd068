//! Deterministic random number generation for synthetic data.
//!
//! RULE: Sample data never touches a platform RNG.
//! Every stream is seeded from (today, dataset slot), so two calls with the
//! same inputs produce identical payloads and adding a new slot never
//! changes an existing stream.

use chrono::{Datelike, NaiveDate};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for one synthetic dataset.
pub struct SampleRng {
    inner: Pcg64Mcg,
}

impl SampleRng {
    pub fn new(today: NaiveDate, slot: SampleSlot) -> Self {
        let day_seed = today.num_days_from_ce() as u64;
        let derived_seed = day_seed ^ (slot as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Multiplicative jitter in [1 - spread, 1 + spread).
    pub fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + (self.next_f64() * 2.0 - 1.0) * spread
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }
}

/// Stable dataset slots.
/// NEVER reorder or remove entries. Append only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SampleSlot {
    Customers = 0,
    Countries = 1,
    Products  = 2,
    Monthly   = 3,
}
