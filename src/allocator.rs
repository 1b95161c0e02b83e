//! Variant allocation
//!
//! Pure selection of one variant from an [`ExperimentDefinition`]. Weight
//! anomalies (missing, length mismatch, sum off by more than the
//! tolerance) fall back to a uniform draw instead of failing. Randomness
//! comes from an injected [`RandomSource`] so allocation is replayable in
//! tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::config::ExperimentDefinition;

/// Source of uniform random floats in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

/// Thread-local RNG, the production source.
#[derive(Debug, Default)]
pub struct ThreadRngSource;

impl ThreadRngSource {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for ThreadRngSource {
    fn next_f64(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Deterministic source seeded from a u64, for tests and replays.
#[derive(Debug)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Select a variant for a fresh assignment.
///
/// Always returns a member of `definition.variants`. With valid weights
/// this is a cumulative-weight walk; the default variant covers the case
/// where floating-point rounding leaves the draw unmatched.
pub fn allocate<'a>(
    definition: &'a ExperimentDefinition,
    rng: &mut dyn RandomSource,
) -> &'a str {
    if !definition.has_valid_weights() {
        if definition.weights.is_some() {
            warn!(
                experiment = %definition.id,
                "Weights are invalid, using uniform allocation"
            );
        }
        return uniform_pick(definition, rng);
    }

    let weights = definition.weights.as_ref().expect("weights checked valid");
    let draw = rng.next_f64();

    let mut cumulative = 0.0;
    for (variant, weight) in definition.variants.iter().zip(weights) {
        cumulative += weight;
        if draw <= cumulative {
            return variant;
        }
    }

    // Rounding left the draw above the final cumulative weight
    &definition.default_variant
}

fn uniform_pick<'a>(definition: &'a ExperimentDefinition, rng: &mut dyn RandomSource) -> &'a str {
    let index = (rng.next_f64() * definition.variants.len() as f64) as usize;
    definition
        .variants
        .get(index)
        .unwrap_or(&definition.default_variant)
}
