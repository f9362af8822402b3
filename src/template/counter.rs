//! Auto-increment counters keyed by their (base, step) pair

use std::collections::HashMap;

/// Largest rounding precision applied; beyond this f64 has no digits left
const MAX_DECIMALS: usize = 15;

/// Numeric identity of a counter. `INC@10@1` and `INC@10.0@1.0` share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CounterKey {
    base: u64,
    step: u64,
}

impl CounterKey {
    fn new(base: f64, step: f64) -> Self {
        Self {
            base: normalized_bits(base),
            step: normalized_bits(step),
        }
    }
}

fn normalized_bits(x: f64) -> u64 {
    // -0.0 and 0.0 must land on the same key
    if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}

/// Running values for a set of counters
///
/// One registry lives for a whole top-level expansion (global `INC`
/// counters); every loop block gets its own for `LOOPINC`.
#[derive(Debug, Clone, Default)]
pub struct CounterRegistry {
    values: HashMap<CounterKey, f64>,
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for `(base, step)` and return its new value
    ///
    /// The first call yields `base`; later calls add `step`. The running
    /// value is rounded to `decimals` places after every update so drift
    /// does not compound.
    pub fn advance(&mut self, base: f64, step: f64, decimals: usize) -> f64 {
        let key = CounterKey::new(base, step);
        let next = match self.values.get(&key) {
            Some(current) => current + step,
            None => base,
        };
        let rounded = round_to(next, decimals);
        self.values.insert(key, rounded);
        rounded
    }

    /// Number of distinct counters seen so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decimal places implied by a step literal (`"0.25"` -> 2, `"1"` -> 0)
pub fn decimal_places(step_literal: &str) -> usize {
    step_literal
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len())
}

fn round_to(x: f64, decimals: usize) -> f64 {
    if decimals > MAX_DECIMALS {
        return x;
    }
    let factor = 10f64.powi(decimals as i32);
    (x * factor).round() / factor
}
