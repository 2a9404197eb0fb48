//! Shannon entropy over an empirical value distribution.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Shannon entropy (natural log) of the empirical frequency distribution of
/// `values`.
///
/// Returns `0.0` when all values are identical (or the slice is empty) and
/// `ln(n)` when all `n` values are pairwise distinct.
pub fn shannon_entropy<T: Eq + Hash>(values: &[T]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut counts: FxHashMap<&T, usize> = FxHashMap::default();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }

    let n = values.len() as f64;
    let mut entropy = 0.0;
    for &count in counts.values() {
        let p = count as f64 / n;
        entropy -= p * p.ln();
    }
    entropy
}
