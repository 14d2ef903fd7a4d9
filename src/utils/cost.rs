//! Cost functions
//!
//! Driver-facing loss measures. The engine itself backpropagates from raw
//! output errors, so these are reporting utilities for the training loop.

/// Mean of the squared differences between `target` and `output`.
///
/// # Panics
///
/// Panics if the slices differ in length or are empty.
pub fn mean_squared_error(target: &[f64], output: &[f64]) -> f64 {
    assert_eq!(target.len(), output.len(), "vector lengths must match");
    assert!(!target.is_empty(), "vectors must not be empty");

    target
        .iter()
        .zip(output.iter())
        .map(|(t, o)| (t - o) * (t - o))
        .sum::<f64>()
        / target.len() as f64
}

/// Binary cross entropy, `-sum(t*ln(o) + (1-t)*ln(1-o))`.
///
/// Outputs are clamped away from 0 and 1 so the logarithms stay finite.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn cross_entropy(target: &[f64], output: &[f64]) -> f64 {
    assert_eq!(target.len(), output.len(), "vector lengths must match");

    -target
        .iter()
        .zip(output.iter())
        .map(|(t, o)| {
            let o = o.clamp(1e-15, 1.0 - 1e-15);
            t * o.ln() + (1.0 - t) * (1.0 - o).ln()
        })
        .sum::<f64>()
}
