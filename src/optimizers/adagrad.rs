//! Adagrad step.
//!
//! A running sum of squared gradients per parameter divides the step, so
//! frequently updated parameters slow down over time. The cache only grows.

/// Accumulate `gradient^2` into `cache`, then step scaled by its root.
pub fn adagrad(learning_rate: f64, value: f64, gradient: f64, cache: &mut f64) -> f64 {
    *cache += gradient * gradient;
    value + learning_rate * gradient / (1e-6 + cache.sqrt())
}
