//! Plain gradient step.

/// `value + learning_rate * gradient`.
pub fn vanilla(learning_rate: f64, value: f64, gradient: f64) -> f64 {
    value + learning_rate * gradient
}
