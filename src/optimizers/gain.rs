//! Gain-adjusted gradient step.
//!
//! Each parameter carries a gain multiplier, initialized to 1, and remembers
//! the last nonzero gradient it saw. While successive gradients keep the
//! same sign the gain grows additively toward 5; when the sign flips the
//! gain decays multiplicatively toward 0.5. A zero gradient leaves both the
//! gain and the remembered sign untouched.

/// Step `value` by `learning_rate * gain * gradient`, then adapt `gain`
/// from the sign of `gradient` relative to `prev_gradient`.
pub fn gain(
    learning_rate: f64,
    value: f64,
    gradient: f64,
    gain: &mut f64,
    prev_gradient: &mut f64,
) -> f64 {
    let new_value = value + learning_rate * *gain * gradient;

    if gradient != 0.0 {
        if *prev_gradient * gradient < 0.0 {
            *gain = (*gain * 0.95).max(0.5);
        } else {
            *gain = (*gain + 0.05).min(5.0);
        }
        *prev_gradient = gradient;
    }

    new_value
}
