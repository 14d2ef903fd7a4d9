//! Adadelta step.
//!
//! No learning rate: the step is scaled by the ratio of a decayed average of
//! past squared updates to a decayed average of past squared gradients, so
//! the update magnitude is self-calibrating in the parameter's own units.

/// Update the gradient and update caches and step `value`.
pub fn adadelta(
    value: f64,
    gradient: f64,
    cache: &mut f64,
    update_cache: &mut f64,
    rho: f64,
) -> f64 {
    *cache = rho * *cache + (1.0 - rho) * gradient * gradient;

    let new_value =
        value + ((*update_cache + 1e-6) / (*cache + 1e-6)).sqrt() * gradient;

    let delta = new_value - value;
    *update_cache = rho * *update_cache + (1.0 - rho) * delta * delta;

    new_value
}
