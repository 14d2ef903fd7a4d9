//! RMSProp step.
//!
//! Like adagrad but the squared-gradient cache is an exponentially decayed
//! average instead of a running sum, so old gradients fade and the effective
//! step size can recover.

/// Decay `cache` toward `gradient^2`, then step scaled by its root.
pub fn rmsprop(learning_rate: f64, value: f64, gradient: f64, cache: &mut f64, decay: f64) -> f64 {
    *cache = decay * *cache + (1.0 - decay) * gradient * gradient;
    value + learning_rate * gradient / (1e-6 + cache.sqrt())
}
