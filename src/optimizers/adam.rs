//! Adam step.
//!
//! Maintains decayed estimates of the gradient's first and second moments per
//! parameter, bias-corrected by the number of weight applications so far.
//! Decay factors are fixed at 0.9 and 0.999.

/// Update the moment estimates and step. `step` is the 1-based count of
/// weight applications, used for bias correction.
pub fn adam(
    learning_rate: f64,
    value: f64,
    gradient: f64,
    m: &mut f64,
    v: &mut f64,
    step: u64,
) -> f64 {
    *m = 0.9 * *m + 0.1 * gradient;
    *v = 0.999 * *v + 0.001 * gradient * gradient;

    let m_hat = *m / (1.0 - 0.9f64.powf(step as f64));
    let v_hat = *v / (1.0 - 0.999f64.powf(step as f64));

    value + learning_rate * m_hat / (v_hat.sqrt() + 1e-8)
}
