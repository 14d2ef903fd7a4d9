//! Classical momentum step.

/// Decay `velocity`, add the scaled gradient, and step by the velocity.
pub fn momentum(
    learning_rate: f64,
    value: f64,
    gradient: f64,
    velocity: &mut f64,
    mu: f64,
) -> f64 {
    *velocity = mu * *velocity + learning_rate * gradient;
    value + *velocity
}
