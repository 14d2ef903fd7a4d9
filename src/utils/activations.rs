//! Activation functions for neural network layers
//!
//! Every function is exposed through the [`Activation`] enum, which evaluates
//! either the function itself or its derivative. Layers call the derivative
//! form with the unit's pre-activation sum during backpropagation.

use crate::error::NetError;

/// Activation function selector.
///
/// A network carries one default activation, assigned to every layer that
/// does not override it when the chain is joined. Parameterized variants
/// (leaky ReLU, ELU) carry their own coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Logistic sigmoid, `1 / (1 + e^-x)`.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
    /// Rectified linear unit, `max(0, x)`.
    Relu,
    /// Leaky ReLU with a configurable negative-side slope.
    LeakyRelu { alpha: f64 },
    /// Exponential linear unit with a configurable alpha.
    Elu { alpha: f64 },
}

impl Activation {
    /// Parse an activation name, using default coefficients for the
    /// parameterized variants (leaky ReLU alpha 0.01, ELU alpha 1.0).
    pub fn from_name(name: &str) -> Result<Self, NetError> {
        match name.to_lowercase().as_str() {
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            "leaky_relu" | "lrelu" => Ok(Activation::LeakyRelu { alpha: 0.01 }),
            "elu" => Ok(Activation::Elu { alpha: 1.0 }),
            other => Err(NetError::UnknownActivation(other.to_string())),
        }
    }

    /// Evaluate the function at `x`, or its derivative when `derivative` is
    /// true.
    pub fn apply(&self, x: f64, derivative: bool) -> f64 {
        match *self {
            Activation::Sigmoid => {
                let s = 1.0 / (1.0 + (-x).exp());
                if derivative {
                    s * (1.0 - s)
                } else {
                    s
                }
            }
            Activation::Tanh => {
                let t = x.tanh();
                if derivative {
                    1.0 - t * t
                } else {
                    t
                }
            }
            Activation::Relu => {
                if derivative {
                    if x > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    x.max(0.0)
                }
            }
            Activation::LeakyRelu { alpha } => {
                if derivative {
                    if x > 0.0 {
                        1.0
                    } else {
                        alpha
                    }
                } else if x > 0.0 {
                    x
                } else {
                    x * alpha
                }
            }
            Activation::Elu { alpha } => {
                if x >= 0.0 {
                    if derivative {
                        1.0
                    } else {
                        x
                    }
                } else {
                    let e = alpha * (x.exp() - 1.0);
                    if derivative {
                        e + alpha
                    } else {
                        e
                    }
                }
            }
        }
    }
}
