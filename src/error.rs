//! Error types for network configuration and use
//!
//! Every failure this crate can report is a configuration error: a chain that
//! was never joined, a vector whose length does not match a layer, an unknown
//! selector name, or a stale network handle. Numerical edge cases (zero
//! denominators in the adaptive update rules) are guarded with epsilons and
//! never surface as errors.

use thiserror::Error;

/// Errors reported by network construction, configuration and the
/// forward/backward/update entry points.
#[derive(Debug, Error)]
pub enum NetError {
    /// The network has no layers.
    #[error("network has no layers")]
    EmptyNetwork,

    /// `join_layers` has not been called since the chain was last modified.
    #[error("layers are not joined; call join_layers() first")]
    NotJoined,

    /// The input vector length does not match the first layer's size.
    #[error("input length {got} does not match first layer size {expected}")]
    InputSizeMismatch { expected: usize, got: usize },

    /// The expected-output vector length does not match the output layer.
    #[error("target length {got} does not match output layer size {expected}")]
    TargetSizeMismatch { expected: usize, got: usize },

    /// A layer is misconfigured (bad conv geometry, zero size, conv output
    /// layer, and so on).
    #[error("layer {index}: {message}")]
    InvalidLayer { index: usize, message: String },

    /// An update-rule name did not match any known rule.
    #[error("unknown update rule '{0}'")]
    UnknownUpdateRule(String),

    /// An activation-function name did not match any known function.
    #[error("unknown activation function '{0}'")]
    UnknownActivation(String),

    /// A weight-initialization name did not match any known strategy.
    #[error("unknown weight initialization '{0}'")]
    UnknownWeightInit(String),

    /// A pool handle refers to a network that does not exist or was removed.
    #[error("no network instance for handle {0}")]
    UnknownNetwork(usize),

    /// A configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetError {
    /// Convenience constructor for layer configuration errors.
    pub(crate) fn invalid_layer(index: usize, message: impl Into<String>) -> Self {
        NetError::InvalidLayer {
            index,
            message: message.into(),
        }
    }
}
