//! Shared utilities for the training engine
//!
//! Random number generation, activation functions, weight-initialization
//! strategies, the volume/convolution math and the driver-facing cost
//! functions.

pub mod activations;
pub mod cost;
pub mod rng;
pub mod volume;
pub mod weight_init;

pub use activations::Activation;
pub use rng::SimpleRng;
pub use weight_init::WeightInit;
