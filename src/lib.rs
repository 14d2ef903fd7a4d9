//! # gradnet
//!
//! A small feed-forward and convolutional neural network training engine
//! with explicit forward, backward and weight-update phases.
//!
//! A network is a chain of dense and convolutional layers driven by a
//! [`Network`]: add layers, `join_layers` to validate and initialize the
//! chain, then run the accumulate-then-apply training cycle. Gradients
//! accumulate across `forward`/`backward` pairs until `apply_delta_weights`
//! folds them into the weights with one of seven update rules and
//! `reset_delta_weights` clears them for the next mini-batch.
//!
//! ```no_run
//! use gradnet::{Hyperparameters, Layer, LayerActivation, DenseLayer, Network};
//!
//! # fn main() -> Result<(), gradnet::NetError> {
//! let mut net = Network::new(Hyperparameters::default(), Some(42));
//! net.add_layer(Layer::Dense(DenseLayer::new(2, LayerActivation::Inherit)));
//! net.add_layer(Layer::Dense(DenseLayer::new(3, LayerActivation::Inherit)));
//! net.add_layer(Layer::Dense(DenseLayer::new(1, LayerActivation::Inherit)));
//! net.join_layers()?;
//!
//! net.set_training(true);
//! for _ in 0..1000 {
//!     net.forward(&[0.0, 1.0])?;
//!     net.backward(&[1.0])?;
//!     net.apply_delta_weights()?;
//!     net.reset_delta_weights();
//! }
//! net.set_training(false);
//! let prediction = net.forward(&[0.0, 1.0])?;
//! # let _ = prediction;
//! # Ok(())
//! # }
//! ```
//!
//! Networks can also be described in JSON and built through
//! [`NetworkConfig`], and several live networks can be managed behind stable
//! handles with a [`NetworkPool`].

pub mod architecture;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod pool;
pub mod utils;

pub use architecture::{LayerConfig, NetworkConfig};
pub use error::NetError;
pub use layers::{ConvLayer, DenseLayer, Layer, LayerActivation};
pub use network::{Hyperparameters, Network};
pub use optimizers::UpdateRule;
pub use pool::NetworkPool;
pub use utils::activations::Activation;
pub use utils::cost::{cross_entropy, mean_squared_error};
pub use utils::weight_init::WeightInit;
