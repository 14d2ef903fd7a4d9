//! JSON architecture loading
//!
//! A network can be described declaratively and built in one step:
//!
//! ```json
//! {
//!     "learning_rate": 0.2,
//!     "update_rule": "adam",
//!     "activation": "sigmoid",
//!     "layers": [
//!         { "type": "dense", "size": 16 },
//!         { "type": "conv", "filters": 4, "filter_size": 3, "zero_padding": 1 },
//!         { "type": "dense", "size": 2 }
//!     ]
//! }
//! ```
//!
//! Unset hyperparameters fall back to the [`Hyperparameters`] defaults, and
//! selector strings are validated while building, so a typo surfaces as a
//! `NetError` before any training happens.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::NetError;
use crate::layers::{ConvLayer, DenseLayer, Layer, LayerActivation};
use crate::network::{Hyperparameters, Network};
use crate::optimizers::UpdateRule;
use crate::utils::activations::Activation;
use crate::utils::weight_init::WeightInit;

/// Declarative network description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub seed: Option<u64>,
    pub learning_rate: Option<f64>,
    pub update_rule: Option<String>,
    pub weight_init: Option<String>,
    pub activation: Option<String>,
    pub l1: Option<f64>,
    pub l2: Option<f64>,
    pub dropout: Option<f64>,
    pub mini_batch_size: Option<usize>,
    pub max_norm: Option<f64>,
    pub rms_decay: Option<f64>,
    pub rho: Option<f64>,
    pub momentum: Option<f64>,
    pub layers: Vec<LayerConfig>,
}

/// One layer of the description.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum LayerConfig {
    Dense {
        size: usize,
        activation: Option<String>,
    },
    Conv {
        filters: usize,
        filter_size: usize,
        stride: Option<usize>,
        zero_padding: Option<usize>,
        channels: Option<usize>,
        activation: Option<String>,
    },
}

impl NetworkConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Build and join a network from the description.
    pub fn build(&self) -> Result<Network, NetError> {
        let mut hp = Hyperparameters::default();

        if let Some(lr) = self.learning_rate {
            hp.learning_rate = lr;
        }
        if let Some(name) = &self.update_rule {
            hp.update_rule = UpdateRule::from_name(name)?;
        }
        if let Some(name) = &self.weight_init {
            hp.weight_init = WeightInit::from_name(name)?;
        }
        if let Some(name) = &self.activation {
            hp.activation = Activation::from_name(name)?;
        }
        if let Some(l1) = self.l1 {
            hp.l1 = l1;
        }
        if let Some(l2) = self.l2 {
            hp.l2 = l2;
        }
        if let Some(dropout) = self.dropout {
            hp.dropout = dropout;
        }
        if let Some(size) = self.mini_batch_size {
            hp.mini_batch_size = size;
        }
        if let Some(max_norm) = self.max_norm {
            // Zero keeps the constraint disabled.
            hp.max_norm = (max_norm > 0.0).then_some(max_norm);
        }
        if let Some(decay) = self.rms_decay {
            hp.rms_decay = decay;
        }
        if let Some(rho) = self.rho {
            hp.rho = rho;
        }
        if let Some(mu) = self.momentum {
            hp.momentum = mu;
        }

        let mut network = Network::new(hp, self.seed);
        for layer in &self.layers {
            network.add_layer(layer.build()?);
        }
        network.join_layers()?;
        Ok(network)
    }
}

impl LayerConfig {
    fn build(&self) -> Result<Layer, NetError> {
        let parse_activation = |name: &Option<String>| -> Result<LayerActivation, NetError> {
            match name {
                Some(n) => LayerActivation::from_name(n),
                None => Ok(LayerActivation::Inherit),
            }
        };

        match self {
            LayerConfig::Dense { size, activation } => Ok(Layer::Dense(DenseLayer::new(
                *size,
                parse_activation(activation)?,
            ))),
            LayerConfig::Conv {
                filters,
                filter_size,
                stride,
                zero_padding,
                channels,
                activation,
            } => Ok(Layer::Conv(ConvLayer::new(
                *filters,
                *filter_size,
                stride.unwrap_or(1),
                zero_padding.unwrap_or(0),
                *channels,
                parse_activation(activation)?,
            ))),
        }
    }
}
