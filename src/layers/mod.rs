//! Layer implementations
//!
//! A network is a flat chain of [`Layer`] values. The chain is closed over
//! the two layer kinds, so adjacency logic (who feeds whom, who routes errors
//! to whom) lives in the network driver and layers only ever see their own
//! state plus borrowed views of a neighbour.

pub mod conv;
pub mod dense;

pub use conv::{ConvLayer, Filter};
pub use dense::{DenseLayer, Neuron};

use crate::error::NetError;
use crate::optimizers::ParamState;
use crate::utils::activations::Activation;
use crate::utils::volume::Volume;

/// Per-layer activation request, resolved against the network default when
/// the chain is joined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerActivation {
    /// Use the network-wide activation.
    Inherit,
    /// No activation, the raw weighted sum passes through.
    Linear,
    /// A specific activation for this layer.
    Fixed(Activation),
}

impl LayerActivation {
    /// Parse a per-layer activation name, where `linear` and `none` select
    /// the pass-through variant.
    pub fn from_name(name: &str) -> Result<Self, NetError> {
        match name.to_lowercase().as_str() {
            "linear" | "none" => Ok(LayerActivation::Linear),
            other => Ok(LayerActivation::Fixed(Activation::from_name(other)?)),
        }
    }

    /// Resolve against the network default.
    pub fn resolve(&self, default: Activation) -> Option<Activation> {
        match self {
            LayerActivation::Inherit => Some(default),
            LayerActivation::Linear => None,
            LayerActivation::Fixed(a) => Some(*a),
        }
    }
}

/// Regularization inputs for one weight-application pass.
#[derive(Debug, Clone, Copy)]
pub struct RegParams {
    pub l1: f64,
    pub l2: f64,
    pub mini_batch_size: f64,
}

/// Running totals collected while applying one layer's deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    /// Accumulated L1 penalty, `l1 * |w|` per weight.
    pub l1_error: f64,
    /// Accumulated L2 penalty, `0.5 * l2 * w^2` per weight.
    pub l2_error: f64,
    /// Sum of squared post-update weights, for the max-norm check.
    pub weight_sq: f64,
}

/// Fold the regularization terms into one weight's accumulated gradient and
/// average over the mini-batch. Bias gradients skip this and are applied raw.
pub(crate) fn regularize(delta: f64, weight: f64, reg: &RegParams, totals: &mut Totals) -> f64 {
    totals.l2_error += 0.5 * reg.l2 * weight * weight;
    totals.l1_error += reg.l1 * weight.abs();

    let sign = if weight > 0.0 { 1.0 } else { -1.0 };
    (delta + reg.l2 * weight + reg.l1 * sign) / reg.mini_batch_size
}

/// One layer of the chain.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(DenseLayer),
    Conv(ConvLayer),
}

impl Layer {
    /// Number of scalar outputs the layer produces.
    pub fn out_len(&self) -> usize {
        match self {
            Layer::Dense(l) => l.size(),
            Layer::Conv(l) => l.out_len(),
        }
    }

    /// Flat copy of the layer's activations. Convolutional activations are
    /// flattened filter-major, row-major within each map.
    pub fn activations(&self) -> Vec<f64> {
        match self {
            Layer::Dense(l) => l.activations(),
            Layer::Conv(l) => l.activations(),
        }
    }

    /// The layer's activations shaped as a volume for a convolutional
    /// successor. Dense activations are reshaped channel-major.
    pub fn volume_view(&self, channels: usize, size: usize) -> Volume<f64> {
        match self {
            Layer::Dense(l) => Volume::from_flat(&l.activations(), channels, size),
            Layer::Conv(l) => l.activation_volume(),
        }
    }

    /// Zero all accumulated weight and bias deltas.
    pub fn reset_deltas(&mut self) {
        match self {
            Layer::Dense(l) => l.reset_deltas(),
            Layer::Conv(l) => l.reset_deltas(),
        }
    }

    /// Apply accumulated deltas through `update`, one call per parameter.
    /// The slot is `Some(weight_index)` for weights and `None` for a bias.
    pub fn apply_with<F>(&mut self, update: F, reg: &RegParams, totals: &mut Totals)
    where
        F: FnMut(f64, f64, &mut ParamState, Option<usize>) -> f64,
    {
        match self {
            Layer::Dense(l) => l.apply_with(update, reg, totals),
            Layer::Conv(l) => l.apply_with(update, reg, totals),
        }
    }

    /// Multiply every weight by `factor` (max-norm rescaling).
    pub fn scale_weights(&mut self, factor: f64) {
        match self {
            Layer::Dense(l) => l.scale_weights(factor),
            Layer::Conv(l) => l.scale_weights(factor),
        }
    }

    /// Snapshot the current weights and biases.
    pub fn backup(&mut self) {
        match self {
            Layer::Dense(l) => l.backup(),
            Layer::Conv(l) => l.backup(),
        }
    }

    /// Restore the last snapshot, if one exists.
    pub fn restore(&mut self) {
        match self {
            Layer::Dense(l) => l.restore(),
            Layer::Conv(l) => l.restore(),
        }
    }
}
