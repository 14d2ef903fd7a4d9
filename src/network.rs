//! Network driver
//!
//! Owns the layer chain and everything the layers share: the
//! hyperparameters, the RNG, the iteration counter and the accumulated
//! regularization penalties. Layers never hold references to each other;
//! every pass walks the chain with split borrows and hands each layer a view
//! of the neighbour it needs.
//!
//! The training contract is the usual accumulate-then-apply cycle:
//! `forward` / `backward` any number of times (once per sample of the
//! mini-batch), then `apply_delta_weights` once and `reset_delta_weights`
//! before the next batch.

use crate::error::NetError;
use crate::layers::{Layer, RegParams, Totals};
use crate::optimizers::{adadelta, adagrad, adam, gain, momentum, rmsprop, vanilla, UpdateRule};
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;
use crate::utils::weight_init::WeightInit;

/// Network-wide training settings.
#[derive(Debug, Clone, Copy)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub l1: f64,
    pub l2: f64,
    /// Dropout retention probability; 1.0 disables dropout.
    pub dropout: f64,
    pub mini_batch_size: usize,
    /// Per-layer cap on the Euclidean norm of the weight vector.
    pub max_norm: Option<f64>,
    /// RMSProp cache decay.
    pub rms_decay: f64,
    /// Adadelta cache decay.
    pub rho: f64,
    /// Momentum coefficient.
    pub momentum: f64,
    pub update_rule: UpdateRule,
    pub weight_init: WeightInit,
    pub activation: Activation,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            l1: 0.0,
            l2: 0.0,
            dropout: 1.0,
            mini_batch_size: 1,
            max_norm: None,
            rms_decay: 0.99,
            rho: 0.95,
            momentum: 0.9,
            update_rule: UpdateRule::Vanilla,
            weight_init: WeightInit::default(),
            activation: Activation::Sigmoid,
        }
    }
}

/// A feed-forward network: a joined chain of dense and convolutional layers.
#[derive(Debug)]
pub struct Network {
    layers: Vec<Layer>,
    pub hp: Hyperparameters,
    rng: SimpleRng,
    joined: bool,
    training: bool,
    iterations: u64,
    l1_error: f64,
    l2_error: f64,
}

impl Network {
    /// Create an empty network. With `seed` absent the RNG is seeded from
    /// the clock, so two unseeded networks diverge.
    pub fn new(hp: Hyperparameters, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SimpleRng::new(s),
            None => {
                let mut rng = SimpleRng::new(1);
                rng.reseed_from_time();
                rng
            }
        };

        Self {
            layers: Vec::new(),
            hp,
            rng,
            joined: false,
            training: false,
            iterations: 0,
            l1_error: 0.0,
            l2_error: 0.0,
        }
    }

    /// Append a layer. Invalidates any previous join.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
        self.joined = false;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Mutable access to the chain, for importing weights into a joined
    /// network.
    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Toggle training mode: dropout masks are only drawn while training.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Number of `apply_delta_weights` calls so far; feeds Adam's bias
    /// correction.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Accumulated L1 penalty over all applied updates.
    pub fn l1_error(&self) -> f64 {
        self.l1_error
    }

    /// Accumulated L2 penalty over all applied updates.
    pub fn l2_error(&self) -> f64 {
        self.l2_error
    }

    pub fn input_len(&self) -> usize {
        self.layers.first().map_or(0, Layer::out_len)
    }

    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, Layer::out_len)
    }

    /// Validate and wire the chain: resolve activations, fix convolutional
    /// geometry, draw initial weights and size the optimizer state. Must be
    /// called before any pass, and again after adding layers.
    pub fn join_layers(&mut self) -> Result<(), NetError> {
        if self.layers.is_empty() {
            return Err(NetError::EmptyNetwork);
        }
        if self.layers.len() < 2 {
            return Err(NetError::invalid_layer(0, "network needs at least two layers"));
        }
        if !matches!(self.layers.first(), Some(Layer::Dense(_))) {
            return Err(NetError::invalid_layer(0, "first layer must be dense"));
        }
        if !matches!(self.layers.last(), Some(Layer::Dense(_))) {
            return Err(NetError::invalid_layer(
                self.layers.len() - 1,
                "output layer must be dense",
            ));
        }

        let hp = self.hp;
        for i in 0..self.layers.len() {
            let (head, tail) = self.layers.split_at_mut(i);
            let prev = head.last();

            match &mut tail[0] {
                Layer::Dense(dense) => {
                    if dense.size() == 0 {
                        return Err(NetError::invalid_layer(i, "layer has no neurons"));
                    }
                    let fan_in = prev.map_or(0, |p| p.out_len());
                    dense.init(fan_in, hp.activation, hp.weight_init, hp.update_rule, &mut self.rng);
                }
                Layer::Conv(conv) => {
                    if conv.filter_count() == 0 {
                        return Err(NetError::invalid_layer(i, "layer has no filters"));
                    }
                    if conv.filter_size() == 0 {
                        return Err(NetError::invalid_layer(i, "filter size must be positive"));
                    }
                    if conv.stride() == 0 {
                        return Err(NetError::invalid_layer(i, "stride must be positive"));
                    }

                    let prev = prev.unwrap();
                    let (channels, in_map) = conv_input_shape(conv, prev, i)?;

                    let padded = in_map + 2 * conv.zero_padding();
                    if conv.filter_size() > padded {
                        return Err(NetError::invalid_layer(
                            i,
                            "filter is larger than the padded input map",
                        ));
                    }
                    if (padded - conv.filter_size()) % conv.stride() != 0 {
                        return Err(NetError::invalid_layer(
                            i,
                            "stride does not evenly cover the padded input map",
                        ));
                    }

                    conv.init(
                        channels,
                        in_map,
                        hp.activation,
                        hp.weight_init,
                        hp.update_rule,
                        &mut self.rng,
                    );
                }
            }
        }

        self.joined = true;
        Ok(())
    }

    /// Forward pass: returns the output layer's activations.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>, NetError> {
        self.require_joined()?;

        let expected = self.input_len();
        if input.len() != expected {
            return Err(NetError::InputSizeMismatch {
                expected,
                got: input.len(),
            });
        }

        if let Layer::Dense(first) = &mut self.layers[0] {
            first.set_activations(input);
        }

        let last = self.layers.len() - 1;
        for i in 1..=last {
            let (head, tail) = self.layers.split_at_mut(i);
            let prev = &head[i - 1];
            // Dropout never applies to the output layer.
            let dropout = if i < last { self.hp.dropout } else { 1.0 };

            match &mut tail[0] {
                Layer::Dense(dense) => {
                    dense.forward(&prev.activations(), self.training, dropout, &mut self.rng);
                }
                Layer::Conv(conv) => {
                    let input = prev.volume_view(conv.channels(), conv.in_map_size());
                    conv.forward(&input, self.training, dropout, &mut self.rng);
                }
            }
        }

        Ok(self.layers[last].activations())
    }

    /// Backward pass from the expected output of the last `forward` call.
    /// Accumulates weight and bias deltas without touching the weights.
    pub fn backward(&mut self, expected: &[f64]) -> Result<(), NetError> {
        self.require_joined()?;

        let out_len = self.output_len();
        if expected.len() != out_len {
            return Err(NetError::TargetSizeMismatch {
                expected: out_len,
                got: expected.len(),
            });
        }

        let last = self.layers.len() - 1;
        {
            let (head, tail) = self.layers.split_at_mut(last);
            let prev = &head[last - 1];
            if let Layer::Dense(output) = &mut tail[0] {
                output.backward_output(expected, &prev.activations());
            }
        }

        for i in (1..last).rev() {
            let (head, rest) = self.layers.split_at_mut(i);
            let (current, next) = rest.split_at_mut(1);
            let prev = &head[i - 1];
            let next = &next[0];

            match &mut current[0] {
                Layer::Dense(dense) => {
                    let sums = error_sums_from(next, dense.size());
                    dense.backward_hidden(&sums, &prev.activations());
                }
                Layer::Conv(conv) => {
                    match next {
                        Layer::Dense(n) => {
                            conv.assign_errors_flat(&n.weighted_error_sums(conv.out_len()));
                        }
                        Layer::Conv(n) => conv.assign_errors_volume(&n.input_error_volume()),
                    }
                    let input = prev.volume_view(conv.channels(), conv.in_map_size());
                    conv.backward(&input);
                }
            }
        }

        Ok(())
    }

    /// Zero every accumulated weight and bias delta.
    pub fn reset_delta_weights(&mut self) {
        for layer in self.layers.iter_mut().skip(1) {
            layer.reset_deltas();
        }
    }

    /// Fold the accumulated deltas into the weights with the configured
    /// update rule, then enforce the max-norm cap per layer.
    pub fn apply_delta_weights(&mut self) -> Result<(), NetError> {
        self.require_joined()?;

        self.iterations += 1;
        let step = self.iterations;
        let hp = self.hp;
        let lr = hp.learning_rate;
        let reg = RegParams {
            l1: hp.l1,
            l2: hp.l2,
            mini_batch_size: hp.mini_batch_size.max(1) as f64,
        };

        for layer in self.layers.iter_mut().skip(1) {
            let mut totals = Totals::default();

            match hp.update_rule {
                UpdateRule::Vanilla => layer.apply_with(
                    |value, gradient, _, _| vanilla::vanilla(lr, value, gradient),
                    &reg,
                    &mut totals,
                ),
                UpdateRule::Gain => layer.apply_with(
                    |value, gradient, state, slot| {
                        let (g, prev) = match slot {
                            Some(i) => (&mut state.gains[i], &mut state.prev_gradients[i]),
                            None => (&mut state.bias_gain, &mut state.bias_prev_gradient),
                        };
                        gain::gain(lr, value, gradient, g, prev)
                    },
                    &reg,
                    &mut totals,
                ),
                UpdateRule::Adagrad => layer.apply_with(
                    |value, gradient, state, slot| {
                        let cache = match slot {
                            Some(i) => &mut state.caches[i],
                            None => &mut state.bias_cache,
                        };
                        adagrad::adagrad(lr, value, gradient, cache)
                    },
                    &reg,
                    &mut totals,
                ),
                UpdateRule::Rmsprop => layer.apply_with(
                    |value, gradient, state, slot| {
                        let cache = match slot {
                            Some(i) => &mut state.caches[i],
                            None => &mut state.bias_cache,
                        };
                        rmsprop::rmsprop(lr, value, gradient, cache, hp.rms_decay)
                    },
                    &reg,
                    &mut totals,
                ),
                UpdateRule::Adam => layer.apply_with(
                    |value, gradient, state, slot| {
                        let (m, v) = match slot {
                            Some(i) => (&mut state.m[i], &mut state.v[i]),
                            None => (&mut state.bias_m, &mut state.bias_v),
                        };
                        adam::adam(lr, value, gradient, m, v, step)
                    },
                    &reg,
                    &mut totals,
                ),
                UpdateRule::Adadelta => layer.apply_with(
                    |value, gradient, state, slot| {
                        let (cache, update_cache) = match slot {
                            Some(i) => (&mut state.caches[i], &mut state.update_caches[i]),
                            None => (&mut state.bias_cache, &mut state.bias_update_cache),
                        };
                        adadelta::adadelta(value, gradient, cache, update_cache, hp.rho)
                    },
                    &reg,
                    &mut totals,
                ),
                UpdateRule::Momentum => layer.apply_with(
                    |value, gradient, state, slot| {
                        let velocity = match slot {
                            Some(i) => &mut state.velocities[i],
                            None => &mut state.bias_velocity,
                        };
                        momentum::momentum(lr, value, gradient, velocity, hp.momentum)
                    },
                    &reg,
                    &mut totals,
                ),
            }

            self.l1_error += totals.l1_error;
            self.l2_error += totals.l2_error;

            if let Some(threshold) = hp.max_norm {
                let norm = totals.weight_sq.sqrt();
                if norm > threshold {
                    layer.scale_weights(threshold / norm);
                }
            }
        }

        Ok(())
    }

    /// Snapshot every layer's weights (for validation-driven early stopping).
    pub fn backup_validation(&mut self) {
        for layer in self.layers.iter_mut().skip(1) {
            layer.backup();
        }
    }

    /// Restore the last validation snapshot.
    pub fn restore_validation(&mut self) {
        for layer in self.layers.iter_mut().skip(1) {
            layer.restore();
        }
    }

    fn require_joined(&self) -> Result<(), NetError> {
        if self.joined {
            Ok(())
        } else {
            Err(NetError::NotJoined)
        }
    }
}

/// Resolve a convolutional layer's input shape from its predecessor.
fn conv_input_shape(
    conv: &crate::layers::ConvLayer,
    prev: &Layer,
    index: usize,
) -> Result<(usize, usize), NetError> {
    match prev {
        Layer::Conv(p) => {
            if let Some(requested) = conv.requested_channels() {
                if requested != p.filter_count() {
                    return Err(NetError::invalid_layer(
                        index,
                        format!(
                            "requested {} channels but the previous layer has {} filters",
                            requested,
                            p.filter_count()
                        ),
                    ));
                }
            }
            Ok((p.filter_count(), p.out_map_size()))
        }
        Layer::Dense(p) => {
            let channels = conv.requested_channels().unwrap_or(1);
            if channels == 0 {
                return Err(NetError::invalid_layer(index, "channel count must be positive"));
            }
            let total = p.size();
            if total % channels != 0 {
                return Err(NetError::invalid_layer(
                    index,
                    format!("{} inputs do not split into {} channels", total, channels),
                ));
            }
            let area = total / channels;
            let side = (area as f64).sqrt().round() as usize;
            if side * side != area {
                return Err(NetError::invalid_layer(
                    index,
                    format!("channel of {} inputs is not square", area),
                ));
            }
            Ok((channels, side))
        }
    }
}

/// Weighted error sums a layer routes back to a predecessor of `len` units.
fn error_sums_from(next: &Layer, len: usize) -> Vec<f64> {
    match next {
        Layer::Dense(n) => n.weighted_error_sums(len),
        Layer::Conv(n) => {
            let vol = n.input_error_volume();
            debug_assert_eq!(vol.data().len(), len);
            vol.data().to_vec()
        }
    }
}
