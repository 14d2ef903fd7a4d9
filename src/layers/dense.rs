//! Fully-connected layer
//!
//! Every neuron owns its incoming weights, the matching gradient
//! accumulators, and its optimizer state. The input layer is a dense layer
//! with no weights whose activations are written directly.

use crate::layers::{regularize, LayerActivation, RegParams, Totals};
use crate::optimizers::{ParamState, UpdateRule};
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;
use crate::utils::weight_init::WeightInit;

/// One unit of a dense layer.
#[derive(Debug, Clone, Default)]
pub struct Neuron {
    pub weights: Vec<f64>,
    pub delta_weights: Vec<f64>,
    pub bias: f64,
    pub delta_bias: f64,
    pub sum: f64,
    pub activation: f64,
    pub error: f64,
    pub derivative: f64,
    pub dropped: bool,
    pub state: ParamState,
}

/// Fully-connected layer.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub neurons: Vec<Neuron>,
    requested: LayerActivation,
    activation: Option<Activation>,
    snapshot: Option<Vec<(Vec<f64>, f64)>>,
}

impl DenseLayer {
    pub fn new(size: usize, activation: LayerActivation) -> Self {
        Self {
            neurons: (0..size).map(|_| Neuron::default()).collect(),
            requested: activation,
            activation: None,
            snapshot: None,
        }
    }

    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    /// Resolved activation, `None` meaning pass-through.
    pub fn activation(&self) -> Option<Activation> {
        self.activation
    }

    /// Wire the layer to a predecessor of `fan_in` units: resolve the
    /// activation, draw initial weights and biases, and size the optimizer
    /// state. A `fan_in` of zero marks the input layer, which carries no
    /// weights.
    pub fn init(
        &mut self,
        fan_in: usize,
        default_activation: Activation,
        weight_init: WeightInit,
        rule: UpdateRule,
        rng: &mut SimpleRng,
    ) {
        self.activation = self.requested.resolve(default_activation);
        let fan_out = self.neurons.len();

        for neuron in &mut self.neurons {
            neuron.weights = (0..fan_in)
                .map(|_| weight_init.sample(fan_in, fan_out, rng))
                .collect();
            neuron.delta_weights = vec![0.0; fan_in];
            neuron.bias = if fan_in == 0 {
                0.0
            } else {
                rng.gen_range_f64(-0.1, 0.1)
            };
            neuron.delta_bias = 0.0;
            neuron.state = ParamState::for_rule(rule, fan_in);
        }
    }

    /// Write the input layer's activations.
    pub fn set_activations(&mut self, values: &[f64]) {
        for (neuron, &v) in self.neurons.iter_mut().zip(values.iter()) {
            neuron.sum = v;
            neuron.activation = v;
            neuron.dropped = false;
        }
    }

    pub fn activations(&self) -> Vec<f64> {
        self.neurons.iter().map(|n| n.activation).collect()
    }

    /// Forward pass. `dropout` is the retention probability; during training
    /// each neuron is dropped with probability `1 - dropout` and surviving
    /// activations are scaled up by `1 / dropout` so inference needs no
    /// compensation. Pass-through neurons are never scaled.
    pub fn forward(&mut self, prev: &[f64], training: bool, dropout: f64, rng: &mut SimpleRng) {
        let scale = if training { dropout } else { 1.0 };

        for neuron in &mut self.neurons {
            neuron.dropped = training && dropout < 1.0 && rng.next_f64() > dropout;

            let mut sum = neuron.bias;
            for (w, p) in neuron.weights.iter().zip(prev.iter()) {
                sum += w * p;
            }
            neuron.sum = sum;

            neuron.activation = if neuron.dropped {
                0.0
            } else {
                match self.activation {
                    Some(act) => act.apply(sum, false) / scale,
                    None => sum,
                }
            };
        }
    }

    /// Backward pass for the output layer: the error is the raw difference
    /// `expected - activation`, and gradients accumulate on top of whatever
    /// the deltas already hold.
    pub fn backward_output(&mut self, expected: &[f64], prev: &[f64]) {
        for (neuron, &target) in self.neurons.iter_mut().zip(expected.iter()) {
            neuron.error = target - neuron.activation;
            neuron.delta_bias += neuron.error;
            for (dw, p) in neuron.delta_weights.iter_mut().zip(prev.iter()) {
                *dw += neuron.error * p;
            }
        }
    }

    /// Backward pass for a hidden layer. `error_sums[i]` is the sum of the
    /// successor's errors weighted by the connections leaving neuron `i`.
    /// Dropped neurons get a zero error and accumulate nothing.
    pub fn backward_hidden(&mut self, error_sums: &[f64], prev: &[f64]) {
        for (neuron, &weighted) in self.neurons.iter_mut().zip(error_sums.iter()) {
            if neuron.dropped {
                neuron.error = 0.0;
                continue;
            }

            neuron.derivative = match self.activation {
                Some(act) => act.apply(neuron.sum, true),
                None => 1.0,
            };
            neuron.error = neuron.derivative * weighted;

            neuron.delta_bias += neuron.error;
            for (dw, p) in neuron.delta_weights.iter_mut().zip(prev.iter()) {
                *dw += neuron.error * p;
            }
        }
    }

    /// Route this layer's errors back to a predecessor of `prev_len` units.
    pub fn weighted_error_sums(&self, prev_len: usize) -> Vec<f64> {
        let mut sums = vec![0.0; prev_len];
        for neuron in &self.neurons {
            if neuron.error == 0.0 {
                continue;
            }
            for (sum, w) in sums.iter_mut().zip(neuron.weights.iter()) {
                *sum += neuron.error * w;
            }
        }
        sums
    }

    pub fn reset_deltas(&mut self) {
        for neuron in &mut self.neurons {
            neuron.delta_weights.fill(0.0);
            neuron.delta_bias = 0.0;
        }
    }

    /// Apply the accumulated deltas through `update`.
    pub fn apply_with<F>(&mut self, mut update: F, reg: &RegParams, totals: &mut Totals)
    where
        F: FnMut(f64, f64, &mut ParamState, Option<usize>) -> f64,
    {
        for neuron in &mut self.neurons {
            for i in 0..neuron.weights.len() {
                let gradient = regularize(neuron.delta_weights[i], neuron.weights[i], reg, totals);
                let new = update(neuron.weights[i], gradient, &mut neuron.state, Some(i));
                totals.weight_sq += new * new;
                neuron.weights[i] = new;
            }
            neuron.bias = update(neuron.bias, neuron.delta_bias, &mut neuron.state, None);
        }
    }

    pub fn scale_weights(&mut self, factor: f64) {
        for neuron in &mut self.neurons {
            for w in &mut neuron.weights {
                *w *= factor;
            }
        }
    }

    pub fn backup(&mut self) {
        self.snapshot = Some(
            self.neurons
                .iter()
                .map(|n| (n.weights.clone(), n.bias))
                .collect(),
        );
    }

    pub fn restore(&mut self) {
        if let Some(saved) = &self.snapshot {
            for (neuron, (weights, bias)) in self.neurons.iter_mut().zip(saved.iter()) {
                neuron.weights.clone_from(weights);
                neuron.bias = *bias;
            }
        }
    }
}
