//! Convolutional layer
//!
//! Each filter owns a weight volume spanning every input channel, scalar
//! bias, gradient accumulators, and its output-sized sum, activation and
//! error maps. Map geometry is fixed when the chain is joined:
//! `out = (in + 2 * padding - filter_size) / stride + 1`.
//!
//! Flattened views (toward a dense successor, or reshaping a dense
//! predecessor's activations) are always channel-major, row-major within each
//! map, so the weight a dense neuron holds for filter `f` at map position
//! `(y, x)` sits at index `f * out^2 + y * out + x`.

use crate::layers::{regularize, LayerActivation, RegParams, Totals};
use crate::optimizers::{ParamState, UpdateRule};
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;
use crate::utils::volume::{
    accumulate_filter_gradients, convolve, transposed_convolve, Grid, Volume,
};
use crate::utils::weight_init::WeightInit;

/// One filter with its maps and optimizer state.
#[derive(Debug, Clone)]
pub struct Filter {
    pub weights: Volume<f64>,
    pub delta_weights: Volume<f64>,
    pub bias: f64,
    pub delta_bias: f64,
    pub sum_map: Grid<f64>,
    pub activation_map: Grid<f64>,
    pub error_map: Grid<f64>,
    /// Dropout mask for the current training pass, `None` outside training.
    pub dropout_map: Option<Grid<bool>>,
    pub state: ParamState,
}

/// Convolutional layer.
#[derive(Debug, Clone)]
pub struct ConvLayer {
    pub filters: Vec<Filter>,
    filter_count: usize,
    requested_channels: Option<usize>,
    channels: usize,
    filter_size: usize,
    stride: usize,
    zero_padding: usize,
    in_map_size: usize,
    out_map_size: usize,
    requested: LayerActivation,
    activation: Option<Activation>,
    snapshot: Option<Vec<(Volume<f64>, f64)>>,
}

impl ConvLayer {
    /// `channels` is only consulted when the predecessor is dense; a
    /// convolutional predecessor fixes the channel count itself.
    pub fn new(
        filters: usize,
        filter_size: usize,
        stride: usize,
        zero_padding: usize,
        channels: Option<usize>,
        activation: LayerActivation,
    ) -> Self {
        Self {
            filters: Vec::new(),
            filter_count: filters,
            requested_channels: channels,
            channels: 0,
            filter_size,
            stride,
            zero_padding,
            in_map_size: 0,
            out_map_size: 0,
            requested: activation,
            activation: None,
            snapshot: None,
        }
    }

    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    /// Channel count requested at construction time, if any.
    pub fn requested_channels(&self) -> Option<usize> {
        self.requested_channels
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn zero_padding(&self) -> usize {
        self.zero_padding
    }

    pub fn in_map_size(&self) -> usize {
        self.in_map_size
    }

    pub fn out_map_size(&self) -> usize {
        self.out_map_size
    }

    /// Total scalar outputs, `filters * out_map_size^2`.
    pub fn out_len(&self) -> usize {
        self.filter_count * self.out_map_size * self.out_map_size
    }

    /// Resolved activation, `None` meaning pass-through.
    pub fn activation(&self) -> Option<Activation> {
        self.activation
    }

    /// Fix the input geometry and build the filters. The caller has already
    /// validated that the stride divides the padded input evenly.
    pub fn init(
        &mut self,
        channels: usize,
        in_map_size: usize,
        default_activation: Activation,
        weight_init: WeightInit,
        rule: UpdateRule,
        rng: &mut SimpleRng,
    ) {
        self.channels = channels;
        self.in_map_size = in_map_size;
        self.out_map_size =
            (in_map_size + 2 * self.zero_padding - self.filter_size) / self.stride + 1;
        self.activation = self.requested.resolve(default_activation);

        let fs = self.filter_size;
        let weight_count = channels * fs * fs;
        let fan_in = weight_count;
        let fan_out = self.filter_count * fs * fs;

        self.filters = (0..self.filter_count)
            .map(|_| {
                let mut weights = Volume::new(channels, fs);
                for c in 0..channels {
                    for y in 0..fs {
                        for x in 0..fs {
                            *weights.at_mut(c, y, x) = weight_init.sample(fan_in, fan_out, rng);
                        }
                    }
                }

                Filter {
                    weights,
                    delta_weights: Volume::new(channels, fs),
                    bias: 1.0,
                    delta_bias: 0.0,
                    sum_map: Grid::new(self.out_map_size),
                    activation_map: Grid::new(self.out_map_size),
                    error_map: Grid::new(self.out_map_size),
                    dropout_map: None,
                    state: ParamState::for_rule(rule, weight_count),
                }
            })
            .collect();
    }

    /// Forward pass over the input volume. Dropout works per output cell
    /// with a fresh mask each training pass.
    pub fn forward(&mut self, input: &Volume<f64>, training: bool, dropout: f64, rng: &mut SimpleRng) {
        let out = self.out_map_size;
        let activation = self.activation;
        let scale = if training { dropout } else { 1.0 };

        for filter in &mut self.filters {
            filter.dropout_map = if training && dropout < 1.0 {
                let mut mask = Grid::new(out);
                for y in 0..out {
                    for x in 0..out {
                        *mask.at_mut(y, x) = rng.next_f64() > dropout;
                    }
                }
                Some(mask)
            } else {
                None
            };

            filter.sum_map = convolve(
                input,
                self.zero_padding,
                &filter.weights,
                self.stride,
                filter.bias,
            );

            for y in 0..out {
                for x in 0..out {
                    let dropped = filter
                        .dropout_map
                        .as_ref()
                        .map_or(false, |m| m.at(y, x));
                    *filter.activation_map.at_mut(y, x) = if dropped {
                        0.0
                    } else {
                        match activation {
                            Some(act) => act.apply(filter.sum_map.at(y, x), false) / scale,
                            None => filter.sum_map.at(y, x),
                        }
                    };
                }
            }
        }
    }

    /// Load error maps from a dense successor's weighted error sums, laid
    /// out filter-major.
    pub fn assign_errors_flat(&mut self, sums: &[f64]) {
        let out = self.out_map_size;
        assert_eq!(sums.len(), self.out_len(), "error length mismatch");

        for (f, filter) in self.filters.iter_mut().enumerate() {
            for y in 0..out {
                for x in 0..out {
                    *filter.error_map.at_mut(y, x) = sums[f * out * out + y * out + x];
                }
            }
        }
    }

    /// Load error maps from a convolutional successor's input-error volume,
    /// one channel per filter.
    pub fn assign_errors_volume(&mut self, errors: &Volume<f64>) {
        let out = self.out_map_size;
        assert_eq!(errors.channels(), self.filters.len(), "channel mismatch");
        assert_eq!(errors.size(), out, "error map size mismatch");

        for (f, filter) in self.filters.iter_mut().enumerate() {
            for y in 0..out {
                for x in 0..out {
                    *filter.error_map.at_mut(y, x) = errors.at(f, y, x);
                }
            }
        }
    }

    /// Backward pass: scale the assigned errors by the activation derivative,
    /// silence dropped cells, and accumulate weight and bias gradients from
    /// the input that produced this pass.
    pub fn backward(&mut self, input: &Volume<f64>) {
        let out = self.out_map_size;
        let activation = self.activation;

        for filter in &mut self.filters {
            for y in 0..out {
                for x in 0..out {
                    let dropped = filter
                        .dropout_map
                        .as_ref()
                        .map_or(false, |m| m.at(y, x));
                    if dropped {
                        *filter.error_map.at_mut(y, x) = 0.0;
                        continue;
                    }
                    if let Some(act) = activation {
                        *filter.error_map.at_mut(y, x) *=
                            act.apply(filter.sum_map.at(y, x), true);
                    }
                }
            }

            accumulate_filter_gradients(
                input,
                &filter.error_map,
                self.zero_padding,
                self.stride,
                &mut filter.delta_weights,
                &mut filter.delta_bias,
            );
        }
    }

    /// Route this layer's errors back to its input volume.
    pub fn input_error_volume(&self) -> Volume<f64> {
        let errors: Vec<&Grid<f64>> = self.filters.iter().map(|f| &f.error_map).collect();
        let weights: Vec<&Volume<f64>> = self.filters.iter().map(|f| &f.weights).collect();
        transposed_convolve(
            &errors,
            &weights,
            self.stride,
            self.zero_padding,
            self.in_map_size,
        )
    }

    /// Flat activations, filter-major.
    pub fn activations(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.out_len());
        for filter in &self.filters {
            flat.extend_from_slice(filter.activation_map.data());
        }
        flat
    }

    /// Activations shaped as a volume for a convolutional successor.
    pub fn activation_volume(&self) -> Volume<f64> {
        Volume::from_flat(&self.activations(), self.filters.len(), self.out_map_size)
    }

    pub fn reset_deltas(&mut self) {
        for filter in &mut self.filters {
            filter.delta_weights.clear();
            filter.delta_bias = 0.0;
        }
    }

    /// Apply the accumulated deltas through `update`. Weight slots are flat
    /// indices into the filter's weight volume.
    pub fn apply_with<F>(&mut self, mut update: F, reg: &RegParams, totals: &mut Totals)
    where
        F: FnMut(f64, f64, &mut ParamState, Option<usize>) -> f64,
    {
        let fs = self.filter_size;

        for filter in &mut self.filters {
            for c in 0..self.channels {
                for y in 0..fs {
                    for x in 0..fs {
                        let slot = (c * fs + y) * fs + x;
                        let w = filter.weights.at(c, y, x);
                        let gradient =
                            regularize(filter.delta_weights.at(c, y, x), w, reg, totals);
                        let new = update(w, gradient, &mut filter.state, Some(slot));
                        totals.weight_sq += new * new;
                        *filter.weights.at_mut(c, y, x) = new;
                    }
                }
            }
            filter.bias = update(filter.bias, filter.delta_bias, &mut filter.state, None);
        }
    }

    pub fn scale_weights(&mut self, factor: f64) {
        let fs = self.filter_size;
        for filter in &mut self.filters {
            for c in 0..self.channels {
                for y in 0..fs {
                    for x in 0..fs {
                        *filter.weights.at_mut(c, y, x) *= factor;
                    }
                }
            }
        }
    }

    pub fn backup(&mut self) {
        self.snapshot = Some(
            self.filters
                .iter()
                .map(|f| (f.weights.clone(), f.bias))
                .collect(),
        );
    }

    pub fn restore(&mut self) {
        if let Some(saved) = &self.snapshot {
            for (filter, (weights, bias)) in self.filters.iter_mut().zip(saved.iter()) {
                filter.weights = weights.clone();
                filter.bias = *bias;
            }
        }
    }
}
