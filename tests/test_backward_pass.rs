//! Backward-pass semantics: error signals and gradient accumulation.

use approx::assert_relative_eq;
use gradnet::{DenseLayer, Hyperparameters, Layer, LayerActivation, Network};

fn dense(size: usize, activation: LayerActivation) -> Layer {
    Layer::Dense(DenseLayer::new(size, activation))
}

/// 2 -> 3 linear network with weights [1, 2] and biases 0, 1, 2 per output
/// neuron, so input [1, 2] produces [5, 6, 7].
fn linear_network() -> Network {
    let mut net = Network::new(Hyperparameters::default(), Some(42));
    net.add_layer(dense(2, LayerActivation::Inherit));
    net.add_layer(dense(3, LayerActivation::Linear));
    net.join_layers().unwrap();

    if let Layer::Dense(layer) = &mut net.layers_mut()[1] {
        for (i, neuron) in layer.neurons.iter_mut().enumerate() {
            neuron.weights = vec![1.0, 2.0];
            neuron.bias = i as f64;
        }
    }
    net
}

fn output_errors(net: &Network) -> Vec<f64> {
    match net.layers().last().unwrap() {
        Layer::Dense(l) => l.neurons.iter().map(|n| n.error).collect(),
        _ => unreachable!(),
    }
}

#[test]
fn test_output_error_is_expected_minus_activation() {
    let mut net = linear_network();
    net.forward(&[1.0, 2.0]).unwrap();
    net.backward(&[6.0, 7.0, 10.0]).unwrap();

    assert_eq!(output_errors(&net), vec![1.0, 1.0, 3.0]);
}

#[test]
fn test_gradients_scale_with_input_activation() {
    let mut net = linear_network();
    net.forward(&[1.0, 2.0]).unwrap();
    net.backward(&[6.0, 7.0, 10.0]).unwrap();

    if let Layer::Dense(layer) = &net.layers()[1] {
        assert_eq!(layer.neurons[2].delta_bias, 3.0);
        assert_eq!(layer.neurons[2].delta_weights, vec![3.0, 6.0]);
    }
}

#[test]
fn test_hidden_error_weighted_through_derivative() {
    // 1 -> 1 -> 1 chain with unit weights and zero biases: the hidden
    // neuron's sum is the input, and its error is
    // sigmoid'(sum) * output_error * weight.
    let mut net = Network::new(Hyperparameters::default(), Some(1));
    net.add_layer(dense(1, LayerActivation::Inherit));
    net.add_layer(dense(1, LayerActivation::Inherit));
    net.add_layer(dense(1, LayerActivation::Linear));
    net.join_layers().unwrap();

    for layer in net.layers_mut().iter_mut().skip(1) {
        if let Layer::Dense(l) = layer {
            l.neurons[0].weights = vec![1.0];
            l.neurons[0].bias = 0.0;
        }
    }

    let out = net.forward(&[0.5]).unwrap();
    // Output is linear, so it equals sigmoid(0.5).
    let sigmoid_half = 1.0 / (1.0 + (-0.5f64).exp());
    assert_relative_eq!(out[0], sigmoid_half, epsilon = 1e-12);

    // Target 2 above the output makes the output error exactly 2.
    net.backward(&[out[0] + 2.0]).unwrap();

    if let Layer::Dense(hidden) = &net.layers()[1] {
        assert_relative_eq!(hidden.neurons[0].error, 0.470007424403189, epsilon = 1e-12);
    }
}

#[test]
fn test_backward_leaves_weights_untouched() {
    let mut net = linear_network();
    net.forward(&[1.0, 2.0]).unwrap();
    net.backward(&[6.0, 7.0, 10.0]).unwrap();

    if let Layer::Dense(layer) = &net.layers()[1] {
        assert_eq!(layer.neurons[0].weights, vec![1.0, 2.0]);
        assert_eq!(layer.neurons[0].bias, 0.0);
    }
}

#[test]
fn test_deltas_accumulate_over_mini_batch() {
    let mut net = linear_network();
    for _ in 0..3 {
        net.forward(&[1.0, 2.0]).unwrap();
        net.backward(&[6.0, 7.0, 10.0]).unwrap();
    }

    if let Layer::Dense(layer) = &net.layers()[1] {
        assert_eq!(layer.neurons[2].delta_bias, 9.0);
        assert_eq!(layer.neurons[2].delta_weights, vec![9.0, 18.0]);
    }

    net.reset_delta_weights();
    if let Layer::Dense(layer) = &net.layers()[1] {
        assert_eq!(layer.neurons[2].delta_bias, 0.0);
        assert_eq!(layer.neurons[2].delta_weights, vec![0.0, 0.0]);
    }
}

#[test]
fn test_apply_after_reset_changes_nothing() {
    let mut net = linear_network();
    net.reset_delta_weights();
    net.apply_delta_weights().unwrap();

    if let Layer::Dense(layer) = &net.layers()[1] {
        for (i, neuron) in layer.neurons.iter().enumerate() {
            assert_eq!(neuron.weights, vec![1.0, 2.0]);
            assert_eq!(neuron.bias, i as f64);
        }
    }
}

#[test]
fn test_mini_batch_division_on_apply() {
    let mut net = linear_network();
    net.hp.learning_rate = 1.0;
    net.hp.mini_batch_size = 2;

    for _ in 0..2 {
        net.forward(&[1.0, 2.0]).unwrap();
        net.backward(&[6.0, 7.0, 10.0]).unwrap();
    }
    net.apply_delta_weights().unwrap();

    // Accumulated weight delta 2.0 averaged over the batch gives a step of
    // exactly one error unit; the bias applies its raw accumulated delta.
    if let Layer::Dense(layer) = &net.layers()[1] {
        assert_eq!(layer.neurons[0].weights, vec![2.0, 4.0]);
        assert_eq!(layer.neurons[0].bias, 2.0);
    }
}
