//! End-to-end training and the network pool.

use gradnet::{
    mean_squared_error, DenseLayer, Hyperparameters, Layer, LayerActivation, Network, NetworkPool,
    UpdateRule,
};

fn dense(size: usize) -> Layer {
    Layer::Dense(DenseLayer::new(size, LayerActivation::Inherit))
}

const XOR: [([f64; 2], [f64; 1]); 4] = [
    ([0.0, 0.0], [0.0]),
    ([0.0, 1.0], [1.0]),
    ([1.0, 0.0], [1.0]),
    ([1.0, 1.0], [0.0]),
];

fn xor_mse(net: &mut Network) -> f64 {
    let mut total = 0.0;
    for (input, target) in &XOR {
        let out = net.forward(input).unwrap();
        total += mean_squared_error(target, &out);
    }
    total / XOR.len() as f64
}

#[test]
fn test_learns_xor() {
    let mut hp = Hyperparameters::default();
    hp.update_rule = UpdateRule::Adam;
    hp.learning_rate = 0.05;

    let mut net = Network::new(hp, Some(42));
    net.add_layer(dense(2));
    net.add_layer(dense(5));
    net.add_layer(dense(1));
    net.join_layers().unwrap();

    let before = xor_mse(&mut net);

    net.set_training(true);
    for _ in 0..2000 {
        for (input, target) in &XOR {
            net.forward(input).unwrap();
            net.backward(target).unwrap();
            net.apply_delta_weights().unwrap();
            net.reset_delta_weights();
        }
    }
    net.set_training(false);

    let after = xor_mse(&mut net);
    assert!(
        after < before / 2.0,
        "mean squared error went from {} to {}",
        before,
        after
    );
}

#[test]
fn test_mini_batch_accumulation_equals_summed_deltas() {
    // Two samples accumulated into one batch produce the deltas of both
    // samples added together.
    let build = || {
        let mut net = Network::new(Hyperparameters::default(), Some(5));
        net.add_layer(dense(2));
        net.add_layer(dense(1));
        net.join_layers().unwrap();
        net
    };

    let samples = [([0.1, 0.9], [1.0]), ([0.8, 0.2], [0.0])];

    let mut batched = build();
    for (input, target) in &samples {
        batched.forward(input).unwrap();
        batched.backward(target).unwrap();
    }

    let mut summed = vec![0.0; 2];
    for (input, target) in &samples {
        let mut single = build();
        single.forward(input).unwrap();
        single.backward(target).unwrap();
        if let Layer::Dense(l) = &single.layers()[1] {
            for (s, dw) in summed.iter_mut().zip(l.neurons[0].delta_weights.iter()) {
                *s += dw;
            }
        }
    }

    if let Layer::Dense(l) = &batched.layers()[1] {
        for (dw, expected) in l.neurons[0].delta_weights.iter().zip(summed.iter()) {
            assert!((dw - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn test_validation_snapshot_survives_overfitting() {
    let mut net = Network::new(Hyperparameters::default(), Some(21));
    net.add_layer(dense(2));
    net.add_layer(dense(4));
    net.add_layer(dense(1));
    net.join_layers().unwrap();

    let probe = [0.4, 0.6];
    let reference = net.forward(&probe).unwrap();
    net.backup_validation();

    net.set_training(true);
    for _ in 0..25 {
        net.forward(&probe).unwrap();
        net.backward(&[1.0]).unwrap();
        net.apply_delta_weights().unwrap();
        net.reset_delta_weights();
    }
    net.set_training(false);

    net.restore_validation();
    assert_eq!(net.forward(&probe).unwrap(), reference);
}

#[test]
fn test_pool_manages_independent_networks() {
    let mut pool = NetworkPool::new();

    let build = |seed| {
        let mut net = Network::new(Hyperparameters::default(), Some(seed));
        net.add_layer(dense(2));
        net.add_layer(dense(3));
        net.add_layer(dense(1));
        net.join_layers().unwrap();
        net
    };

    let a = pool.insert(build(1));
    let b = pool.insert(build(2));

    let out_a = pool.get_mut(a).unwrap().forward(&[0.5, 0.5]).unwrap();
    let out_b = pool.get_mut(b).unwrap().forward(&[0.5, 0.5]).unwrap();
    assert_ne!(out_a, out_b);

    // Training one network leaves the other untouched.
    {
        let net = pool.get_mut(a).unwrap();
        net.set_training(true);
        for _ in 0..20 {
            net.forward(&[0.5, 0.5]).unwrap();
            net.backward(&[1.0]).unwrap();
            net.apply_delta_weights().unwrap();
            net.reset_delta_weights();
        }
        net.set_training(false);
    }
    assert_eq!(
        pool.get_mut(b).unwrap().forward(&[0.5, 0.5]).unwrap(),
        out_b
    );

    pool.remove(a).unwrap();
    assert!(pool.get(a).is_err());
    assert!(pool.get(b).is_ok());
}

#[test]
fn test_optimizer_state_fresh_per_network() {
    // Two networks trained identically stay identical: no shared state.
    let mut hp = Hyperparameters::default();
    hp.update_rule = UpdateRule::Adam;

    let build = || {
        let mut net = Network::new(hp, Some(9));
        net.add_layer(dense(2));
        net.add_layer(dense(3));
        net.add_layer(dense(1));
        net.join_layers().unwrap();
        net
    };

    let mut a = build();
    // Train an unrelated network first; it must not leak into `b`.
    a.set_training(true);
    for _ in 0..10 {
        a.forward(&[0.1, 0.2]).unwrap();
        a.backward(&[0.7]).unwrap();
        a.apply_delta_weights().unwrap();
        a.reset_delta_weights();
    }

    let mut b = build();
    let mut c = build();
    for net in [&mut b, &mut c] {
        net.set_training(true);
        net.forward(&[0.3, 0.4]).unwrap();
        net.backward(&[0.6]).unwrap();
        net.apply_delta_weights().unwrap();
    }

    assert_eq!(
        b.forward(&[0.3, 0.4]).unwrap(),
        c.forward(&[0.3, 0.4]).unwrap()
    );
    assert_eq!(b.iterations(), 1);
}
