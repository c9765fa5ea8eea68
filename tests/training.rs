use gatenet::{
    evaluate_mse, train_loop, ActivationFunction, GradientDescent, LogicGate, Network, NetworkSpec,
    TrainConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn network(dims: &[usize], seed: u64) -> Network {
    NetworkSpec::new(dims.to_vec(), ActivationFunction::Sigmoid, ActivationFunction::Sigmoid)
        .build_randomized(&mut StdRng::seed_from_u64(seed), -1.0, 1.0)
        .unwrap()
}

fn train(net: &mut Network, gate: LogicGate, config: &TrainConfig, seed: u64) -> f64 {
    let table = gate.table();
    train_loop(net, table.x(), table.y(), config, &mut StdRng::seed_from_u64(seed)).unwrap();
    evaluate_mse(net, table.x(), table.y()).unwrap()
}

#[test]
fn linearly_separable_gates_converge_with_sgd() {
    let config = TrainConfig::new(1.0, 2000, GradientDescent::Stochastic);
    for gate in [LogicGate::And, LogicGate::Or, LogicGate::Nand] {
        let mut hidden = network(&[2, 2, 1], 7);
        let mse = train(&mut hidden, gate, &config, 1);
        assert!(mse < 0.05, "{gate} with a hidden layer stayed at {mse}");

        let mut single = network(&[2, 1], 7);
        let mse = train(&mut single, gate, &config, 1);
        assert!(mse < 0.05, "{gate} without a hidden layer stayed at {mse}");
    }
}

#[test]
fn xor_needs_a_hidden_layer() {
    let config = TrainConfig::new(1.0, 2000, GradientDescent::Stochastic);
    let mut single = network(&[2, 1], 3);
    let mse = train(&mut single, LogicGate::Xor, &config, 3);
    assert!(mse > 0.2, "a single unit should not fit XOR, got {mse}");

    let config = TrainConfig::new(1.0, 5000, GradientDescent::Stochastic);
    let best = (0..3)
        .map(|seed| {
            let mut hidden = network(&[2, 4, 1], seed);
            train(&mut hidden, LogicGate::Xor, &config, seed)
        })
        .fold(f64::INFINITY, f64::min);
    assert!(best < 0.05, "XOR with a hidden layer stayed at {best}");
}

#[test]
fn xor_converges_with_leaky_relu_hidden_layer() {
    let config = TrainConfig::new(0.5, 3000, GradientDescent::Stochastic);
    let best = (0..3)
        .map(|seed| {
            let mut net = NetworkSpec::new(vec![2, 5, 1], ActivationFunction::LeakyReLU, ActivationFunction::Sigmoid)
                .build_randomized(&mut StdRng::seed_from_u64(seed), -1.0, 1.0)
                .unwrap();
            train(&mut net, LogicGate::Xor, &config, seed)
        })
        .fold(f64::INFINITY, f64::min);
    assert!(best < 0.05, "XOR with leaky ReLU stayed at {best}");
}

#[test]
fn mini_batch_and_full_batch_reduce_loss() {
    let table = LogicGate::Or.table();
    for config in [
        TrainConfig::new(1.0, 3000, GradientDescent::MiniBatch).with_batch_size(2),
        TrainConfig::new(2.0, 3000, GradientDescent::FullBatch),
    ] {
        let mut net = network(&[2, 2, 1], 4);
        let start = evaluate_mse(&mut net, table.x(), table.y()).unwrap();
        let mse = train(&mut net, LogicGate::Or, &config, 4);
        assert!(mse < start);
        assert!(mse < 0.05, "{:?} stayed at {mse}", config.mode);
    }
}

#[test]
fn mini_batch_of_one_follows_the_sgd_trajectory() {
    let sgd = TrainConfig::new(0.8, 50, GradientDescent::Stochastic);
    let mini = TrainConfig::new(0.8, 50, GradientDescent::MiniBatch).with_batch_size(1);

    let mut a = network(&[2, 3, 1], 12);
    let mut b = a.clone();
    train(&mut a, LogicGate::Xor, &sgd, 99);
    train(&mut b, LogicGate::Xor, &mini, 99);

    assert_eq!(a.params(), b.params());
}

#[test]
fn full_batch_equals_one_averaged_backprop_step() {
    use gatenet::{Gradients, Sgd};

    let table = LogicGate::Nand.table();
    let mut trained = network(&[2, 2, 1], 5);
    let mut manual = trained.clone();

    let config = TrainConfig::new(0.5, 1, GradientDescent::FullBatch);
    train_loop(&mut trained, table.x(), table.y(), &config, &mut StdRng::seed_from_u64(0)).unwrap();

    let grads = Gradients::backprop(&mut manual, table.x(), table.y()).unwrap();
    let optimizer = Sgd::new(0.5).unwrap();
    for (layer, (w, b)) in manual.layers_mut().iter_mut().zip(grads.weights.iter().zip(&grads.biases)) {
        layer.weight_grads.copy_from(w).unwrap();
        layer.bias_grads.copy_from(b).unwrap();
        optimizer.step(layer, 1).unwrap();
    }

    for (x, y) in trained.params().weights.iter().flatten().flatten().zip(manual.params().weights.iter().flatten().flatten()) {
        assert!((x - y).abs() < 1e-12);
    }
    for (x, y) in trained.params().biases.iter().flatten().zip(manual.params().biases.iter().flatten()) {
        assert!((x - y).abs() < 1e-12);
    }
}

#[test]
fn invalid_configuration_is_rejected() {
    let table = LogicGate::And.table();
    let mut net = network(&[2, 2, 1], 0);
    let mut rng = StdRng::seed_from_u64(0);
    let bad = [
        TrainConfig::new(0.0, 10, GradientDescent::Stochastic),
        TrainConfig::new(0.1, 0, GradientDescent::Stochastic),
        TrainConfig::new(0.1, 10, GradientDescent::MiniBatch).with_batch_size(0),
    ];
    for config in &bad {
        assert!(train_loop(&mut net, table.x(), table.y(), config, &mut rng).is_err());
    }
}

#[test]
fn configs_deserialize_from_json() {
    let spec: NetworkSpec = serde_json::from_str(
        r#"{ "layers": [2, 5, 1], "hidden_activation": "leaky_relu", "output_activation": "sigmoid" }"#,
    )
    .unwrap();
    assert_eq!(spec.build().unwrap().dims(), vec![2, 5, 1]);

    let config: TrainConfig =
        serde_json::from_str(r#"{ "learning_rate": 1.0, "epochs": 200, "mode": "mini_batch", "batch_size": 2 }"#)
            .unwrap();
    assert_eq!(config.mode, GradientDescent::MiniBatch);
    assert_eq!(config.effective_batch_size(4), 2);
    assert!(config.progress_tx.is_none());

    let unknown = serde_json::from_str::<NetworkSpec>(
        r#"{ "layers": [2, 1], "hidden_activation": "tanh", "output_activation": "sigmoid" }"#,
    );
    assert!(unknown.is_err());
}

#[test]
fn params_serialize_in_persisted_layout() {
    let net = network(&[2, 2, 1], 3);
    let json = serde_json::to_value(net.params()).unwrap();
    assert_eq!(json["dims"], serde_json::json!([2, 2, 1]));
    assert_eq!(json["biases"].as_array().unwrap().len(), 2);
    assert_eq!(json["weights"][0].as_array().unwrap().len(), 2);

    let restored: gatenet::NetworkParams = serde_json::from_value(json).unwrap();
    assert_eq!(restored.to_network().unwrap().params(), net.params());
}
