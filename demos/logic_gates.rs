use std::sync::mpsc;
use std::thread;

use gatenet::{
    evaluate_mse, train_loop, ActivationFunction, GradientDescent, LogicGate, NetworkSpec, TrainConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> gatenet::Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let spec = NetworkSpec::new(vec![2, 5, 1], ActivationFunction::LeakyReLU, ActivationFunction::Sigmoid);

    for gate in LogicGate::ALL {
        let table = gate.table();
        let mut network = spec.build_randomized(&mut rng, -1.0, 1.0)?;

        let (tx, rx) = mpsc::channel();
        let config = TrainConfig::new(0.5, 3000, GradientDescent::Stochastic).with_progress(tx);

        let printer = thread::spawn(move || {
            for stats in rx {
                if stats.epoch % 500 == 0 || stats.epoch == 1 {
                    println!("  epoch {:>5}: loss = {:.6}", stats.epoch, stats.loss);
                }
            }
        });

        println!("{gate}");
        train_loop(&mut network, table.x(), table.y(), &config, &mut rng)?;
        drop(config);
        printer.join().expect("progress printer panicked");

        for s in 0..table.len() {
            let x = table.x().row_view(s)?;
            let out = network.predict(x)?;
            println!("  {} {} {} -> {:.4}", x.get(0, 0), gate, x.get(0, 1), out[0]);
        }
        println!("  mse = {:.6}", evaluate_mse(&mut network, table.x(), table.y())?);
    }

    Ok(())
}
