//! Ask-tell loop: propose a batch, evaluate it elsewhere, report back.
//!
//! The experiment never runs your code. `ask()` hands out parameterizations,
//! you evaluate them however you like (workers, GPUs, external processes),
//! then `tell()` the metrics.
//!
//! Run with: `cargo run --example ask_tell`

use asktell::data::raw_data;
use asktell::prelude::*;

/// Stand-in for an expensive training run.
fn train(lr: f64, layers: i64, optimizer: &str) -> (f64, f64) {
    let penalty = if optimizer == "adam" { 0.0 } else { 0.15 };
    let loss = (lr.log10() + 2.5).powi(2) * 0.2 + (layers as f64 - 4.0).abs() * 0.05 + penalty;
    let seconds = 10.0 * layers as f64;
    (loss, seconds)
}

fn main() -> asktell::Result<()> {
    let experiment = Experiment::builder().seed(42).build();
    experiment.configure(
        vec![
            Parameter::float("lr", 1e-5, 1e-1).log_scale(),
            Parameter::int("layers", 1, 8),
            Parameter::choice("optimizer", ["adam", "sgd"]),
        ],
        OptimizationConfig::parse("-loss", &["seconds <= 70"])?,
    )?;

    for round in 0..6 {
        let batch = experiment.ask(4)?;
        for (index, params) in &batch {
            let lr = params["lr"].as_f64().unwrap_or(1e-3);
            let layers = params["layers"].as_i64().unwrap_or(1);
            let optimizer = params["optimizer"].as_str().unwrap_or("adam");
            let (loss, seconds) = train(lr, layers, optimizer);
            experiment.tell(*index, raw_data([("loss", loss), ("seconds", seconds)]))?;
        }
        println!(
            "Round {}: {} trials in the ledger",
            round + 1,
            experiment.n_trials()
        );
    }

    let best = experiment.best()?;
    println!("Best trial #{}: loss = {:.4}", best.trial_index, best.value);
    for (name, value) in &best.parameterization {
        println!("  {name} = {value}");
    }
    if let Some(prediction) = best.prediction {
        println!(
            "  model predicts {:.4} ± {:.4}",
            prediction.mean,
            prediction.variance.sqrt()
        );
    }

    Ok(())
}
