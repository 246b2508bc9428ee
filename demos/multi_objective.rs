//! Multi-objective optimization: trade accuracy against latency.
//!
//! With two or more objectives there is no single best trial. The
//! experiment returns the Pareto frontier instead: every trial that no
//! other trial beats on all objectives at once.
//!
//! Run with: `cargo run --example multi_objective`

use asktell::analysis;
use asktell::data::raw_data;
use asktell::prelude::*;

/// A model that gets more accurate, and slower, as it grows.
fn evaluate(width: i64, depth: i64) -> (f64, f64) {
    let size = (width * depth) as f64;
    let accuracy = 1.0 - 0.5 / (1.0 + size / 64.0);
    let latency = 2.0 + size * 0.1;
    (accuracy, latency)
}

fn main() -> asktell::Result<()> {
    let experiment = Experiment::builder().seed(3).build();
    experiment.configure(
        vec![
            Parameter::int("width", 8, 256).log_scale(),
            Parameter::int("depth", 1, 12),
        ],
        OptimizationConfig::parse("accuracy, -latency", &["latency <= 200"])?,
    )?;

    for _ in 0..8 {
        for (index, params) in experiment.ask(3)? {
            let width = params["width"].as_i64().unwrap_or(8);
            let depth = params["depth"].as_i64().unwrap_or(1);
            let (accuracy, latency) = evaluate(width, depth);
            experiment.tell(index, raw_data([("accuracy", accuracy), ("latency", latency)]))?;
        }
    }

    println!("Pareto frontier:");
    for point in experiment.pareto_frontier()? {
        println!(
            "  #{:>2}  width = {:>3}  depth = {:>2}  accuracy = {:.4}  latency = {:.1}",
            point.trial_index,
            point.parameterization["width"],
            point.parameterization["depth"],
            point.metrics["accuracy"].mean,
            point.metrics["latency"].mean,
        );
    }

    println!();
    print!("{}", analysis::summarize(&experiment.snapshot()?));

    Ok(())
}
