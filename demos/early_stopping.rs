//! Early stopping: report learning curves and stop unpromising trials.
//!
//! Each trial reports its loss every epoch with `report_progress()`. After
//! each report the experiment is asked whether the trial is worth finishing;
//! the decision is advisory, so the loop calls `mark_early_stopped()` itself.
//!
//! Run with: `cargo run --example early_stopping`

use asktell::data::raw_data;
use asktell::prelude::*;

const EPOCHS: u32 = 20;

/// Loss after `epoch` epochs: decays toward a floor set by `lr`.
fn loss_at(lr: f64, epoch: u32) -> f64 {
    let floor = (lr.log10() + 2.0).abs() * 0.5 + 0.1;
    floor + 2.0 * (-0.3 * f64::from(epoch)).exp()
}

fn main() -> asktell::Result<()> {
    let experiment = Experiment::builder()
        .seed(7)
        .early_stopping(PercentileEarlyStopping::new(50.0).min_progression(3.0))
        .build();
    experiment.configure(
        vec![Parameter::float("lr", 1e-4, 1.0).log_scale()],
        OptimizationConfig::single(Objective::minimize("loss")),
    )?;

    let mut epochs_saved = 0;
    for _ in 0..12 {
        for (index, params) in experiment.ask(1)? {
            let lr = params["lr"].as_f64().unwrap_or(1e-2);
            let mut stopped = false;

            for epoch in 1..=EPOCHS {
                let loss = loss_at(lr, epoch);
                experiment.report_progress(index, raw_data([("loss", loss)]), f64::from(epoch))?;

                let decision = experiment.stop_decision(index)?;
                if decision.should_stop() {
                    println!("Trial #{index} (lr = {lr:.2e}) {decision}");
                    experiment.mark_early_stopped(index)?;
                    epochs_saved += EPOCHS - epoch;
                    stopped = true;
                    break;
                }
            }

            if !stopped {
                experiment.tell(index, raw_data([("loss", loss_at(lr, EPOCHS))]))?;
            }
        }
    }

    let counts = experiment.count_by_status();
    println!(
        "Completed: {}, early-stopped: {}, epochs saved: {epochs_saved}",
        counts.get(&TrialStatus::Completed).unwrap_or(&0),
        counts.get(&TrialStatus::EarlyStopped).unwrap_or(&0),
    );

    let best = experiment.best()?;
    println!("Best trial #{}: loss = {:.4}", best.trial_index, best.value);

    Ok(())
}
