use asktell::analysis::{self, Summary};
use asktell::data::raw_data;
use asktell::prelude::*;

use super::{at_x, unit_experiment};

#[test]
fn summary_counts_statuses_sources_and_best_trace() {
    let experiment = unit_experiment();
    let batch = experiment.ask(3).unwrap();
    let mut indices = batch.keys().copied();
    experiment
        .tell(indices.next().unwrap(), raw_data([("loss", 0.7)]))
        .unwrap();
    experiment
        .mark_failed(indices.next().unwrap(), "timeout")
        .unwrap();
    experiment
        .tell(indices.next().unwrap(), raw_data([("loss", 0.9)]))
        .unwrap();
    experiment
        .attach_completed(at_x(0.5), raw_data([("loss", 0.2)]))
        .unwrap();

    let summary: Summary = analysis::summarize(&experiment.snapshot().unwrap());
    assert_eq!(summary.n_trials, 4);
    assert_eq!(summary.n_eligible, 3);
    assert_eq!(summary.by_status[&TrialStatus::Completed], 3);
    assert_eq!(summary.by_status[&TrialStatus::Failed], 1);
    assert_eq!(summary.by_source["random"], 3);
    assert_eq!(summary.by_source["attached"], 1);
    assert_eq!(summary.best_trace, vec![(0, 0.7), (2, 0.7), (3, 0.2)]);
    assert_eq!(summary.frontier, vec![3]);
    assert!(summary.hypervolume.is_none());

    let loss = summary.metrics["loss"];
    assert_eq!(loss.count, 3);
    assert!((loss.min - 0.2).abs() < f64::EPSILON);
    assert!((loss.max - 0.9).abs() < f64::EPSILON);

    let text = summary.to_string();
    assert!(text.contains("trials: 4 (3 eligible)"));
    assert!(text.contains("best: trial 3 = 0.2"));
}

#[test]
fn multi_objective_summary_reports_hypervolume() {
    let experiment = Experiment::builder()
        .generator(RandomGenerator::with_seed(1))
        .build();
    experiment
        .configure(
            vec![Parameter::float("x", 0.0, 1.0)],
            OptimizationConfig::parse("score, -time", &[]).unwrap(),
        )
        .unwrap();
    for (x, score, time) in [(0.1, 1.0, 1.0), (0.2, 3.0, 3.0), (0.3, 2.0, 4.0)] {
        experiment
            .attach_completed(at_x(x), raw_data([("score", score), ("time", time)]))
            .unwrap();
    }

    let summary = analysis::summarize(&experiment.snapshot().unwrap());
    assert_eq!(summary.frontier, vec![0, 1]);
    assert!(summary.best_trace.is_empty());
    // Reference (1, -4): boxes of 0 x 3 and 2 x 1.
    let hv = summary.hypervolume.unwrap();
    assert!((hv - 2.0).abs() < 1e-12, "hypervolume = {hv}");
}

#[test]
fn csv_has_one_row_per_trial() {
    let experiment = unit_experiment();
    let index = *experiment.ask(1).unwrap().keys().next().unwrap();
    experiment
        .report_progress(index, raw_data([("loss", 2.0)]), 3.0)
        .unwrap();
    experiment
        .tell(index, raw_data([("loss", 1.0), ("gpu_hours", 0.5)]))
        .unwrap();
    experiment.ask(1).unwrap();

    let mut out = Vec::new();
    analysis::write_csv(&experiment.snapshot().unwrap(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "trial_index,status,source,last_progression,x,gpu_hours,loss"
    );
    assert!(lines[1].starts_with("0,COMPLETED,random,3,"));
    assert!(lines[1].ends_with(",0.5,1"));
    assert!(lines[2].starts_with("1,RUNNING,random,,"));
    assert!(lines[2].ends_with(",,"));
}
