use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use asktell::data::raw_data;
use asktell::prelude::*;

use super::at_x;

fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "asktell_{name}_{}_{n}.json",
        std::process::id()
    ))
}

fn sample() -> Experiment {
    let experiment = Experiment::builder().seed(2).build();
    experiment
        .configure_with_constraints(
            vec![
                Parameter::float("x", 0.0, 1.0),
                Parameter::choice("mode", ["fast", "slow"]).ordered(),
            ],
            vec!["x <= 0.75".parse().unwrap()],
            OptimizationConfig::parse("-loss", &["memory <= 512"]).unwrap(),
        )
        .unwrap();
    let mut params = at_x(0.5);
    params.insert("mode".to_owned(), ParamValue::from("slow"));
    let index = experiment.attach(params).unwrap();
    experiment
        .report_progress(index, raw_data([("loss", 2.5)]), 1.0)
        .unwrap();
    experiment
        .tell(index, raw_data([("loss", 1.25), ("memory", 256.0)]))
        .unwrap();

    let mut params = at_x(0.25);
    params.insert("mode".to_owned(), ParamValue::from("fast"));
    let index = experiment.attach(params).unwrap();
    experiment.mark_failed(index, "disk full").unwrap();
    experiment
}

#[test]
fn save_and_load_round_trip() {
    let path = temp_path("round_trip");
    let original = sample();
    original.save(&path).unwrap();

    let loaded = Experiment::load(&path).unwrap();
    assert_eq!(loaded.snapshot().unwrap(), original.snapshot().unwrap());
    assert_eq!(loaded.best().unwrap().trial_index, 0);
    assert_eq!(
        loaded.trial(1).unwrap().failure_reason(),
        Some("disk full")
    );

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn load_with_keeps_the_builders_components() {
    let path = temp_path("load_with");
    sample().save(&path).unwrap();

    let loaded = Experiment::load_with(
        &path,
        Experiment::builder()
            .generator(RandomGenerator::with_seed(5))
            .early_stopping(ThresholdEarlyStopping::new(1.0)),
    )
    .unwrap();
    let (&index, _) = loaded.ask(1).unwrap().iter().next().unwrap();
    assert_eq!(index, 2);
    loaded
        .report_progress(index, raw_data([("loss", 3.0)]), 1.0)
        .unwrap();
    assert!(loaded.should_stop_early(index).unwrap());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn missing_or_garbled_files_are_storage_errors() {
    let path = temp_path("missing");
    assert!(matches!(Experiment::load(&path), Err(Error::Storage(_))));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Experiment::load(&path), Err(Error::Storage(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn snapshot_serializes_to_json() {
    let snapshot = sample().snapshot().unwrap();
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: ExperimentSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn generated_trials_round_trip_exactly() {
    let path = temp_path("generated");
    let experiment = Experiment::builder()
        .generator(RandomGenerator::with_seed(17))
        .build();
    experiment
        .configure(
            vec![
                Parameter::float("lr", 1e-5, 1e-1).log_scale(),
                Parameter::float("dropout", 0.0, 0.7),
                Parameter::int("layers", 1, 12),
            ],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    for round in 0..50 {
        for (index, params) in experiment.ask(4).unwrap() {
            let lr = params["lr"].as_f64().unwrap();
            let dropout = params["dropout"].as_f64().unwrap();
            let progression = f64::from(round) / 3.0 + 0.1;
            let early = raw_data([("loss", lr.ln().abs() / 7.0)]);
            experiment.report_progress(index, early, progression).unwrap();
            let last = raw_data([("loss", (lr * dropout).sqrt() / 3.0), ("time", 1.0 / 9.0)]);
            experiment.tell(index, last).unwrap();
        }
    }
    experiment.save(&path).unwrap();

    let loaded = Experiment::load(&path).unwrap();
    let (before, after) = (experiment.snapshot().unwrap(), loaded.snapshot().unwrap());
    assert_eq!(after.trials.len(), 200);
    let differing = before
        .trials
        .iter()
        .zip(&after.trials)
        .filter(|(a, b)| a != b)
        .count();
    assert_eq!(differing, 0);
    assert_eq!(before, after);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn rejected_non_finite_reading_keeps_the_file_loadable() {
    let path = temp_path("non_finite");
    let experiment = sample();
    let (&index, _) = experiment.ask(1).unwrap().iter().next().unwrap();
    assert!(experiment.tell(index, raw_data([("loss", f64::NAN)])).is_err());
    experiment.mark_failed(index, "diverged").unwrap();
    experiment.save(&path).unwrap();

    let loaded = Experiment::load(&path).unwrap();
    assert_eq!(loaded.snapshot().unwrap(), experiment.snapshot().unwrap());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn failed_save_leaves_no_temporary_file() {
    let dir = temp_path("occupied");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("keep"), "x").unwrap();

    assert!(matches!(sample().save(&dir), Err(Error::Storage(_))));
    let tmp = dir.with_file_name(format!(
        ".{}.tmp",
        dir.file_name().unwrap().to_string_lossy()
    ));
    assert!(!tmp.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn inconsistent_trial_records_are_rejected_on_load() {
    let snapshot = sample().snapshot().unwrap();
    let mut json = serde_json::to_value(&snapshot).unwrap();
    json["trials"][0]["final_data"] = serde_json::Value::Null;
    let corrupted: ExperimentSnapshot = serde_json::from_value(json).unwrap();

    let experiment = Experiment::builder().build();
    assert!(matches!(
        experiment.restore(corrupted),
        Err(Error::Configuration { .. })
    ));

    let mut json = serde_json::to_value(&snapshot).unwrap();
    json["trials"][0]["observations"][0]["progression"] = serde_json::json!(-1.0);
    json["trials"][0]["observations"]
        .as_array_mut()
        .unwrap()
        .push(serde_json::json!({
            "progression": -2.0,
            "data": {},
            "timestamp": snapshot.trials[0].created_at(),
        }));
    let corrupted: ExperimentSnapshot = serde_json::from_value(json).unwrap();
    assert!(experiment.restore(corrupted).is_err());
    assert_eq!(experiment.n_trials(), 0);
}
