use asktell::data::raw_data;
use asktell::prelude::*;

use super::{at_x, unit_experiment};

fn populated() -> Experiment {
    let experiment = unit_experiment();
    let batch = experiment.ask(4).unwrap();
    let mut indices = batch.keys().copied();

    let done = indices.next().unwrap();
    experiment
        .report_progress(done, raw_data([("loss", 0.8)]), 1.0)
        .unwrap();
    experiment
        .tell(done, raw_data([("loss", 0.5), ("memory", 1024.0)]))
        .unwrap();

    let failed = indices.next().unwrap();
    experiment.mark_failed(failed, "node lost").unwrap();

    let stopped = indices.next().unwrap();
    experiment
        .report_progress(stopped, raw_data([("loss", 3.0)]), 1.0)
        .unwrap();
    experiment.mark_early_stopped(stopped).unwrap();

    experiment
        .attach_completed(at_x(0.25), raw_data([("loss", 0.0625)]))
        .unwrap();
    experiment
}

#[test]
fn restore_reproduces_an_equal_snapshot() {
    let original = populated();
    let snapshot = original.snapshot().unwrap();

    let restored = Experiment::builder()
        .generator(RandomGenerator::with_seed(7))
        .build();
    restored.restore(snapshot.clone()).unwrap();

    assert_eq!(restored.snapshot().unwrap(), snapshot);
    assert_eq!(restored.trials(), original.trials());
    assert_eq!(
        restored.best().unwrap().trial_index,
        original.best().unwrap().trial_index
    );
}

#[test]
fn restored_experiment_continues_numbering() {
    let original = populated();
    let restored = Experiment::new();
    restored.restore(original.snapshot().unwrap()).unwrap();

    let next = *restored.ask(1).unwrap().keys().next().unwrap();
    assert_eq!(next, original.n_trials() as u64);
}

#[test]
fn restore_replaces_existing_state() {
    let target = unit_experiment();
    target.ask(10).unwrap();

    let source = populated();
    target.restore(source.snapshot().unwrap()).unwrap();
    assert_eq!(target.n_trials(), source.n_trials());
}

#[test]
fn snapshot_with_unknown_version_is_rejected() {
    let mut snapshot = populated().snapshot().unwrap();
    snapshot.version += 1;
    let target = Experiment::new();
    assert!(matches!(
        target.restore(snapshot),
        Err(Error::Configuration { .. })
    ));
    assert!(target.search_space().is_none());
}

#[test]
fn snapshot_with_gaps_is_rejected() {
    let mut snapshot = populated().snapshot().unwrap();
    snapshot.trials.remove(1);
    assert!(matches!(
        Experiment::new().restore(snapshot),
        Err(Error::Configuration { .. })
    ));
}

#[test]
fn snapshot_with_trials_outside_the_space_is_rejected() {
    let experiment = unit_experiment();
    experiment.attach(at_x(0.9)).unwrap();
    let mut snapshot = experiment.snapshot().unwrap();
    snapshot.search_space =
        SearchSpace::new(vec![Parameter::float("x", 0.0, 0.5)], Vec::new()).unwrap();
    assert!(matches!(
        Experiment::new().restore(snapshot),
        Err(Error::Configuration { .. })
    ));
}
