use asktell::data::raw_data;
use asktell::prelude::*;

use super::{at_x, unit_experiment};

fn running(experiment: &Experiment) -> u64 {
    *experiment.ask(1).unwrap().keys().next().unwrap()
}

#[test]
fn terminal_trials_reject_further_transitions() {
    let experiment = unit_experiment();

    let completed = running(&experiment);
    experiment.tell(completed, raw_data([("loss", 1.0)])).unwrap();

    let failed = running(&experiment);
    experiment.mark_failed(failed, "out of memory").unwrap();

    let stopped = running(&experiment);
    experiment.mark_early_stopped(stopped).unwrap();

    for index in [completed, failed, stopped] {
        let err = experiment
            .tell(index, raw_data([("loss", 0.5)]))
            .unwrap_err();
        assert!(err.is_state_error(), "tell on {index}: {err}");
        assert!(
            experiment
                .report_progress(index, raw_data([("loss", 0.5)]), 1.0)
                .unwrap_err()
                .is_state_error()
        );
        assert!(
            experiment
                .mark_early_stopped(index)
                .unwrap_err()
                .is_state_error()
        );
        assert!(
            experiment
                .mark_failed(index, "again")
                .unwrap_err()
                .is_state_error()
        );
    }

    let counts = experiment.count_by_status();
    assert_eq!(counts[&TrialStatus::Completed], 1);
    assert_eq!(counts[&TrialStatus::Failed], 1);
    assert_eq!(counts[&TrialStatus::EarlyStopped], 1);
}

#[test]
fn decreasing_progression_is_rejected() {
    let experiment = unit_experiment();
    let index = running(&experiment);

    experiment
        .report_progress(index, raw_data([("loss", 3.0)]), 10.0)
        .unwrap();
    experiment
        .report_progress(index, raw_data([("loss", 2.0)]), 20.0)
        .unwrap();
    let err = experiment
        .report_progress(index, raw_data([("loss", 1.5)]), 15.0)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NonMonotonicProgression { index: i, .. } if i == index
    ));

    let trial = experiment.trial(index).unwrap();
    assert_eq!(trial.observations().len(), 2);
    assert_eq!(trial.last_progression(), Some(20.0));
}

#[test]
fn repeated_progression_is_accepted() {
    let experiment = unit_experiment();
    let index = running(&experiment);
    experiment
        .report_progress(index, raw_data([("loss", 3.0)]), 5.0)
        .unwrap();
    experiment
        .report_progress(index, raw_data([("loss", 2.9)]), 5.0)
        .unwrap();
    assert_eq!(experiment.trial(index).unwrap().observations().len(), 2);
}

#[test]
fn non_finite_progression_is_rejected() {
    let experiment = unit_experiment();
    let index = running(&experiment);
    assert!(matches!(
        experiment.report_progress(index, raw_data([("loss", 1.0)]), f64::NAN),
        Err(Error::Configuration { .. })
    ));
}

#[test]
fn non_finite_readings_are_rejected_without_changing_state() {
    let experiment = unit_experiment();
    let index = running(&experiment);

    assert!(matches!(
        experiment.tell(index, raw_data([("loss", f64::NAN)])),
        Err(Error::Domain { parameter, .. }) if parameter == "loss"
    ));
    assert!(matches!(
        experiment.report_progress(index, raw_data([("loss", f64::INFINITY)]), 1.0),
        Err(Error::Domain { .. })
    ));
    let trial = experiment.trial(index).unwrap();
    assert_eq!(trial.status(), TrialStatus::Running);
    assert!(trial.observations().is_empty());

    experiment.tell(index, raw_data([("loss", 0.4)])).unwrap();

    assert!(matches!(
        experiment.attach_completed(at_x(0.5), raw_data([("loss", (0.2, f64::NAN))])),
        Err(Error::Domain { .. })
    ));
    assert_eq!(experiment.n_trials(), 1);
}

#[test]
fn progress_is_kept_after_completion() {
    let experiment = unit_experiment();
    let index = running(&experiment);
    for (step, loss) in [(1.0, 0.9), (2.0, 0.7), (3.0, 0.6)] {
        experiment
            .report_progress(index, raw_data([("loss", loss)]), step)
            .unwrap();
    }
    experiment.tell(index, raw_data([("loss", 0.55)])).unwrap();

    let trial = experiment.trial(index).unwrap();
    assert_eq!(
        trial.curve("loss"),
        vec![(1.0, 0.9), (2.0, 0.7), (3.0, 0.6)]
    );
    assert_eq!(trial.value_at("loss", 2.5), Some(0.7));
    assert_eq!(trial.value_at("loss", 0.5), None);
}

#[test]
fn candidates_can_fail_before_dispatch() {
    let experiment = unit_experiment();
    let index = *experiment.propose(1).unwrap().keys().next().unwrap();
    assert_eq!(
        experiment.trial(index).unwrap().status(),
        TrialStatus::Candidate
    );
    assert!(
        experiment
            .report_progress(index, raw_data([("loss", 1.0)]), 1.0)
            .unwrap_err()
            .is_state_error()
    );

    experiment.mark_failed(index, "worker never started").unwrap();
    let trial = experiment.trial(index).unwrap();
    assert_eq!(trial.status(), TrialStatus::Failed);
    assert_eq!(trial.failure_reason(), Some("worker never started"));
    assert!(experiment.mark_running(index).unwrap_err().is_state_error());
}

#[test]
fn unknown_indices_are_reported() {
    let experiment = unit_experiment();
    assert!(matches!(
        experiment.tell(7, raw_data([("loss", 1.0)])),
        Err(Error::UnknownTrial(7))
    ));
    assert!(matches!(
        experiment.mark_failed(7, "missing"),
        Err(Error::UnknownTrial(7))
    ));
    assert!(experiment.trial(7).is_none());
}

#[test]
fn failed_trials_never_become_best() {
    let experiment = unit_experiment();
    let index = running(&experiment);
    experiment.mark_failed(index, "crashed").unwrap();
    assert!(matches!(experiment.best(), Err(Error::InsufficientData)));
}
