use std::collections::BTreeSet;

use asktell::data::raw_data;
use asktell::prelude::*;

use super::{at_x, unit_experiment};

#[test]
fn ask_on_empty_experiment_returns_distinct_in_bounds_trials() {
    let experiment = Experiment::builder().seed(5).build();
    experiment
        .configure(
            vec![
                Parameter::float("lr", 1e-4, 1e-1).log_scale(),
                Parameter::int("layers", 1, 6),
                Parameter::choice("optimizer", ["adam", "sgd"]),
            ],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();

    let batch = experiment.ask(3).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);

    let space = experiment.search_space().unwrap();
    for params in batch.values() {
        space.check_membership(params).unwrap();
        let lr = params["lr"].as_f64().unwrap();
        assert!((1e-4..=1e-1).contains(&lr));
    }
    let distinct: BTreeSet<String> = batch.values().map(|p| format!("{p:?}")).collect();
    assert_eq!(distinct.len(), 3);

    for index in batch.keys() {
        assert_eq!(
            experiment.trial(*index).unwrap().status(),
            TrialStatus::Running
        );
    }
}

#[test]
fn indices_increase_across_batches_and_attachments() {
    let experiment = unit_experiment();
    let first = experiment.ask(2).unwrap();
    let attached = experiment.attach(at_x(0.5)).unwrap();
    let second = experiment.ask(3).unwrap();

    let mut all: Vec<u64> = first.keys().copied().collect();
    all.push(attached);
    all.extend(second.keys().copied());
    assert_eq!(all, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(experiment.n_trials(), 6);
}

#[test]
fn tell_keeps_unconfigured_metrics() {
    let experiment = unit_experiment();
    let index = *experiment.ask(1).unwrap().keys().next().unwrap();
    experiment
        .tell(index, raw_data([("loss", 0.25), ("wall_time", 31.0)]))
        .unwrap();

    let trial = experiment.trial(index).unwrap();
    assert_eq!(trial.status(), TrialStatus::Completed);
    assert_eq!(trial.final_data().unwrap().len(), 2);
    assert!(trial.finished_at().is_some());

    let best = experiment.best().unwrap();
    assert!(best.metrics.contains_key("wall_time"));
    assert!((best.value - 0.25).abs() < f64::EPSILON);
}

#[test]
fn attach_rejects_values_outside_the_space() {
    let experiment = unit_experiment();
    assert!(matches!(
        experiment.attach(at_x(1.5)),
        Err(Error::Domain { .. })
    ));

    let mut extra = at_x(0.5);
    extra.insert("y".to_owned(), ParamValue::Float(0.1));
    assert!(matches!(experiment.attach(extra), Err(Error::Domain { .. })));

    assert!(matches!(
        experiment.attach(Parameterization::new()),
        Err(Error::Domain { .. })
    ));
    assert_eq!(experiment.n_trials(), 0);
}

#[test]
fn attach_completed_is_selectable() {
    let experiment = unit_experiment();
    let index = experiment
        .attach_completed(at_x(0.3), raw_data([("loss", 0.09)]))
        .unwrap();
    let trial = experiment.trial(index).unwrap();
    assert_eq!(trial.status(), TrialStatus::Completed);
    assert_eq!(trial.source(), &asktell::trial::TrialSource::Attached);
    assert_eq!(experiment.best().unwrap().trial_index, index);
}

#[test]
fn unconfigured_experiment_rejects_every_operation() {
    let experiment = Experiment::new();
    assert!(matches!(experiment.ask(1), Err(Error::Configuration { .. })));
    assert!(matches!(
        experiment.attach(at_x(0.5)),
        Err(Error::Configuration { .. })
    ));
    assert!(matches!(experiment.best(), Err(Error::Configuration { .. })));
    assert!(matches!(
        experiment.snapshot(),
        Err(Error::Configuration { .. })
    ));
    assert!(experiment.search_space().is_none());
}

#[test]
fn configure_rejects_malformed_inputs() {
    let experiment = Experiment::new();
    let duplicate = experiment.configure(
        vec![Parameter::float("x", 0.0, 1.0), Parameter::int("x", 0, 3)],
        OptimizationConfig::single(Objective::minimize("loss")),
    );
    assert!(matches!(duplicate, Err(Error::Configuration { .. })));

    let inverted = experiment.configure(
        vec![Parameter::float("x", 1.0, 0.0)],
        OptimizationConfig::single(Objective::minimize("loss")),
    );
    assert!(matches!(inverted, Err(Error::Configuration { .. })));

    let single_entry_multi = experiment.configure(
        vec![Parameter::float("x", 0.0, 1.0)],
        OptimizationConfig::multi_objective(vec![Objective::minimize("loss")]),
    );
    assert!(matches!(
        single_entry_multi,
        Err(Error::Configuration { .. })
    ));

    assert!(experiment.optimization_config().is_none());
}

#[test]
fn parsed_objective_sets_directions() {
    let config = OptimizationConfig::parse("-loss", &[]).unwrap();
    assert_eq!(config.objectives()[0].direction, Direction::Minimize);

    let config = OptimizationConfig::parse("accuracy", &["latency <= 20"]).unwrap();
    assert_eq!(config.objectives()[0].direction, Direction::Maximize);
    assert_eq!(config.outcome_constraints().len(), 1);

    let config = OptimizationConfig::parse("score, -time", &[]).unwrap();
    assert!(config.is_multi_objective());
    assert_eq!(config.objectives()[1].direction, Direction::Minimize);

    assert!(OptimizationConfig::parse("accuracy", &["latency < 20"]).is_err());
}

#[test]
fn fixed_parameters_are_always_proposed_with_their_value() {
    let experiment = Experiment::builder().seed(9).build();
    experiment
        .configure(
            vec![
                Parameter::float("x", 0.0, 1.0),
                Parameter::fixed("dataset", "mnist"),
            ],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    for params in experiment.ask(4).unwrap().values() {
        assert_eq!(params["dataset"].as_str(), Some("mnist"));
    }
}

#[test]
fn full_width_int_parameter_can_be_asked() {
    let experiment = Experiment::builder().seed(5).build();
    experiment
        .configure(
            vec![Parameter::int("n", i64::MIN, i64::MAX)],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    let batch = experiment.ask(3).unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch.values().all(|p| p["n"].as_i64().is_some()));
}
