use asktell::data::raw_data;
use asktell::prelude::*;

fn scored_experiment(config: OptimizationConfig) -> Experiment {
    let experiment = Experiment::builder()
        .generator(RandomGenerator::with_seed(1))
        .build();
    experiment
        .configure(vec![Parameter::float("x", 0.0, 10.0)], config)
        .unwrap();
    experiment
}

fn attach(experiment: &Experiment, x: f64, data: &[(&str, f64)]) -> u64 {
    experiment
        .attach_completed(
            Parameterization::from([("x".to_owned(), ParamValue::Float(x))]),
            raw_data(data.iter().copied()),
        )
        .unwrap()
}

#[test]
fn best_maximizes_when_configured() {
    let experiment = scored_experiment(OptimizationConfig::single(Objective::maximize("score")));
    attach(&experiment, 1.0, &[("score", 3.2)]);
    let winner = attach(&experiment, 2.0, &[("score", 5.1)]);
    attach(&experiment, 3.0, &[("score", 1.0)]);

    let best = experiment.best().unwrap();
    assert_eq!(best.trial_index, winner);
    assert!((best.value - 5.1).abs() < f64::EPSILON);
    assert_eq!(best.parameterization["x"].as_f64(), Some(2.0));
}

#[test]
fn best_minimizes_when_configured() {
    let experiment = scored_experiment(OptimizationConfig::single(Objective::minimize("score")));
    attach(&experiment, 1.0, &[("score", 3.2)]);
    attach(&experiment, 2.0, &[("score", 5.1)]);
    let winner = attach(&experiment, 3.0, &[("score", 1.0)]);
    assert_eq!(experiment.best().unwrap().trial_index, winner);
}

#[test]
fn outcome_constraints_exclude_infeasible_trials() {
    let config = OptimizationConfig::parse("score", &["weight <= 10"]).unwrap();
    let experiment = scored_experiment(config);
    attach(&experiment, 1.0, &[("score", 9.0), ("weight", 12.0)]);
    let feasible = attach(&experiment, 2.0, &[("score", 7.0), ("weight", 8.0)]);
    // Missing the constrained metric: not eligible.
    attach(&experiment, 3.0, &[("score", 11.0)]);

    assert_eq!(experiment.best().unwrap().trial_index, feasible);
}

#[test]
fn ties_go_to_the_lowest_index() {
    let experiment = scored_experiment(OptimizationConfig::single(Objective::minimize("loss")));
    let first = attach(&experiment, 1.0, &[("loss", 0.5)]);
    attach(&experiment, 2.0, &[("loss", 0.5)]);
    assert_eq!(experiment.best().unwrap().trial_index, first);
}

#[test]
fn trials_missing_the_objective_are_ignored() {
    let experiment = scored_experiment(OptimizationConfig::single(Objective::minimize("loss")));
    attach(&experiment, 1.0, &[("other", 0.1)]);
    assert!(matches!(experiment.best(), Err(Error::InsufficientData)));
    assert!(matches!(
        experiment.pareto_frontier(),
        Err(Error::InsufficientData)
    ));
}

#[test]
fn scalarized_value_is_the_weighted_signed_sum() {
    let config = OptimizationConfig::parse("accuracy + -0.5*latency", &[]).unwrap();
    let experiment = scored_experiment(config);
    attach(&experiment, 1.0, &[("accuracy", 0.9), ("latency", 1.0)]);
    let winner = attach(&experiment, 2.0, &[("accuracy", 0.8), ("latency", 0.1)]);

    let best = experiment.best().unwrap();
    assert_eq!(best.trial_index, winner);
    assert!((best.value - (0.8 - 0.05)).abs() < 1e-12);
}

#[test]
fn mutually_non_dominated_points_all_join_the_frontier() {
    let config = OptimizationConfig::multi_objective(vec![
        Objective::maximize("score"),
        Objective::minimize("time"),
    ]);
    let experiment = scored_experiment(config);
    attach(&experiment, 1.0, &[("score", 1.0), ("time", 1.0)]);
    attach(&experiment, 2.0, &[("score", 2.0), ("time", 2.0)]);
    attach(&experiment, 3.0, &[("score", 3.0), ("time", 3.0)]);

    let frontier = experiment.pareto_frontier().unwrap();
    let indices: Vec<u64> = frontier.iter().map(|p| p.trial_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn dominated_points_leave_the_frontier() {
    let config = OptimizationConfig::parse("score, -time", &[]).unwrap();
    let experiment = scored_experiment(config);
    attach(&experiment, 1.0, &[("score", 2.0), ("time", 1.0)]);
    attach(&experiment, 2.0, &[("score", 1.0), ("time", 2.0)]);
    attach(&experiment, 3.0, &[("score", 3.0), ("time", 5.0)]);

    let frontier = experiment.pareto_frontier().unwrap();
    let indices: Vec<u64> = frontier.iter().map(|p| p.trial_index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert!(frontier[1].metrics.contains_key("time"));
}

#[test]
fn best_is_undefined_for_multi_objective_experiments() {
    let config = OptimizationConfig::parse("score, -time", &[]).unwrap();
    let experiment = scored_experiment(config);
    attach(&experiment, 1.0, &[("score", 2.0), ("time", 1.0)]);
    assert!(matches!(experiment.best(), Err(Error::Configuration { .. })));
}

#[test]
fn single_objective_frontier_is_the_best_point() {
    let experiment = scored_experiment(OptimizationConfig::single(Objective::minimize("loss")));
    attach(&experiment, 1.0, &[("loss", 2.0)]);
    let winner = attach(&experiment, 2.0, &[("loss", 1.0)]);
    let frontier = experiment.pareto_frontier().unwrap();
    assert_eq!(frontier.len(), 1);
    assert_eq!(frontier[0].trial_index, winner);
}

#[test]
fn model_based_generators_attach_predictions() {
    let experiment = Experiment::builder()
        .generator(GenerationStrategy::with_seed(3).n_startup(4))
        .build();
    experiment
        .configure(
            vec![Parameter::float("x", -2.0, 2.0)],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    for _ in 0..4 {
        for (index, params) in experiment.ask(2).unwrap() {
            let x = params["x"].as_f64().unwrap();
            experiment.tell(index, raw_data([("loss", x * x)])).unwrap();
        }
    }
    let best = experiment.best().unwrap();
    let prediction = best.prediction.expect("GP prediction");
    assert!(prediction.mean.is_finite());
    assert!(prediction.variance >= 0.0);
}

#[test]
fn random_generator_has_no_predictions() {
    let experiment = scored_experiment(OptimizationConfig::single(Objective::minimize("loss")));
    attach(&experiment, 1.0, &[("loss", 2.0)]);
    attach(&experiment, 2.0, &[("loss", 1.0)]);
    assert!(experiment.best().unwrap().prediction.is_none());
}
