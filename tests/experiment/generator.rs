use std::collections::BTreeSet;

use asktell::data::raw_data;
use asktell::generator::{GenerationRequest, GeneratorRun};
use asktell::prelude::*;

fn constrained(generator: impl Generator + 'static) -> Experiment {
    let experiment = Experiment::builder().generator(generator).build();
    experiment
        .configure_with_constraints(
            vec![
                Parameter::float("x", 0.0, 1.0),
                Parameter::float("y", 0.0, 1.0),
                Parameter::float("z", 0.0, 1.0),
            ],
            vec![
                "x + y <= 1".parse().unwrap(),
                ParameterConstraint::order("y", "z"),
            ],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    experiment
}

fn run_loop(experiment: &Experiment, rounds: usize, batch: usize) {
    for _ in 0..rounds {
        for (index, params) in experiment.ask(batch).unwrap() {
            let x = params["x"].as_f64().unwrap();
            let y = params["y"].as_f64().unwrap();
            let z = params["z"].as_f64().unwrap();
            let loss = (x - 0.3).powi(2) + (y - 0.2).powi(2) + (z - 0.6).powi(2);
            experiment.tell(index, raw_data([("loss", loss)])).unwrap();
        }
    }
}

fn assert_constraints_hold(experiment: &Experiment) {
    for trial in experiment.trials() {
        let p = trial.parameterization();
        let x = p["x"].as_f64().unwrap();
        let y = p["y"].as_f64().unwrap();
        let z = p["z"].as_f64().unwrap();
        assert!(x + y <= 1.0 + 1e-12, "trial {}: x + y = {}", trial.index(), x + y);
        assert!(y <= z, "trial {}: y = {y} > z = {z}", trial.index());
    }
}

#[test]
fn random_generator_honors_parameter_constraints() {
    let experiment = constrained(RandomGenerator::with_seed(11));
    run_loop(&experiment, 5, 4);
    assert_eq!(experiment.n_trials(), 20);
    assert_constraints_hold(&experiment);
}

#[test]
fn sobol_generator_honors_parameter_constraints() {
    let experiment = constrained(SobolGenerator::with_seed(11));
    run_loop(&experiment, 5, 4);
    assert_eq!(experiment.n_trials(), 20);
    assert_constraints_hold(&experiment);
}

#[test]
fn gp_generator_honors_parameter_constraints() {
    let experiment = constrained(
        GpGenerator::builder()
            .seed(11)
            .n_candidates(200)
            .build(),
    );
    run_loop(&experiment, 6, 2);
    assert_eq!(experiment.n_trials(), 12);
    assert_constraints_hold(&experiment);
}

#[test]
fn generation_strategy_switches_from_sobol_to_model() {
    let experiment = constrained(GenerationStrategy::with_seed(4).n_startup(4));
    run_loop(&experiment, 4, 2);
    assert_constraints_hold(&experiment);

    let sources: Vec<String> = experiment
        .trials()
        .iter()
        .map(|t| match t.source() {
            asktell::trial::TrialSource::Generated { generator } => generator.clone(),
            asktell::trial::TrialSource::Attached => "attached".to_owned(),
        })
        .collect();
    assert!(sources[..4].iter().all(|s| s == "sobol"));
    assert!(sources[4..].iter().all(|s| s == "gp"));
}

#[test]
fn startup_trial_count_scales_with_dimensions() {
    let small = SearchSpace::new(vec![Parameter::float("x", 0.0, 1.0)], Vec::new()).unwrap();
    let wide = SearchSpace::new(
        (0..8)
            .map(|i| Parameter::float(format!("x{i}"), 0.0, 1.0))
            .collect(),
        Vec::new(),
    )
    .unwrap();
    let strategy = GenerationStrategy::new();
    assert_eq!(strategy.startup_trials(&small), 5);
    assert_eq!(strategy.startup_trials(&wide), 16);
    assert_eq!(strategy.n_startup(3).startup_trials(&wide), 3);
}

#[test]
fn exhausted_discrete_space_returns_short_batches() {
    let experiment = Experiment::builder()
        .generator(RandomGenerator::with_seed(2))
        .build();
    experiment
        .configure(
            vec![
                Parameter::int("n", 0, 1),
                Parameter::choice("mode", [true, false]),
            ],
            OptimizationConfig::single(Objective::maximize("score")),
        )
        .unwrap();

    let batch = experiment.ask(10).unwrap();
    assert_eq!(batch.len(), 4);
    let distinct: BTreeSet<String> = batch.values().map(|p| format!("{p:?}")).collect();
    assert_eq!(distinct.len(), 4);

    assert!(experiment.ask(1).unwrap().is_empty());
    assert_eq!(experiment.n_trials(), 4);
}

#[test]
fn oversized_request_is_a_short_batch() {
    let experiment = Experiment::builder().seed(8).build();
    experiment
        .configure(
            vec![Parameter::int("n", 1, 4)],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    assert_eq!(experiment.ask(usize::MAX).unwrap().len(), 4);
    assert!(experiment.ask(usize::MAX).unwrap().is_empty());
}

#[test]
fn proposals_avoid_pending_and_completed_points() {
    let experiment = Experiment::builder()
        .generator(SobolGenerator::with_seed(5))
        .build();
    experiment
        .configure(
            vec![Parameter::int("k", 1, 6)],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    let first = experiment.ask(3).unwrap();
    let (&done, _) = first.iter().next().unwrap();
    experiment.tell(done, raw_data([("loss", 1.0)])).unwrap();

    let second = experiment.ask(3).unwrap();
    let mut all: Vec<i64> = first
        .values()
        .chain(second.values())
        .map(|p| p["k"].as_i64().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn seeded_sobol_is_reproducible() {
    let make = || {
        let experiment = Experiment::builder()
            .generator(SobolGenerator::with_seed(123))
            .build();
        experiment
            .configure(
                vec![Parameter::float("x", -1.0, 1.0), Parameter::float("y", -1.0, 1.0)],
                OptimizationConfig::single(Objective::minimize("loss")),
            )
            .unwrap();
        experiment.ask(5).unwrap()
    };
    assert_eq!(make(), make());
}

fn narrow_corner(generator: impl Generator + 'static, bound: &str) -> Experiment {
    let experiment = Experiment::builder().generator(generator).build();
    experiment
        .configure_with_constraints(
            vec![Parameter::float("x", 0.0, 1.0), Parameter::float("y", 0.0, 1.0)],
            vec![format!("x + y <= {bound}").parse().unwrap()],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    experiment
}

fn ask_tell_one_at_a_time(experiment: &Experiment, rounds: usize) -> Vec<usize> {
    (0..rounds)
        .map(|_| {
            let batch = experiment.ask(1).unwrap();
            for (&index, params) in &batch {
                let x = params["x"].as_f64().unwrap();
                let y = params["y"].as_f64().unwrap();
                experiment
                    .tell(index, raw_data([("loss", (x - 0.1).powi(2) + y)]))
                    .unwrap();
            }
            batch.len()
        })
        .collect()
}

#[test]
fn sobol_keeps_producing_under_a_tight_constraint() {
    let experiment = narrow_corner(SobolGenerator::with_seed(1), "0.2");
    assert_eq!(ask_tell_one_at_a_time(&experiment, 12), vec![1; 12]);
    for trial in experiment.trials() {
        let p = trial.parameterization();
        assert!(p["x"].as_f64().unwrap() + p["y"].as_f64().unwrap() <= 0.2 + 1e-12);
    }
}

#[test]
fn default_strategy_reaches_the_model_under_a_tight_constraint() {
    let experiment = narrow_corner(GenerationStrategy::with_seed(3), "0.3");
    assert_eq!(ask_tell_one_at_a_time(&experiment, 10), vec![1; 10]);
    let last = experiment.trial(9).unwrap();
    assert!(matches!(
        last.source(),
        asktell::trial::TrialSource::Generated { generator } if generator == "gp"
    ));
}

#[test]
fn gp_improves_on_a_smooth_objective() {
    let experiment = Experiment::builder()
        .generator(GenerationStrategy::with_seed(8).n_startup(5))
        .build();
    experiment
        .configure(
            vec![Parameter::float("x", -5.0, 5.0)],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    for _ in 0..15 {
        for (index, params) in experiment.ask(1).unwrap() {
            let x = params["x"].as_f64().unwrap();
            experiment
                .tell(index, raw_data([("loss", (x - 1.5).powi(2))]))
                .unwrap();
        }
    }
    assert!(experiment.best().unwrap().value < 0.5);
}

#[test]
fn multi_objective_generation_uses_the_model() {
    let experiment = Experiment::builder()
        .generator(GenerationStrategy::with_seed(6).n_startup(4))
        .build();
    experiment
        .configure(
            vec![Parameter::float("x", 0.0, 1.0)],
            OptimizationConfig::parse("-f1, -f2", &[]).unwrap(),
        )
        .unwrap();
    for _ in 0..8 {
        for (index, params) in experiment.ask(1).unwrap() {
            let x = params["x"].as_f64().unwrap();
            experiment
                .tell(index, raw_data([("f1", x * x), ("f2", (x - 1.0).powi(2))]))
                .unwrap();
        }
    }
    assert_eq!(experiment.n_trials(), 8);
    assert!(!experiment.pareto_frontier().unwrap().is_empty());
}

/// A generator that ignores the space entirely.
struct OutOfBounds;

impl Generator for OutOfBounds {
    fn name(&self) -> &'static str {
        "out_of_bounds"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratorRun> {
        let params = Parameterization::from([("x".to_owned(), ParamValue::Float(2.0))]);
        Ok(GeneratorRun::new(self.name(), vec![params; request.count]))
    }
}

#[test]
fn out_of_space_proposals_are_rejected_before_insertion() {
    let experiment = Experiment::builder().generator(OutOfBounds).build();
    experiment
        .configure(
            vec![Parameter::float("x", 0.0, 1.0)],
            OptimizationConfig::single(Objective::minimize("loss")),
        )
        .unwrap();
    assert!(matches!(experiment.ask(2), Err(Error::Domain { .. })));
    assert_eq!(experiment.n_trials(), 0);
}
