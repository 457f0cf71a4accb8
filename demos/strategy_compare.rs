//! Compare round-robin against information-gain selection over many simulated seeds.
//!
//! ```text
//! cargo run --example strategy_compare
//! ```

use fuzzbisect::{
    PassRates, ProblemConfig, RunnerConfig, SimulatedCheck, SolveReport, StrategyKind,
    StrategyRunner,
};
use tracing_subscriber::EnvFilter;

const SEEDS: u64 = 40;

#[derive(Debug, Default)]
struct Tally {
    converged: u32,
    correct: u32,
    probes: usize,
    setups: usize,
}

impl Tally {
    fn add(&mut self, r: &SolveReport<String>, guilty: usize) {
        if r.is_converged() {
            self.converged += 1;
            if r.guess().change.index == guilty {
                self.correct += 1;
            }
        }
        self.probes += r.iterations;
        self.setups += r.setups;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let versions: Vec<String> = (0..8).map(|i| format!("v{i}")).collect();
    let guilty = 4;
    let (setup, test) = (20.0, 1.0);

    let problem = ProblemConfig::builder(versions.clone())
        .with_known_setup_cost(setup)
        .with_known_test_cost(test)
        .build()?;
    let config = RunnerConfig::default().with_max_iterations(200);

    for kind in [StrategyKind::RoundRobin, StrategyKind::default()] {
        let runner = StrategyRunner::from_kind(problem.clone(), kind, config)?;
        let mut tally = Tally::default();
        for seed in 0..SEEDS {
            let check = SimulatedCheck::new(seed, PassRates::step(&versions, guilty, 0.9, 0.2));
            let r = runner.solve(check)?;
            tally.add(&r, guilty);
        }
        let cost = tally.probes as f64 * test + tally.setups as f64 * setup;
        println!(
            "{:>16}: converged {:>2}/{SEEDS}, correct {:>2}, mean probes {:6.1}, mean cost {:7.1}",
            runner.strategy().name(),
            tally.converged,
            tally.correct,
            tally.probes as f64 / SEEDS as f64,
            cost / SEEDS as f64,
        );
    }
    Ok(())
}
