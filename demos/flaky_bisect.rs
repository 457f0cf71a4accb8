//! Bisect a simulated flaky check and print the progress view as the search runs.
//!
//! ```text
//! RUST_LOG=fuzzbisect=debug cargo run --example flaky_bisect
//! ```

use fuzzbisect::{
    report, ChangeLikelihoodEstimator, InformationGain, PassRates, ProblemConfig, RunnerConfig,
    SimulatedCheck, SolveOutcome, StrategyRunner,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Twelve revisions; the check passes 85% of the time up to r06 and 35% after.
    let versions: Vec<String> = (0..12).map(|i| format!("r{i:02}")).collect();
    let guilty = 6;
    let rates = PassRates::step(&versions, guilty, 0.85, 0.35);

    let problem = ProblemConfig::builder(versions.clone())
        .with_known_setup_cost(30.0)
        .with_known_test_cost(2.0)
        .build()?;
    let config = RunnerConfig::default()
        .with_target_confidence(0.9)
        .with_max_iterations(300);
    let estimator = ChangeLikelihoodEstimator::new(config.score_method);
    let runner = StrategyRunner::new(problem, InformationGain::default(), config)?;

    let report = runner.solve_with(SimulatedCheck::new(2024, rates), |e| {
        if e.iteration % 25 == 0 {
            println!("after {} probes:", e.iteration);
            println!("{}", report::render(e.summary, &estimator));
        }
    })?;

    let g = report.guess();
    match &report.outcome {
        SolveOutcome::Converged(_) => println!(
            "converged on {} (p = {:.3}) after {} probes, {} setups",
            g.change, g.probability, report.iterations, report.setups
        ),
        SolveOutcome::Exhausted { .. } => println!(
            "no convergence after {} probes; best so far {} (p = {:.3})",
            report.iterations, g.change, g.probability
        ),
    }
    println!(
        "true change: {}->{}",
        versions[guilty],
        versions[guilty + 1]
    );
    println!(
        "cost: {:.0} (tests) + {:.0} (setups)",
        report.total_test_cost(),
        report.setups as f64 * report.costs.setup_cost().unwrap_or(0.0)
    );
    Ok(())
}
