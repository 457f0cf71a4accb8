use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fuzzbisect::{
    ChangeLikelihoodEstimator, HistorySummary, InformationGain, Observation, PassRates,
    ProblemConfig, ScoreMethod, SearchStrategy, SelectionContext, SimulatedCheck,
};
use std::hint::black_box;

fn versions(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("rev{i:03}")).collect()
}

/// `per_version` deterministic draws for each version, step change in the middle.
fn history(vs: &[String], per_version: usize) -> Vec<Observation<String>> {
    let mut sim = SimulatedCheck::new(42, PassRates::step(vs, vs.len() / 2, 0.7, 0.3));
    let mut h = Vec::with_capacity(vs.len() * per_version);
    for _ in 0..per_version {
        for v in vs {
            h.push(Observation::new(v.clone(), sim.draw(v), 1.0));
        }
    }
    h
}

fn bench_posterior(c: &mut Criterion) {
    let mut group = c.benchmark_group("posterior");
    for &n in &[4usize, 16, 64] {
        let vs = versions(n);
        let h = history(&vs, 8);
        let summary = HistorySummary::new(&vs, &h);
        for (name, method) in [
            ("side_binomial", ScoreMethod::SideBinomial),
            ("contingency", ScoreMethod::Contingency),
        ] {
            let est = ChangeLikelihoodEstimator::new(method);
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, &_n| {
                b.iter(|| black_box(est.posterior(black_box(&summary))))
            });
        }
    }
    group.finish();
}

fn bench_information_gain(c: &mut Criterion) {
    let mut group = c.benchmark_group("information_gain_select");
    for &n in &[4usize, 16, 32] {
        let vs = versions(n);
        let h = history(&vs, 4);
        let problem = ProblemConfig::builder(vs.clone())
            .with_known_setup_cost(10.0)
            .with_known_test_cost(1.0)
            .build()
            .unwrap();
        let summary = HistorySummary::new(problem.versions(), &h);
        let estimator = ChangeLikelihoodEstimator::default();
        let strategy = InformationGain::default();

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_n| {
            b.iter(|| {
                let ctx = SelectionContext {
                    problem: &problem,
                    history: &h,
                    summary: &summary,
                    estimator: &estimator,
                    current: Some(0),
                    setup_cost: Some(10.0),
                    test_cost: Some(1.0),
                };
                black_box(strategy.select(black_box(&ctx)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_posterior, bench_information_gain);
criterion_main!(benches);
