//! `fuzzbisect`: find the change that made a flaky check flakier.
//!
//! Classical bisection assumes a check is deterministic: pass on one side of the bad change,
//! fail on the other.  Flaky checks break that assumption.  Here every version has an unknown
//! pass *probability*, exactly one adjacent change is assumed to have moved it, and the
//! search keeps probing versions until one change is the culprit with high confidence.
//!
//! The pieces, leaf first:
//!
//! - [`ProblemConfig`]: the ordered versions plus optional knowns (costs, prior pass rates,
//!   an already set up version).  Validated once; see [`ConfigError`].
//! - [`HistorySummary`]: per-version and per-change counts over the observation history.
//! - [`ChangeLikelihoodEstimator`]: turns a summary into a [`Posterior`] over changes.
//! - [`Guess`]: the most likely change and its probability.
//! - [`SearchStrategy`]: picks the next version to probe.  [`RoundRobin`] is the baseline;
//!   [`InformationGain`] does a one-step lookahead on the guess probability.
//! - [`StrategyRunner`]: the loop.  Calls a [`Probe`] (your setup/test callbacks), records
//!   outcomes, tracks [`CostEstimates`], and stops at the target confidence or an
//!   iteration cap.
//!
//! **Goals:**
//! - **Deterministic**: given the same probe outcomes, the same versions are probed.
//! - **Cost aware**: switching versions (checkout, build) is usually far more expensive than
//!   running the check once; the strategies account for it.
//! - **Small and explicit**: history and the active-version cursor are owned by one run,
//!   summaries are recomputed rather than mutated.
//!
//! **Non-goals:**
//! - Driving a VCS or build system (that is the [`Probe`]'s job).
//! - Persisting history across runs, or running probes in parallel.
//! - Non-linear histories: versions are totally ordered.
//!
//! # Example
//!
//! ```rust
//! use fuzzbisect::{
//!     InformationGain, PassRates, ProblemConfig, RunnerConfig, SimulatedCheck, StrategyRunner,
//! };
//!
//! let versions = vec!["v1", "v2", "v3", "v4", "v5"];
//! let problem = ProblemConfig::builder(versions.clone())
//!     .with_known_setup_cost(10.0)
//!     .with_known_test_cost(1.0)
//!     .build()
//!     .unwrap();
//! let runner = StrategyRunner::new(
//!     problem,
//!     InformationGain::default(),
//!     RunnerConfig::default().with_max_iterations(100),
//! )
//! .unwrap();
//!
//! // v1..=v3 pass 90% of the time, v4 and v5 only 10%.
//! let check = SimulatedCheck::new(0, PassRates::step(&versions, 2, 0.9, 0.1));
//! let report = runner.solve(check).unwrap();
//! println!("{} after {} probes", report.guess().change, report.iterations);
//! ```
//!
//! # Scoring
//!
//! For each change, the versions left of it and right of it are each tested against the
//! pooled pass rate with a two-sided exact binomial test, and the two p-values are combined
//! with Fisher's method.  The tests share the pooled rate, so the combined value is a
//! ranking score rather than a calibrated p-value.  The posterior normalizes `1 - score`
//! over changes.
//!
//! One consequence worth knowing: with very few observations a change can reach high
//! confidence from a single informative split, and with very many observations all scores
//! shrink toward 0 and the posterior flattens.  Choose the target confidence and iteration
//! cap with that in mind.

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod problem;
pub use problem::*;

mod summary;
pub use summary::*;

pub mod stats;

mod estimator;
pub use estimator::*;

mod guess;
pub use guess::*;

mod cost;
pub use cost::{CostEstimate, CostEstimates};

mod strategy;
pub use strategy::*;

mod runner;
pub use runner::*;

pub mod report;

mod sim;
pub use sim::*;
