//! The search loop: select, set up on switch, test, record, evaluate.
//!
//! [`StrategyRunner`] owns nothing but configuration.  Each call to
//! [`StrategyRunner::solve`] starts a fresh run with its own history, active-version cursor
//! and cost estimates, and returns them all in a [`SolveReport`].
//!
//! ```text
//!   SELECT -> [SETUP] -> TEST -> RECORD -> EVALUATE --(p > target)--> Converged
//!      ^                                      |
//!      +--------------------------------------+--(cap reached)------> Exhausted
//! ```
//!
//! Setup runs only when the selected version differs from the active one (including the
//! first probe of a run without an initial version).  Durations of setup and test calls are
//! measured with [`Instant`] and folded into the cost estimates unless the costs are known.
//!
//! Collaborator errors abort the run and are returned unchanged; there is no retry.

use std::convert::Infallible;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cost::CostEstimates;
use crate::error::{ConfigError, Result};
use crate::estimator::{ChangeLikelihoodEstimator, ScoreMethod};
use crate::guess::Guess;
use crate::problem::{Observation, ProblemConfig, Version};
use crate::strategy::{SearchStrategy, SelectionContext, StrategyKind};
use crate::summary::HistorySummary;

/// The setup/test collaborator driven by the runner.
pub trait Probe<V> {
    type Error;

    /// Make `version` the active one (check out, build, deploy, ...).
    fn setup(&mut self, _version: &V) -> std::result::Result<(), Self::Error> {
        Ok(())
    }

    /// Run the check once against the active `version`.
    fn test(&mut self, version: &V) -> std::result::Result<bool, Self::Error>;
}

impl<V, P: Probe<V> + ?Sized> Probe<V> for &mut P {
    type Error = P::Error;

    fn setup(&mut self, version: &V) -> std::result::Result<(), Self::Error> {
        (**self).setup(version)
    }

    fn test(&mut self, version: &V) -> std::result::Result<bool, Self::Error> {
        (**self).test(version)
    }
}

/// Setup step of an [`FnProbe`] built without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSetup;

/// A setup callback for [`FnProbe`].
pub trait SetupFn<V> {
    fn call(&mut self, version: &V);
}

impl<V> SetupFn<V> for NoSetup {
    fn call(&mut self, _version: &V) {}
}

impl<V, F: FnMut(&V)> SetupFn<V> for F {
    fn call(&mut self, version: &V) {
        self(version)
    }
}

/// Infallible [`Probe`] from closures.
///
/// ```rust
/// use fuzzbisect::FnProbe;
///
/// let mut switches = 0;
/// let probe = FnProbe::new(|v: &&str| v.len() % 2 == 0).with_setup(|_: &&str| switches += 1);
/// # drop(probe);
/// ```
#[derive(Debug, Clone)]
pub struct FnProbe<T, S = NoSetup> {
    test: T,
    setup: S,
}

impl<T> FnProbe<T> {
    pub fn new(test: T) -> Self {
        Self {
            test,
            setup: NoSetup,
        }
    }
}

impl<T, S> FnProbe<T, S> {
    /// Replace the setup step.
    pub fn with_setup<S2>(self, setup: S2) -> FnProbe<T, S2> {
        FnProbe {
            test: self.test,
            setup,
        }
    }
}

impl<V, T: FnMut(&V) -> bool, S: SetupFn<V>> Probe<V> for FnProbe<T, S> {
    type Error = Infallible;

    fn setup(&mut self, version: &V) -> std::result::Result<(), Infallible> {
        self.setup.call(version);
        Ok(())
    }

    fn test(&mut self, version: &V) -> std::result::Result<bool, Infallible> {
        Ok((self.test)(version))
    }
}

/// Loop configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunnerConfig {
    /// Stop once the best change's probability is strictly above this.  In `(0, 1)`.
    pub target_confidence: f64,
    /// Stop after this many probes.  `None` runs until convergence.
    ///
    /// At least one probe always runs.
    pub max_iterations: Option<usize>,
    /// How changes are scored.
    pub score_method: ScoreMethod,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            target_confidence: 0.9,
            max_iterations: None,
            score_method: ScoreMethod::default(),
        }
    }
}

impl RunnerConfig {
    pub fn with_target_confidence(mut self, p: f64) -> Self {
        self.target_confidence = p;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    pub fn with_score_method(mut self, m: ScoreMethod) -> Self {
        self.score_method = m;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.target_confidence;
        if !(p > 0.0 && p < 1.0) {
            return Err(ConfigError::InvalidTargetConfidence(p));
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveOutcome<V> {
    /// The best change crossed the target confidence.
    Converged(Guess<V>),
    /// The iteration cap was reached first; `best` is the last guess.
    Exhausted { best: Guess<V> },
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveReport<V> {
    pub outcome: SolveOutcome<V>,
    /// Number of probes (test calls) made.
    pub iterations: usize,
    /// Number of setup calls made.
    pub setups: usize,
    pub history: Vec<Observation<V>>,
    pub costs: CostEstimates,
    /// Active version when the run ended.
    pub current_version: Option<V>,
}

impl<V> SolveReport<V> {
    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, SolveOutcome::Converged(_))
    }

    /// The final guess, converged or not.
    pub fn guess(&self) -> &Guess<V> {
        match &self.outcome {
            SolveOutcome::Converged(g) => g,
            SolveOutcome::Exhausted { best } => best,
        }
    }

    /// Sum of the recorded test costs.
    pub fn total_test_cost(&self) -> f64 {
        self.history.iter().map(|o| o.cost).sum()
    }
}

/// What the observer sees after every probe.
#[derive(Debug)]
pub struct IterationEvent<'a, V> {
    /// 1-based probe number.
    pub iteration: usize,
    pub version: &'a V,
    pub version_index: usize,
    /// Whether setup ran before this probe.
    pub setup_ran: bool,
    pub outcome: bool,
    pub guess: &'a Guess<V>,
    pub summary: &'a HistorySummary<'a, V>,
    pub costs: &'a CostEstimates,
}

/// Drives a [`SearchStrategy`] against a [`Probe`] until convergence or the iteration cap.
#[derive(Debug, Clone)]
pub struct StrategyRunner<V, S> {
    problem: ProblemConfig<V>,
    strategy: S,
    config: RunnerConfig,
}

impl<V: Version> StrategyRunner<V, Box<dyn SearchStrategy<V>>> {
    /// Runner for one of the built-in strategies.
    pub fn from_kind(
        problem: ProblemConfig<V>,
        kind: StrategyKind,
        config: RunnerConfig,
    ) -> Result<Self> {
        Self::new(problem, kind.build()?, config)
    }
}

impl<V: Version, S: SearchStrategy<V>> StrategyRunner<V, S> {
    pub fn new(problem: ProblemConfig<V>, strategy: S, config: RunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            problem,
            strategy,
            config,
        })
    }

    pub fn problem(&self) -> &ProblemConfig<V> {
        &self.problem
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a fresh search.
    pub fn solve<P: Probe<V>>(&self, probe: P) -> std::result::Result<SolveReport<V>, P::Error> {
        self.solve_with(probe, |_| {})
    }

    /// Run a fresh search, calling `observer` after every probe.
    pub fn solve_with<P, F>(
        &self,
        mut probe: P,
        mut observer: F,
    ) -> std::result::Result<SolveReport<V>, P::Error>
    where
        P: Probe<V>,
        F: FnMut(&IterationEvent<'_, V>),
    {
        let estimator = ChangeLikelihoodEstimator::new(self.config.score_method);
        let versions = self.problem.versions();
        let mut history: Vec<Observation<V>> = Vec::new();
        let mut current = self
            .problem
            .initial_version()
            .and_then(|v| self.problem.index_of(v));
        let mut costs = CostEstimates::from_problem(&self.problem);
        let mut setups = 0usize;
        let mut iteration = 0usize;

        loop {
            let selected = {
                let summary = HistorySummary::new(versions, &history);
                let ctx = SelectionContext {
                    problem: &self.problem,
                    history: &history,
                    summary: &summary,
                    estimator: &estimator,
                    current,
                    setup_cost: costs.setup_cost(),
                    test_cost: costs.test_cost(),
                };
                let picked = self.strategy.select(&ctx);
                if picked < versions.len() {
                    picked
                } else {
                    warn!(
                        picked,
                        versions = versions.len(),
                        strategy = self.strategy.name(),
                        "strategy selected an out-of-range version; using the last one"
                    );
                    versions.len() - 1
                }
            };
            let version = &versions[selected];

            let setup_ran = current != Some(selected);
            if setup_ran {
                debug!(version = ?version, from = ?current.map(|i| &versions[i]), "setup");
                let start = Instant::now();
                probe.setup(version)?;
                costs.setup = costs.setup.observe_duration(start.elapsed());
                current = Some(selected);
                setups += 1;
            }

            let start = Instant::now();
            let outcome = probe.test(version)?;
            costs.test = costs.test.observe_duration(start.elapsed());

            let cost = costs.test_cost().unwrap_or(0.0);
            history.push(Observation::new(version.clone(), outcome, cost));
            iteration += 1;

            let summary = HistorySummary::new(versions, &history);
            let guess = Guess::for_problem(&self.problem, &summary, &estimator);
            debug!(
                iteration,
                strategy = self.strategy.name(),
                version = ?version,
                outcome,
                best = guess.change.index,
                probability = guess.probability,
                "probe recorded"
            );
            observer(&IterationEvent {
                iteration,
                version,
                version_index: selected,
                setup_ran,
                outcome,
                guess: &guess,
                summary: &summary,
                costs: &costs,
            });

            let end = if guess.probability > self.config.target_confidence {
                info!(
                    iteration,
                    setups,
                    change = ?guess.change,
                    probability = guess.probability,
                    "converged"
                );
                SolveOutcome::Converged(guess)
            } else if self.config.max_iterations.is_some_and(|cap| iteration >= cap) {
                warn!(
                    iteration,
                    best = ?guess.change,
                    probability = guess.probability,
                    target = self.config.target_confidence,
                    "iteration cap reached before convergence"
                );
                SolveOutcome::Exhausted { best: guess }
            } else {
                continue;
            };

            return Ok(SolveReport {
                outcome: end,
                iterations: iteration,
                setups,
                history,
                costs,
                current_version: current.map(|i| versions[i].clone()),
            });
        }
    }
}
