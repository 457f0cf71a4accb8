//! Best current estimate of the guilty change.

use crate::estimator::{ChangeLikelihoodEstimator, Posterior};
use crate::problem::{Change, Observation, ProblemConfig, Version};
use crate::summary::HistorySummary;

/// The most likely change and its probability, derived from one history snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Guess<V> {
    /// Most likely change (lowest index on ties).
    pub change: Change<V>,
    /// Its posterior probability, in `(0, 1]`.
    pub probability: f64,
    /// Length of the history this guess was computed from.
    pub history_len: usize,
}

impl<V: Version> Guess<V> {
    /// Compute from scratch over `versions` and `history`.
    ///
    /// Returns `None` only when `versions` has fewer than two entries.
    pub fn new(
        versions: &[V],
        history: &[Observation<V>],
        estimator: &ChangeLikelihoodEstimator,
    ) -> Option<Self> {
        Self::from_summary(&HistorySummary::new(versions, history), estimator)
    }

    pub fn from_summary(
        summary: &HistorySummary<'_, V>,
        estimator: &ChangeLikelihoodEstimator,
    ) -> Option<Self> {
        Self::from_posterior(summary, &estimator.posterior(summary))
    }

    /// Build from an already computed posterior for `summary`.
    pub fn from_posterior(summary: &HistorySummary<'_, V>, posterior: &Posterior) -> Option<Self> {
        let (index, probability) = posterior.best()?;
        let versions = summary.versions();
        Some(Self {
            change: Change {
                index,
                before: versions.get(index)?.clone(),
                after: versions.get(index + 1)?.clone(),
            },
            probability,
            history_len: summary.total_count() as usize,
        })
    }

    /// Guess for a validated problem, which always has at least two changes.
    pub fn for_problem(
        problem: &ProblemConfig<V>,
        summary: &HistorySummary<'_, V>,
        estimator: &ChangeLikelihoodEstimator,
    ) -> Self {
        let posterior = estimator.posterior(summary);
        let (index, probability) = posterior
            .best()
            .unwrap_or((0, 1.0 / problem.num_changes() as f64));
        let versions = problem.versions();
        Self {
            change: Change {
                index,
                before: versions[index].clone(),
                after: versions[index + 1].clone(),
            },
            probability,
            history_len: summary.total_count() as usize,
        }
    }
}

/// Probability of the best change for `summary`, without building a [`Guess`].
pub fn guess_probability<V>(
    summary: &HistorySummary<'_, V>,
    estimator: &ChangeLikelihoodEstimator,
) -> f64 {
    estimator
        .posterior(summary)
        .best()
        .map(|(_, p)| p)
        .unwrap_or(0.0)
}
