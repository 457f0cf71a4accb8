//! Change likelihood: from history counts to a distribution over candidate changes.
//!
//! Each change gets a "same distribution" score: small when the versions on its two sides
//! look like they pass at different rates.  Exactly one change is guilty by assumption, so
//! with a uniform prior over changes Bayes' rule gives
//!
//! ```text
//!   posterior[c] = (1 - score[c]) / sum_c' (1 - score[c'])
//! ```
//!
//! falling back to uniform when every score is 1 (no evidence anywhere, e.g. an empty
//! history).
//!
//! ## Default score: per-side binomial tests, combined
//!
//! With `p̂` the pooled pass rate of the whole history, the left and right sides of a change
//! are each tested against `p̂` with a two-sided exact binomial test, and the two p-values
//! are combined with Fisher's method.
//!
//! This differs from the harmonic rule `1 / (1/p_left + 1/p_right)`, which halves the score
//! of a change with no evidence on either side; see DESIGN.md.
//!
//! Caveat: both tests use the same `p̂`, so they are not independent and the combined value
//! is not a calibrated p-value.  It is used only as a ranking score and is intentionally
//! left uncorrected; every numeric expectation downstream depends on it.
//!
//! ## Alternative: contingency table
//!
//! [`ScoreMethod::Contingency`] scores a change with the two-sided Fisher exact test on the
//! (side × outcome) 2x2 table.  It is kept to cross-check the default on symmetric data.

use crate::stats::{binomial_test_two_sided, fisher_combine, fisher_exact_two_sided};
use crate::summary::HistorySummary;

/// How a single change is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScoreMethod {
    /// Per-side exact binomial tests against the pooled rate, combined with Fisher's method.
    #[default]
    SideBinomial,
    /// Fisher exact test on the 2x2 (left/right × pass/fail) table.
    Contingency,
}

/// Probability that each change is the guilty one, in change order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Posterior {
    probs: Vec<f64>,
}

impl Posterior {
    /// Normalize `1 - score` over changes, or uniform when nothing carries evidence.
    pub fn from_scores(scores: &[f64]) -> Self {
        let n = scores.len();
        if n == 0 {
            return Self { probs: Vec::new() };
        }
        let total: f64 = scores.iter().map(|s| 1.0 - s).sum();
        if !(total > 0.0 && total.is_finite()) {
            return Self::uniform(n);
        }
        Self {
            probs: scores.iter().map(|s| (1.0 - s) / total).collect(),
        }
    }

    pub fn uniform(n_changes: usize) -> Self {
        let p = 1.0 / n_changes as f64;
        Self {
            probs: vec![p; n_changes],
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Probability of change `index`.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.probs.get(index).copied()
    }

    /// `(index, probability)` of the most likely change; lowest index wins ties.
    pub fn best(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in self.probs.iter().enumerate() {
            match best {
                Some((_, bp)) if p <= bp => {}
                _ => best = Some((i, p)),
            }
        }
        best
    }
}

/// Scores changes and turns the scores into a [`Posterior`].
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeLikelihoodEstimator {
    pub method: ScoreMethod,
}

impl ChangeLikelihoodEstimator {
    pub fn new(method: ScoreMethod) -> Self {
        Self { method }
    }

    /// Same-distribution score of change `change`, in `[0, 1]`.
    ///
    /// 1 means no evidence of a change (including an empty side); 0 means certainty.
    pub fn score<V>(&self, summary: &HistorySummary<'_, V>, change: usize) -> f64 {
        let n_left = summary.left_sum_counts(change);
        let n_right = summary.right_sum_counts(change);
        if n_left == 0 || n_right == 0 {
            return 1.0;
        }
        match self.method {
            ScoreMethod::SideBinomial => {
                let p_hat = summary.success_count() as f64 / summary.total_count() as f64;
                let p_left = binomial_test_two_sided(summary.left_sum_successes(change), n_left, p_hat);
                let p_right =
                    binomial_test_two_sided(summary.right_sum_successes(change), n_right, p_hat);
                if p_left == 0.0 || p_right == 0.0 {
                    return 0.0;
                }
                fisher_combine(p_left, p_right)
            }
            ScoreMethod::Contingency => fisher_exact_two_sided(
                summary.left_sum_successes(change),
                summary.right_sum_successes(change),
                summary.left_sum_failures(change),
                summary.right_sum_failures(change),
            ),
        }
    }

    /// Scores for every change, in change order.
    pub fn scores<V>(&self, summary: &HistorySummary<'_, V>) -> Vec<f64> {
        if summary.total_count() == 0 {
            return vec![1.0; summary.num_changes()];
        }
        (0..summary.num_changes())
            .map(|c| self.score(summary, c))
            .collect()
    }

    pub fn posterior<V>(&self, summary: &HistorySummary<'_, V>) -> Posterior {
        Posterior::from_scores(&self.scores(summary))
    }
}
