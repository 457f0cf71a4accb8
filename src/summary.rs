//! Sufficient statistics of an observation history.
//!
//! A [`HistorySummary`] is a pure function of `(versions, history)`: it is rebuilt rather
//! than updated whenever the history grows.  [`HistorySummary::extended`] is the one
//! shortcut, used by strategies to evaluate "what if the next probe of `v` passed/failed"
//! without copying the history; it produces exactly what a full rebuild would.

use crate::problem::Observation;

/// Per-version and per-change counts over a history.
///
/// Change `c` separates versions `0..=c` (the left side) from `c+1..` (the right side).
#[derive(Debug, PartialEq)]
pub struct HistorySummary<'a, V> {
    versions: &'a [V],
    success_counts: Vec<u64>,
    failure_counts: Vec<u64>,
    left_sum_successes: Vec<u64>,
    left_sum_failures: Vec<u64>,
    success_count: u64,
    failure_count: u64,
}

// Only the slice reference is copied, so `V` need not be `Clone`.
impl<V> Clone for HistorySummary<'_, V> {
    fn clone(&self) -> Self {
        Self {
            versions: self.versions,
            success_counts: self.success_counts.clone(),
            failure_counts: self.failure_counts.clone(),
            left_sum_successes: self.left_sum_successes.clone(),
            left_sum_failures: self.left_sum_failures.clone(),
            success_count: self.success_count,
            failure_count: self.failure_count,
        }
    }
}

impl<'a, V: PartialEq> HistorySummary<'a, V> {
    /// Summarize `history` against the ordered `versions`.
    ///
    /// Observations naming a version outside `versions` are ignored.
    pub fn new(versions: &'a [V], history: &[Observation<V>]) -> Self {
        let mut success_counts = vec![0u64; versions.len()];
        let mut failure_counts = vec![0u64; versions.len()];
        for o in history {
            let Some(i) = versions.iter().position(|v| *v == o.version) else {
                continue;
            };
            if o.outcome {
                success_counts[i] += 1;
            } else {
                failure_counts[i] += 1;
            }
        }
        Self::from_counts(versions, success_counts, failure_counts)
    }
}

impl<'a, V> HistorySummary<'a, V> {
    fn from_counts(versions: &'a [V], success_counts: Vec<u64>, failure_counts: Vec<u64>) -> Self {
        let n_changes = versions.len().saturating_sub(1);
        let mut left_sum_successes = Vec::with_capacity(n_changes);
        let mut left_sum_failures = Vec::with_capacity(n_changes);
        let (mut s, mut f) = (0u64, 0u64);
        for i in 0..n_changes {
            s += success_counts[i];
            f += failure_counts[i];
            left_sum_successes.push(s);
            left_sum_failures.push(f);
        }
        let success_count = success_counts.iter().sum();
        let failure_count = failure_counts.iter().sum();
        Self {
            versions,
            success_counts,
            failure_counts,
            left_sum_successes,
            left_sum_failures,
            success_count,
            failure_count,
        }
    }

    /// The summary of this history plus one more observation of `versions[version_index]`.
    ///
    /// Returns an unchanged copy when `version_index` is out of range, matching how
    /// [`HistorySummary::new`] ignores unknown versions.
    pub fn extended(&self, version_index: usize, outcome: bool) -> Self {
        let mut out = self.clone();
        if version_index >= self.versions.len() {
            return out;
        }
        let (per_version, left, total) = if outcome {
            (
                &mut out.success_counts,
                &mut out.left_sum_successes,
                &mut out.success_count,
            )
        } else {
            (
                &mut out.failure_counts,
                &mut out.left_sum_failures,
                &mut out.failure_count,
            )
        };
        per_version[version_index] += 1;
        *total += 1;
        for s in left.iter_mut().skip(version_index) {
            *s += 1;
        }
        out
    }

    pub fn versions(&self) -> &'a [V] {
        self.versions
    }

    pub fn num_versions(&self) -> usize {
        self.versions.len()
    }

    pub fn num_changes(&self) -> usize {
        self.left_sum_successes.len()
    }

    /// Successes per version, in version order.
    pub fn success_counts(&self) -> &[u64] {
        &self.success_counts
    }

    /// Failures per version, in version order.
    pub fn failure_counts(&self) -> &[u64] {
        &self.failure_counts
    }

    /// Observations per version, in version order.
    pub fn counts(&self) -> Vec<u64> {
        self.success_counts
            .iter()
            .zip(&self.failure_counts)
            .map(|(s, f)| s + f)
            .collect()
    }

    /// Observations of `versions[version_index]` (0 when out of range).
    pub fn count(&self, version_index: usize) -> u64 {
        self.success_counts.get(version_index).copied().unwrap_or(0)
            + self.failure_counts.get(version_index).copied().unwrap_or(0)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Total number of observations.
    pub fn total_count(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Pooled pass rate over the whole history, `None` when empty.
    pub fn success_rate(&self) -> Option<f64> {
        let n = self.total_count();
        (n > 0).then(|| self.success_count as f64 / n as f64)
    }

    /// Successes at or before `change.before`.
    pub fn left_sum_successes(&self, change: usize) -> u64 {
        self.left_sum_successes[change]
    }

    /// Failures at or before `change.before`.
    pub fn left_sum_failures(&self, change: usize) -> u64 {
        self.left_sum_failures[change]
    }

    pub fn left_sum_counts(&self, change: usize) -> u64 {
        self.left_sum_successes[change] + self.left_sum_failures[change]
    }

    /// Successes at or after `change.after`.
    pub fn right_sum_successes(&self, change: usize) -> u64 {
        self.success_count - self.left_sum_successes[change]
    }

    /// Failures at or after `change.after`.
    pub fn right_sum_failures(&self, change: usize) -> u64 {
        self.failure_count - self.left_sum_failures[change]
    }

    pub fn right_sum_counts(&self, change: usize) -> u64 {
        self.total_count() - self.left_sum_counts(change)
    }

    /// Observed pass rates on the (left, right) side of `change`; `None` for an empty side.
    pub fn side_rates(&self, change: usize) -> (Option<f64>, Option<f64>) {
        let rate = |s: u64, n: u64| (n > 0).then(|| s as f64 / n as f64);
        (
            rate(self.left_sum_successes(change), self.left_sum_counts(change)),
            rate(self.right_sum_successes(change), self.right_sum_counts(change)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Observation as O;

    fn fixture() -> Vec<O<&'static str>> {
        vec![
            O::fail("a"),
            O::fail("a"),
            O::pass("b"),
            O::fail("b"),
            O::pass("c"),
            O::pass("c"),
        ]
    }

    #[test]
    fn counts_and_sums_match_hand_computation() {
        let versions = ["a", "b", "c"];
        let s = HistorySummary::new(&versions, &fixture());
        assert_eq!(s.success_counts(), &[0, 1, 2]);
        assert_eq!(s.failure_counts(), &[2, 1, 0]);
        assert_eq!(s.counts(), vec![2, 2, 2]);
        assert_eq!(s.success_count(), 3);
        assert_eq!(s.failure_count(), 3);
        assert_eq!(s.total_count(), 6);
        assert_eq!(s.num_changes(), 2);

        assert_eq!((s.left_sum_successes(0), s.left_sum_successes(1)), (0, 1));
        assert_eq!((s.left_sum_failures(0), s.left_sum_failures(1)), (2, 3));
        assert_eq!((s.left_sum_counts(0), s.left_sum_counts(1)), (2, 4));
        assert_eq!((s.right_sum_successes(0), s.right_sum_successes(1)), (3, 2));
        assert_eq!((s.right_sum_failures(0), s.right_sum_failures(1)), (1, 0));
        assert_eq!((s.right_sum_counts(0), s.right_sum_counts(1)), (4, 2));
    }

    #[test]
    fn empty_history_is_all_zero() {
        let versions = ["a", "b", "c"];
        let s = HistorySummary::new(&versions, &[]);
        assert_eq!(s.total_count(), 0);
        assert_eq!(s.success_rate(), None);
        assert_eq!(s.side_rates(0), (None, None));
        assert_eq!(s.left_sum_counts(1), 0);
    }

    #[test]
    fn unknown_versions_are_ignored() {
        let versions = ["a", "b", "c"];
        let mut h = fixture();
        h.push(O::pass("zzz"));
        let s = HistorySummary::new(&versions, &h);
        assert_eq!(s.total_count(), 6);
    }

    #[test]
    fn extended_matches_rebuild() {
        let versions = ["a", "b", "c"];
        let h = fixture();
        let base = HistorySummary::new(&versions, &h);
        for (i, v) in versions.iter().enumerate() {
            for outcome in [true, false] {
                let mut h2 = h.clone();
                h2.push(O::new(*v, outcome, 0.0));
                assert_eq!(base.extended(i, outcome), HistorySummary::new(&versions, &h2));
            }
        }
        assert_eq!(base.extended(99, true), base);
    }

    #[derive(Debug, PartialEq)]
    struct Rev(u32);

    #[test]
    fn extends_summaries_of_non_clone_versions() {
        let versions = [Rev(1), Rev(2), Rev(3)];
        let h = vec![O::new(Rev(1), true, 1.0), O::new(Rev(3), false, 1.0)];
        let base = HistorySummary::new(&versions, &h);
        let copy = base.clone();
        assert_eq!(copy, base);

        let next = base.extended(1, true);
        assert_eq!(next.success_counts(), &[1, 1, 0]);
        assert_eq!(next.failure_counts(), &[0, 0, 1]);
        assert_eq!((next.left_sum_successes(0), next.left_sum_successes(1)), (1, 2));
        assert_eq!(base.total_count(), 2);
        assert_eq!(next.total_count(), 3);
    }
}
