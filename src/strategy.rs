//! Next-version selection policies.
//!
//! A [`SearchStrategy`] looks at a read-only [`SelectionContext`] (problem, history, summary,
//! the active version, current cost estimates) and returns the index of the version to probe
//! next.  Strategies hold no per-run state: everything they need is in the context, so the
//! same strategy value can drive any number of runs.
//!
//! Two strategies are provided:
//!
//! - [`RoundRobin`]: keep per-version sample counts balanced, but only pay a switch once the
//!   imbalance exceeds the setup/test cost ratio.  A baseline.
//! - [`InformationGain`]: one-step lookahead.  For each version, simulate a pass and a fail,
//!   recompute the guess probability on both branches, and pick the version whose expected
//!   probability moves the most.  The active version's reward is amplified by a switching
//!   penalty so cheap repeated probes are preferred when rewards are close.
//!
//! Both break exact ties toward the lowest version index.  Rewards are compared exactly:
//! no epsilon band.

use crate::cost;
use crate::error::{ConfigError, Result};
use crate::estimator::{ChangeLikelihoodEstimator, Posterior};
use crate::guess::guess_probability;
use crate::problem::{Observation, ProblemConfig, Version};
use crate::summary::HistorySummary;

/// Everything a strategy may look at when choosing the next probe.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a, V> {
    pub problem: &'a ProblemConfig<V>,
    pub history: &'a [Observation<V>],
    /// Summary of `history` against `problem.versions()`.
    pub summary: &'a HistorySummary<'a, V>,
    /// Estimator the runner evaluates guesses with.
    pub estimator: &'a ChangeLikelihoodEstimator,
    /// Index of the active (already set up) version, if any.
    pub current: Option<usize>,
    /// Setup cost estimate, `None` while unknown.
    pub setup_cost: Option<f64>,
    /// Test cost estimate, `None` while unknown.
    pub test_cost: Option<f64>,
}

impl<'a, V: Version> SelectionContext<'a, V> {
    pub fn num_versions(&self) -> usize {
        self.problem.versions().len()
    }

    /// `ceil(setup / test)`, or 1 when either cost is unknown.
    pub fn cost_ratio(&self) -> u64 {
        cost::cost_ratio(self.setup_cost, self.test_cost)
    }
}

/// Chooses the next version to probe.
///
/// Implementations must return an index `< ctx.num_versions()`.
pub trait SearchStrategy<V: Version> {
    /// Index (into `ctx.problem.versions()`) of the version to probe next.
    fn select(&self, ctx: &SelectionContext<'_, V>) -> usize;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

impl<V: Version, S: SearchStrategy<V> + ?Sized> SearchStrategy<V> for Box<S> {
    fn select(&self, ctx: &SelectionContext<'_, V>) -> usize {
        (**self).select(ctx)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Balanced sampling with a cost-aware switching threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundRobin;

impl<V: Version> SearchStrategy<V> for RoundRobin {
    fn select(&self, ctx: &SelectionContext<'_, V>) -> usize {
        if ctx.history.is_empty() {
            return ctx.current.unwrap_or(0);
        }
        let counts = ctx.summary.counts();
        // `min_by_key` keeps the first minimum.
        let Some((min_index, &min_count)) = counts.iter().enumerate().min_by_key(|(_, c)| **c)
        else {
            return 0;
        };
        let max_count = counts.iter().copied().max().unwrap_or(min_count);
        match ctx.current {
            Some(cur) if max_count - min_count <= ctx.cost_ratio() => cur,
            _ => min_index,
        }
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

/// One-step lookahead on the guess probability, with a preference for the active version.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "InformationGainParams"))]
pub struct InformationGain {
    inertia: f64,
}

/// Unvalidated wire form; deserialization goes through [`InformationGain::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct InformationGainParams {
    inertia: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<InformationGainParams> for InformationGain {
    type Error = ConfigError;

    fn try_from(params: InformationGainParams) -> Result<Self> {
        Self::new(params.inertia)
    }
}

impl Default for InformationGain {
    fn default() -> Self {
        Self {
            inertia: Self::DEFAULT_INERTIA,
        }
    }
}

impl InformationGain {
    pub const DEFAULT_INERTIA: f64 = 0.9;

    /// `inertia` must lie in `[0, 1]`; 0 still prefers the active version by the cost factor.
    pub fn new(inertia: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&inertia) {
            return Err(ConfigError::InvalidInertia(inertia));
        }
        Ok(Self { inertia })
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Multiplier applied to the active version's reward.
    ///
    /// `(1 + inertia) * (setup + test) / test`; an unknown setup cost counts as 0 and an
    /// unknown or non-positive test cost leaves just `1 + inertia`.
    pub fn switch_penalty(&self, setup_cost: Option<f64>, test_cost: Option<f64>) -> f64 {
        match test_cost {
            Some(t) if t > 0.0 => {
                let s = setup_cost.unwrap_or(0.0);
                (1.0 + self.inertia) * (s + t) / t
            }
            _ => 1.0 + self.inertia,
        }
    }

    /// Pass probability used to weight the two branches of probing `version`.
    fn branch_weight<V: Version>(
        ctx: &SelectionContext<'_, V>,
        posterior: &Posterior,
        version: usize,
    ) -> f64 {
        if let Some((before, after)) = ctx.problem.known_success_rates() {
            // Change c puts `version` on its left side when version <= c.
            let p_before: f64 = posterior.as_slice().iter().skip(version).sum();
            let p_before = p_before.clamp(0.0, 1.0);
            return p_before * before + (1.0 - p_before) * after;
        }
        let s = ctx.summary.success_count();
        let n = ctx.summary.total_count();
        (s + 1) as f64 / (n + 2) as f64
    }

    /// Expected-squared-movement reward for every version, before the switch penalty.
    pub fn rewards<V: Version>(&self, ctx: &SelectionContext<'_, V>) -> Vec<f64> {
        let summary = ctx.summary;
        let posterior = ctx.estimator.posterior(summary);
        let baseline = posterior.best().map(|(_, p)| p).unwrap_or(0.0);
        (0..summary.num_versions())
            .map(|v| {
                let sf = Self::branch_weight(ctx, &posterior, v);
                let a = guess_probability(&summary.extended(v, true), ctx.estimator);
                let b = guess_probability(&summary.extended(v, false), ctx.estimator);
                let expected = a * sf + b * (1.0 - sf);
                (baseline - expected).powi(2)
            })
            .collect()
    }
}

impl<V: Version> SearchStrategy<V> for InformationGain {
    fn select(&self, ctx: &SelectionContext<'_, V>) -> usize {
        if ctx.history.is_empty() {
            return ctx.current.unwrap_or(ctx.num_versions() / 2);
        }
        let mut rewards = self.rewards(ctx);
        if let Some(r) = ctx.current.and_then(|c| rewards.get_mut(c)) {
            *r *= self.switch_penalty(ctx.setup_cost, ctx.test_cost);
        }
        argmax_first(&rewards).unwrap_or(0)
    }

    fn name(&self) -> &'static str {
        "information-gain"
    }
}

/// Index of the largest value; the first one wins exact ties.  NaN never wins.
fn argmax_first(xs: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in xs.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, bx)| x > bx) {
            best = Some((i, x));
        }
    }
    best.map(|(i, _)| i)
}

/// Built-in strategies, by name.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StrategyKind {
    RoundRobin,
    InformationGain { inertia: f64 },
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::InformationGain {
            inertia: InformationGain::DEFAULT_INERTIA,
        }
    }
}

impl StrategyKind {
    /// Build the strategy, validating its parameters.
    pub fn build<V: Version>(&self) -> Result<Box<dyn SearchStrategy<V>>> {
        Ok(match *self {
            StrategyKind::RoundRobin => Box::new(RoundRobin),
            StrategyKind::InformationGain { inertia } => Box::new(InformationGain::new(inertia)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Observation as O;

    struct Fixture {
        problem: ProblemConfig<&'static str>,
        history: Vec<O<&'static str>>,
        estimator: ChangeLikelihoodEstimator,
    }

    impl Fixture {
        fn new(versions: Vec<&'static str>, history: Vec<O<&'static str>>) -> Self {
            Self::with_problem(ProblemConfig::new(versions).unwrap(), history)
        }

        fn with_problem(
            problem: ProblemConfig<&'static str>,
            history: Vec<O<&'static str>>,
        ) -> Self {
            Self {
                problem,
                history,
                estimator: ChangeLikelihoodEstimator::default(),
            }
        }

        fn with_ctx<R>(
            &self,
            current: Option<usize>,
            costs: (Option<f64>, Option<f64>),
            f: impl FnOnce(&SelectionContext<'_, &'static str>) -> R,
        ) -> R {
            let summary = HistorySummary::new(self.problem.versions(), &self.history);
            let ctx = SelectionContext {
                problem: &self.problem,
                history: &self.history,
                summary: &summary,
                estimator: &self.estimator,
                current,
                setup_cost: costs.0,
                test_cost: costs.1,
            };
            f(&ctx)
        }

        fn select<S: SearchStrategy<&'static str>>(
            &self,
            s: &S,
            current: Option<usize>,
            costs: (Option<f64>, Option<f64>),
        ) -> usize {
            self.with_ctx(current, costs, |ctx| s.select(ctx))
        }
    }

    /// a: [F, F], b: [T, F], c: [T, T].
    fn split_history() -> Vec<O<&'static str>> {
        vec![
            O::fail("a"),
            O::fail("a"),
            O::pass("b"),
            O::fail("b"),
            O::pass("c"),
            O::pass("c"),
        ]
    }

    /// `(baseline - (a * w + b * (1 - w)))^2` computed from the summary directly.
    fn hand_reward(ctx: &SelectionContext<'_, &'static str>, v: usize, w: f64) -> f64 {
        let baseline = ctx
            .estimator
            .posterior(ctx.summary)
            .best()
            .map(|(_, p)| p)
            .unwrap();
        let a = guess_probability(&ctx.summary.extended(v, true), ctx.estimator);
        let b = guess_probability(&ctx.summary.extended(v, false), ctx.estimator);
        (baseline - (a * w + b * (1.0 - w))).powi(2)
    }

    const KNOWN: (Option<f64>, Option<f64>) = (Some(10.0), Some(1.0));

    #[test]
    fn empty_history_starts_at_current_or_default() {
        let f = Fixture::new(vec!["a", "b", "c", "d", "e"], vec![]);
        assert_eq!(f.select(&RoundRobin, None, KNOWN), 0);
        assert_eq!(f.select(&RoundRobin, Some(3), KNOWN), 3);
        let ig = InformationGain::default();
        assert_eq!(f.select(&ig, None, KNOWN), 2);
        assert_eq!(f.select(&ig, Some(4), KNOWN), 4);
    }

    #[test]
    fn round_robin_stays_until_imbalance_exceeds_ratio() {
        let mut h = vec![O::pass("a"); 3];
        let f = Fixture::new(vec!["a", "b", "c"], h.clone());
        // Imbalance 3 with ratio ceil(3/1) = 3: stay.
        assert_eq!(f.select(&RoundRobin, Some(0), (Some(3.0), Some(1.0))), 0);
        // Ratio 2: switch to the least tested (lowest index on ties).
        assert_eq!(f.select(&RoundRobin, Some(0), (Some(2.0), Some(1.0))), 1);
        // No current version: always move to the least tested.
        assert_eq!(f.select(&RoundRobin, None, (Some(100.0), Some(1.0))), 1);

        h.push(O::fail("b"));
        let f = Fixture::new(vec!["a", "b", "c"], h);
        assert_eq!(f.select(&RoundRobin, Some(1), (None, None)), 2);
    }

    #[test]
    fn switch_penalty_handles_unknown_costs() {
        let ig = InformationGain::default();
        assert!((ig.switch_penalty(Some(10.0), Some(1.0)) - 1.9 * 11.0).abs() < 1e-12);
        assert!((ig.switch_penalty(None, Some(2.0)) - 1.9).abs() < 1e-12);
        assert!((ig.switch_penalty(Some(5.0), None) - 1.9).abs() < 1e-12);
        assert!((ig.switch_penalty(Some(5.0), Some(0.0)) - 1.9).abs() < 1e-12);
    }

    #[test]
    fn inertia_is_validated() {
        assert!(InformationGain::new(0.0).is_ok());
        assert!(InformationGain::new(1.0).is_ok());
        assert_eq!(
            InformationGain::new(1.5),
            Err(ConfigError::InvalidInertia(1.5))
        );
        assert!(InformationGain::new(f64::NAN).is_err());
        assert!(StrategyKind::InformationGain { inertia: -0.1 }
            .build::<&str>()
            .is_err());
    }

    #[test]
    fn rewards_match_laplace_weighted_lookahead() {
        let f = Fixture::new(vec!["a", "b", "c"], split_history());
        f.with_ctx(None, (None, None), |ctx| {
            let posterior = ctx.estimator.posterior(ctx.summary);
            let (_, baseline) = posterior.best().unwrap();
            assert!((baseline - 0.5).abs() < 1e-12);
            let ig = InformationGain::default();
            let rewards = ig.rewards(ctx);
            assert_eq!(rewards.len(), 3);
            for (v, &r) in rewards.iter().enumerate() {
                // 3 passes in 6 runs: (3 + 1) / (6 + 2).
                assert_eq!(InformationGain::branch_weight(ctx, &posterior, v), 0.5);
                let expected = hand_reward(ctx, v, 0.5);
                assert!((r - expected).abs() < 1e-15, "v={v}: {r} vs {expected}");
            }
            assert_eq!(ig.select(ctx), argmax_first(&rewards).unwrap());
        });
    }

    #[test]
    fn known_rates_weight_branches_by_posterior_side() {
        let problem = ProblemConfig::builder(vec!["a", "b", "c"])
            .with_known_success_rates(0.9, 0.1)
            .build()
            .unwrap();
        let f = Fixture::with_problem(problem, split_history());
        f.with_ctx(None, (None, None), |ctx| {
            let posterior = ctx.estimator.posterior(ctx.summary);
            let p = posterior.as_slice();
            let blend = |p_before: f64| p_before * 0.9 + (1.0 - p_before) * 0.1;

            // First version sits left of every change.
            let first = InformationGain::branch_weight(ctx, &posterior, 0);
            let p_all: f64 = p.iter().sum();
            assert!((first - blend(p_all.clamp(0.0, 1.0))).abs() < 1e-15);
            assert!((first - 0.9).abs() < 1e-9);

            // Middle version: only the last change puts it before the change.
            let middle = InformationGain::branch_weight(ctx, &posterior, 1);
            assert!((middle - blend(p[1])).abs() < 1e-15);
            assert!((middle - 0.5).abs() < 1e-12);

            // Last version is after every change.
            assert_eq!(InformationGain::branch_weight(ctx, &posterior, 2), 0.1);

            let rewards = InformationGain::default().rewards(ctx);
            for (v, w) in [(0, first), (1, middle), (2, 0.1)] {
                let expected = hand_reward(ctx, v, w);
                assert!((rewards[v] - expected).abs() < 1e-15, "v={v}");
            }
        });
    }

    #[test]
    fn active_version_reward_is_amplified() {
        // One-sided history: every version has the same reward.
        let h = vec![O::pass("a")];
        let f = Fixture::new(vec!["a", "b", "c", "d"], h);
        let ig = InformationGain::default();
        let picked = f.select(&ig, Some(2), KNOWN);
        let r = f.with_ctx(Some(2), KNOWN, |ctx| ig.rewards(ctx));
        assert!(r.iter().all(|x| *x == r[0]), "{r:?}");
        let expected = if r[0] > 0.0 { 2 } else { 0 };
        assert_eq!(picked, expected);
    }

    #[test]
    fn argmax_prefers_first_and_skips_nan() {
        assert_eq!(argmax_first(&[1.0, 3.0, 3.0]), Some(1));
        assert_eq!(argmax_first(&[0.0, 0.0]), Some(0));
        assert_eq!(argmax_first(&[f64::NAN, 0.5]), Some(1));
        assert_eq!(argmax_first(&[]), None);
    }

    #[test]
    fn kinds_build_named_strategies() {
        let s = StrategyKind::RoundRobin.build::<&str>().unwrap();
        assert_eq!(s.name(), "round-robin");
        let s = StrategyKind::default().build::<&str>().unwrap();
        assert_eq!(s.name(), "information-gain");
    }
}
