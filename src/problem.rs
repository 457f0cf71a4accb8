//! Problem description: versions, observations, changes, and the validated search config.

use std::fmt;

use crate::error::{ConfigError, Result};

/// Minimum number of versions a search needs (two candidate changes).
pub const MIN_VERSIONS: usize = 3;

/// Opaque version token.
///
/// Only equality is required; "before" and "after" come from position in the
/// configured version list, never from the token itself.
pub trait Version: Clone + PartialEq + fmt::Debug {}

impl<T: Clone + PartialEq + fmt::Debug> Version for T {}

/// One recorded probe result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation<V> {
    /// Version the check ran against.
    pub version: V,
    /// Whether the check passed.
    pub outcome: bool,
    /// Cost charged for the check (known test cost, or the running estimate).
    pub cost: f64,
}

impl<V> Observation<V> {
    pub fn new(version: V, outcome: bool, cost: f64) -> Self {
        Self {
            version,
            outcome,
            cost,
        }
    }

    /// A passing observation with unit cost.
    pub fn pass(version: V) -> Self {
        Self::new(version, true, 1.0)
    }

    /// A failing observation with unit cost.
    pub fn fail(version: V) -> Self {
        Self::new(version, false, 1.0)
    }
}

/// A candidate boundary between two adjacent versions.
///
/// `index` is the position of `before` in the version list; `after` sits at `index + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Change<V> {
    pub index: usize,
    pub before: V,
    pub after: V,
}

impl<V: fmt::Display> Change<V> {
    /// Render as `before->after`, shortening the names with `…` to fit `max_len` characters
    /// where possible.
    ///
    /// The longer name is shortened first; if that is not enough, both are.
    pub fn label(&self, max_len: usize) -> String {
        let before = self.before.to_string();
        let after = self.after.to_string();
        let full = format!("{before}->{after}");
        if full.chars().count() <= max_len {
            return full;
        }
        let keep = max_len.saturating_sub(4) / 2;
        let before_len = before.chars().count();
        let after_len = after.chars().count();

        let (b, a) = if before_len > after_len {
            (shorten(&before, keep), after.clone())
        } else {
            (before.clone(), shorten(&after, keep))
        };
        let attempt = format!("{b}->{a}");
        if attempt.chars().count() <= max_len {
            return attempt;
        }
        format!("{}->{}", shorten(&before, keep), shorten(&after, keep))
    }
}

fn shorten(s: &str, keep: usize) -> String {
    if s.chars().count() <= keep {
        return s.to_string();
    }
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

impl<V: fmt::Display> fmt::Display for Change<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.before, self.after)
    }
}

/// Unvalidated problem description; call [`ProblemConfigBuilder::build`] to validate.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProblemConfigBuilder<V> {
    pub versions: Vec<V>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub initial_version: Option<V>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub known_setup_cost: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub known_test_cost: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub known_success_before: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub known_success_after: Option<f64>,
}

impl<V: Version> ProblemConfigBuilder<V> {
    pub fn new(versions: Vec<V>) -> Self {
        Self {
            versions,
            initial_version: None,
            known_setup_cost: None,
            known_test_cost: None,
            known_success_before: None,
            known_success_after: None,
        }
    }

    /// Version that is already set up (no setup is charged to test it first).
    pub fn with_initial_version(mut self, v: V) -> Self {
        self.initial_version = Some(v);
        self
    }

    /// Fixed cost of switching to a version; skips runtime estimation.
    pub fn with_known_setup_cost(mut self, cost: f64) -> Self {
        self.known_setup_cost = Some(cost);
        self
    }

    /// Fixed cost of running the check once; skips runtime estimation.
    pub fn with_known_test_cost(mut self, cost: f64) -> Self {
        self.known_test_cost = Some(cost);
        self
    }

    /// Known pass rates before and after the (unknown) change point.
    pub fn with_known_success_rates(mut self, before: f64, after: f64) -> Self {
        self.known_success_before = Some(before);
        self.known_success_after = Some(after);
        self
    }

    pub fn build(self) -> Result<ProblemConfig<V>> {
        if self.versions.len() < MIN_VERSIONS {
            return Err(ConfigError::TooFewVersions {
                required: MIN_VERSIONS,
                actual: self.versions.len(),
            });
        }
        for (second, v) in self.versions.iter().enumerate() {
            if let Some(first) = self.versions[..second].iter().position(|u| u == v) {
                return Err(ConfigError::DuplicateVersion { first, second });
            }
        }
        let initial_index = match &self.initial_version {
            Some(v) => Some(
                self.versions
                    .iter()
                    .position(|u| u == v)
                    .ok_or(ConfigError::UnknownCurrentVersion)?,
            ),
            None => None,
        };
        check_probability("known_success_before", self.known_success_before)?;
        check_probability("known_success_after", self.known_success_after)?;
        if let Some(c) = self.known_setup_cost {
            if !(c.is_finite() && c >= 0.0) {
                return Err(ConfigError::InvalidSetupCost(c));
            }
        }
        if let Some(c) = self.known_test_cost {
            if !(c.is_finite() && c > 0.0) {
                return Err(ConfigError::InvalidTestCost(c));
            }
        }

        Ok(ProblemConfig {
            versions: self.versions,
            initial_index,
            known_setup_cost: self.known_setup_cost,
            known_test_cost: self.known_test_cost,
            known_success_before: self.known_success_before,
            known_success_after: self.known_success_after,
        })
    }
}

fn check_probability(name: &'static str, p: Option<f64>) -> Result<()> {
    match p {
        Some(value) if !(0.0..=1.0).contains(&value) => {
            Err(ConfigError::ProbabilityOutOfRange { name, value })
        }
        _ => Ok(()),
    }
}

/// Validated, immutable description of one search.
///
/// The mutable "current version" cursor is not stored here: the runner owns it and
/// starts it at [`ProblemConfig::initial_version`].
#[derive(Debug, Clone)]
pub struct ProblemConfig<V> {
    versions: Vec<V>,
    initial_index: Option<usize>,
    known_setup_cost: Option<f64>,
    known_test_cost: Option<f64>,
    known_success_before: Option<f64>,
    known_success_after: Option<f64>,
}

impl<V: Version> ProblemConfig<V> {
    /// Start a builder over `versions` (ordered oldest to newest).
    pub fn builder(versions: Vec<V>) -> ProblemConfigBuilder<V> {
        ProblemConfigBuilder::new(versions)
    }

    /// Validate a config with no optional knowns.
    pub fn new(versions: Vec<V>) -> Result<Self> {
        ProblemConfigBuilder::new(versions).build()
    }

    pub fn versions(&self) -> &[V] {
        &self.versions
    }

    /// Position of `v` in the version list.
    pub fn index_of(&self, v: &V) -> Option<usize> {
        self.versions.iter().position(|u| u == v)
    }

    /// Number of candidate changes (`versions - 1`).
    pub fn num_changes(&self) -> usize {
        self.versions.len() - 1
    }

    /// The change between `versions[index]` and `versions[index + 1]`.
    pub fn change(&self, index: usize) -> Option<Change<V>> {
        let before = self.versions.get(index)?;
        let after = self.versions.get(index + 1)?;
        Some(Change {
            index,
            before: before.clone(),
            after: after.clone(),
        })
    }

    /// Every adjacent change, in version order.
    pub fn changes(&self) -> Vec<Change<V>> {
        (0..self.num_changes())
            .filter_map(|i| self.change(i))
            .collect()
    }

    pub fn initial_version(&self) -> Option<&V> {
        self.initial_index.map(|i| &self.versions[i])
    }

    pub fn known_setup_cost(&self) -> Option<f64> {
        self.known_setup_cost
    }

    pub fn known_test_cost(&self) -> Option<f64> {
        self.known_test_cost
    }

    pub fn known_success_before(&self) -> Option<f64> {
        self.known_success_before
    }

    pub fn known_success_after(&self) -> Option<f64> {
        self.known_success_after
    }

    /// Both prior pass rates, when both are known.
    pub fn known_success_rates(&self) -> Option<(f64, f64)> {
        Some((self.known_success_before?, self.known_success_after?))
    }
}
