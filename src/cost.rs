//! Setup/test cost estimates, threaded through the search loop as plain values.
//!
//! A cost is either known up front (from the problem config) or estimated as the running
//! mean of measured durations, in seconds.  Updating returns a new value; nothing here is
//! hidden mutable state.

use std::time::Duration;

use crate::problem::{ProblemConfig, Version};

/// One cost: known, or a running mean of observed samples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostEstimate {
    /// Current estimate; `None` until known or first measured.
    pub value: Option<f64>,
    /// Whether `value` came from configuration (samples are then ignored).
    pub known: bool,
    /// Number of measured samples folded into `value`.
    pub samples: u64,
}

impl CostEstimate {
    pub fn known(value: f64) -> Self {
        Self {
            value: Some(value),
            known: true,
            samples: 0,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    fn from_option(value: Option<f64>) -> Self {
        value.map(Self::known).unwrap_or_default()
    }

    /// Fold in one measured sample: `(old * n + sample) / (n + 1)`.
    ///
    /// The first sample is taken as is.  Known costs are returned unchanged.
    #[must_use]
    pub fn observe(self, sample: f64) -> Self {
        if self.known {
            return self;
        }
        let value = match self.value {
            Some(old) if self.samples > 0 => {
                let n = self.samples as f64;
                (old * n + sample) / (n + 1.0)
            }
            _ => sample,
        };
        Self {
            value: Some(value),
            known: false,
            samples: self.samples + 1,
        }
    }

    #[must_use]
    pub fn observe_duration(self, d: Duration) -> Self {
        self.observe(d.as_secs_f64())
    }
}

/// Setup and test cost estimates for one run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostEstimates {
    pub setup: CostEstimate,
    pub test: CostEstimate,
}

impl CostEstimates {
    /// Seed from the known costs of `problem` (if any).
    pub fn from_problem<V: Version>(problem: &ProblemConfig<V>) -> Self {
        Self {
            setup: CostEstimate::from_option(problem.known_setup_cost()),
            test: CostEstimate::from_option(problem.known_test_cost()),
        }
    }

    pub fn setup_cost(&self) -> Option<f64> {
        self.setup.value
    }

    pub fn test_cost(&self) -> Option<f64> {
        self.test.value
    }

    pub fn cost_ratio(&self) -> u64 {
        cost_ratio(self.setup.value, self.test.value)
    }
}

/// `ceil(setup / test)`, or 1 when either cost is unknown or the test cost is not positive.
pub fn cost_ratio(setup: Option<f64>, test: Option<f64>) -> u64 {
    match (setup, test) {
        (Some(s), Some(t)) if t > 0.0 && s.is_finite() && s >= 0.0 => (s / t).ceil() as u64,
        _ => 1,
    }
}
