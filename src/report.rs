//! Text progress view of a history: per-version and per-change sparklines.
//!
//! Everything is derived from a [`HistorySummary`] (plus the estimator, for the score and
//! posterior rows), so the view can be re-rendered after any probe.

use std::fmt::{self, Write as _};

use crate::estimator::ChangeLikelihoodEstimator;
use crate::problem::Change;
use crate::summary::HistorySummary;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Width of the title column on the left.
const TITLE_WIDTH: usize = 20;
/// Minimum width of the "(after) " title on two-graph rows.
const SECOND_TITLE_WIDTH: usize = 8;
/// Change names longer than this are shortened in the header.
const MAX_LABEL: usize = 24;

/// One character per value, scaled from 0 to the largest value.  `None` renders as a space.
pub fn sparkline(values: &[Option<f64>]) -> String {
    let max = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    values
        .iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => {
                let level = (v.max(0.0) / max * (BARS.len() - 1) as f64).round() as usize;
                BARS[level.min(BARS.len() - 1)]
            }
            _ => ' ',
        })
        .collect()
}

fn counts(values: impl IntoIterator<Item = u64>) -> Vec<Option<f64>> {
    values.into_iter().map(|v| Some(v as f64)).collect()
}

fn right_justify(title: &str, width: usize) -> String {
    format!("{title:>width$}")
}

/// Render the full view.
///
/// ```text
///                     a
///                     |b
///                     ||c
///         Successes: ▁▄█
///          Failures: █▄▁
/// ```
///
/// followed by the per-change rows (side sums, side rates, scores, posterior).
pub fn render<V: fmt::Display>(
    summary: &HistorySummary<'_, V>,
    estimator: &ChangeLikelihoodEstimator,
) -> String {
    let versions = summary.versions();
    let n_changes = summary.num_changes();
    let labels: Vec<String> = (0..n_changes)
        .map(|i| {
            Change {
                index: i,
                before: &versions[i],
                after: &versions[i + 1],
            }
            .label(MAX_LABEL)
        })
        .collect();

    let hangover = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let second_indent = TITLE_WIDTH + n_changes + hangover.max(SECOND_TITLE_WIDTH + 1);
    let indent = " ".repeat(TITLE_WIDTH);

    let mut out = String::new();
    for (i, v) in versions.iter().enumerate() {
        let _ = writeln!(out, "{indent}{}{v}", "|".repeat(i));
    }
    let _ = writeln!(
        out,
        "{}{}",
        right_justify("Successes: ", TITLE_WIDTH),
        sparkline(&counts(summary.success_counts().iter().copied()))
    );
    let _ = writeln!(
        out,
        "{}{}",
        right_justify("Failures: ", TITLE_WIDTH),
        sparkline(&counts(summary.failure_counts().iter().copied()))
    );
    out.push('\n');

    for (i, label) in labels.iter().enumerate() {
        let mut line = format!("{indent}{}{label}", "|".repeat(i));
        let pad = second_indent.saturating_sub(line.chars().count());
        let _ = write!(line, "{}{}{label}", " ".repeat(pad), "|".repeat(i));
        let _ = writeln!(out, "{line}");
    }

    let two_graph = |out: &mut String, first: &str, a: &[Option<f64>], b: &[Option<f64>]| {
        let mut line = right_justify(first, TITLE_WIDTH);
        line.push_str(&sparkline(a));
        let width = second_indent.saturating_sub(line.chars().count());
        line.push_str(&right_justify("(after) ", width));
        line.push_str(&sparkline(b));
        let _ = writeln!(out, "{line}");
    };

    let changes = 0..n_changes;
    two_graph(
        &mut out,
        "Successes (before) ",
        &counts(changes.clone().map(|c| summary.left_sum_successes(c))),
        &counts(changes.clone().map(|c| summary.right_sum_successes(c))),
    );
    two_graph(
        &mut out,
        "Failures (before) ",
        &counts(changes.clone().map(|c| summary.left_sum_failures(c))),
        &counts(changes.clone().map(|c| summary.right_sum_failures(c))),
    );
    let rates: Vec<(Option<f64>, Option<f64>)> =
        changes.clone().map(|c| summary.side_rates(c)).collect();
    two_graph(
        &mut out,
        "Succ. rate (before) ",
        &rates.iter().map(|r| r.0).collect::<Vec<_>>(),
        &rates.iter().map(|r| r.1).collect::<Vec<_>>(),
    );
    out.push('\n');

    let scores = estimator.scores(summary);
    let posterior = estimator.posterior(summary);
    let mut line = right_justify("score: ", TITLE_WIDTH);
    line.push_str(&sparkline(
        &scores.iter().map(|s| Some(*s)).collect::<Vec<_>>(),
    ));
    let width = second_indent.saturating_sub(line.chars().count());
    line.push_str(&right_justify("probs: ", width));
    line.push_str(&sparkline(
        &posterior.as_slice().iter().map(|p| Some(*p)).collect::<Vec<_>>(),
    ));
    let _ = writeln!(out, "{line}");
    out
}
