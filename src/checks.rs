//! Named boolean checks and their aggregation.
//!
//! A check never aborts an iteration. Each predicate is evaluated on its own
//! and its outcome is tallied under its name; the `checks` metric is the
//! fraction of all predicate evaluations that passed.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Pass/fail counts for one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

impl CheckTally {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passes: 0,
            fails: 0,
        }
    }

    /// Total evaluations.
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

/// Aggregated check outcomes, shared by every virtual user.
#[derive(Debug, Default)]
pub struct CheckSet {
    tallies: Mutex<Vec<CheckTally>>,
}

impl CheckSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start evaluating checks against `target`.
    pub fn check<'a, T>(&'a self, target: &'a T) -> Check<'a, T> {
        Check {
            set: self,
            target,
            all_passed: true,
        }
    }

    /// Record one outcome for the named check.
    pub fn record(&self, name: &str, passed: bool) {
        let mut tallies = self.tallies.lock();
        let index = match tallies.iter().position(|t| t.name == name) {
            Some(index) => index,
            None => {
                tallies.push(CheckTally::new(name));
                tallies.len() - 1
            }
        };
        let tally = &mut tallies[index];
        if passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
    }

    /// Per-check tallies in first-seen order.
    pub fn tallies(&self) -> Vec<CheckTally> {
        self.tallies.lock().clone()
    }

    /// Total `(passes, evaluations)` across all checks.
    pub fn totals(&self) -> (u64, u64) {
        self.tallies
            .lock()
            .iter()
            .fold((0, 0), |(p, t), tally| (p + tally.passes, t + tally.total()))
    }

    /// Fraction of passing evaluations; `None` before any check ran.
    pub fn rate(&self) -> Option<f64> {
        match self.totals() {
            (_, 0) => None,
            (passes, total) => Some(passes as f64 / total as f64),
        }
    }
}

/// Builder evaluating a series of named predicates against one value.
pub struct Check<'a, T> {
    set: &'a CheckSet,
    target: &'a T,
    all_passed: bool,
}

impl<'a, T> Check<'a, T> {
    /// Evaluate `predicate` now and record the outcome under `name`.
    pub fn that(mut self, name: &str, predicate: impl FnOnce(&T) -> bool) -> Self {
        let passed = predicate(self.target);
        if !passed {
            debug!("check failed: {}", name);
        }
        self.set.record(name, passed);
        self.all_passed &= passed;
        self
    }

    /// Whether every predicate evaluated so far passed.
    pub fn passed(&self) -> bool {
        self.all_passed
    }
}
