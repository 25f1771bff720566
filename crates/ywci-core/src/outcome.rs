//! Check outcomes and skip-list gating.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tri-state result of a check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failure,
    Skipped,
}

impl Outcome {
    /// Map a process exit code to an outcome (0 = ok).
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Outcome::Ok
        } else {
            Outcome::Failure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Failure => "failure",
            Outcome::Skipped => "skipped",
        }
    }

    /// Derive the overall status of a sequence of outcomes.
    ///
    /// Any failure wins, then any skip, otherwise ok. An empty sequence is ok.
    pub fn overall<'a, I>(outcomes: I) -> Outcome
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        let mut any_skipped = false;
        for outcome in outcomes {
            match outcome {
                Outcome::Failure => return Outcome::Failure,
                Outcome::Skipped => any_skipped = true,
                Outcome::Ok => {}
            }
        }
        if any_skipped {
            Outcome::Skipped
        } else {
            Outcome::Ok
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of check names to bypass for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet {
    names: BTreeSet<String>,
}

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a space-separated list of check names. Empty tokens are dropped.
    pub fn parse(raw: &str) -> Self {
        raw.split_whitespace().map(str::to_string).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl FromIterator<String> for SkipSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for SkipSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}
