//! Accept-list bookkeeping shared by the dependency audits.
//!
//! An advisory is fatal unless one of its ids was explicitly accepted.
//! Accepted ids that never show up are reported so stale entries get cleaned.

use std::collections::HashSet;

/// What to do with an observed advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not accepted: fails the check.
    Fatal,
    /// Accepted through the given id, first sighting.
    Accepted(String),
    /// Already reported earlier in the same output.
    Duplicate,
}

/// Tracks accepted, seen and fatal advisories across one audit output.
#[derive(Debug, Clone, Default)]
pub struct AdvisoryLedger {
    accepted: Vec<String>,
    unseen_accepted: Vec<String>,
    found: HashSet<String>,
    fatal: bool,
}

impl AdvisoryLedger {
    pub fn new<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut distinct = HashSet::new();
        let accepted: Vec<String> = accepted
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.trim().is_empty())
            .filter(|id| distinct.insert(id.clone()))
            .collect();
        Self {
            unseen_accepted: accepted.clone(),
            accepted,
            found: HashSet::new(),
            fatal: false,
        }
    }

    /// Observe an advisory identified by `id` (plus optional aliases).
    pub fn observe(&mut self, id: &str, aliases: &[String]) -> Verdict {
        if !self.found.insert(id.to_string()) {
            return Verdict::Duplicate;
        }

        let matched: Vec<String> = std::iter::once(id)
            .chain(aliases.iter().map(String::as_str))
            .filter(|candidate| self.accepted.iter().any(|a| a == candidate))
            .map(str::to_string)
            .collect();

        let Some(first) = matched.first().cloned() else {
            self.fatal = true;
            return Verdict::Fatal;
        };
        self.unseen_accepted.retain(|a| !matched.contains(a));
        Verdict::Accepted(first)
    }

    /// Whether any non-accepted advisory was observed.
    pub fn has_fatal(&self) -> bool {
        self.fatal
    }

    /// Accepted ids that did not match any observed advisory, in input order.
    pub fn unseen_accepted(&self) -> &[String] {
        &self.unseen_accepted
    }
}
