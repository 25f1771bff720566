//! Pure tool-output parsers.
//!
//! Each parser turns raw output (already captured by the process boundary)
//! into [`Finding`](crate::finding::Finding)s. None of them spawn anything or
//! talk to the host.

pub mod advisories;
pub mod eslint;
pub mod lines;
pub mod pip_audit;
pub mod pylint;
pub mod yarn_audit;

pub use advisories::{AdvisoryLedger, Verdict};
