//! A small describe/it runner.
//!
//! Groups and cases are registered with [`describe`] and [`it`], collected in
//! a [`Suite`], and executed with [`run`] or a configured [`Runner`]. Each case
//! body gets a fresh [`Scope`] to assert through; a mismatch, a returned
//! error or a panic fails that case only.

pub mod expectations;
pub mod report;
pub mod runner;
pub mod scope;
pub mod shard;
pub mod tree;
pub mod value;

pub use expectations::{ExpectationKind, Expectations};
pub use report::{CaseOutcome, CaseReport, FailOn, Report, Summary, REPORT_SCHEMA_VERSION};
pub use runner::{run, summarize, Filter, RunOptions, Runner};
pub use scope::{any, CaseResult, Expected, Failure, Matcher, Scope};
pub use shard::Shard;
pub use tree::{describe, it, Node, Suite};
pub use value::{arg, arg_or, function, Callable, Value, ValueKind};
