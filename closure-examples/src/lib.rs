//! Executable examples of function forms, argument binding, default
//! parameters, higher-order functions and closures.
//!
//! [`suite`] assembles the "Functions" and "Closures" groups for the runner.
//! [`capture`] holds the closure constructors the closure examples observe.

pub mod capture;
pub mod closures;
pub mod functions;

use example_runner::Suite;

pub fn suite() -> Suite {
  Suite::new(vec![functions::group(), closures::group()])
}
