use crate::value::{Callable, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
  /// Identity, see [`Value::same_value`].
  ToBe,
  /// Structural equality, see [`Value::deep_equals`].
  ToEqual,
}

impl fmt::Display for Matcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Matcher::ToBe => "to be",
      Matcher::ToEqual => "to equal",
    })
  }
}

/// Right-hand side of `expect_equal`: a concrete value, or any value of a kind.
#[derive(Debug, Clone)]
pub enum Expected {
  Value(Value),
  Any(ValueKind),
}

pub fn any(kind: ValueKind) -> Expected {
  Expected::Any(kind)
}

impl Expected {
  fn matches(&self, actual: &Value) -> bool {
    match self {
      Expected::Value(expected) => actual.deep_equals(expected),
      Expected::Any(kind) => actual.kind() == *kind,
    }
  }
}

impl fmt::Display for Expected {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expected::Value(value) => write!(f, "{value:?}"),
      Expected::Any(kind) => write!(f, "<any {kind}>"),
    }
  }
}

macro_rules! expected_from {
  ($($ty:ty),* $(,)?) => {
    $(
      impl From<$ty> for Expected {
        fn from(value: $ty) -> Self {
          Expected::Value(Value::from(value))
        }
      }
    )*
  };
}

expected_from!(Value, bool, f64, i32, u32, i64, usize, &str, String, Callable, ());

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionRecord {
  pub matcher: Matcher,
  pub passed: bool,
  pub actual: String,
  pub expected: String,
}

/// Why a case body stopped early.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
  #[error("expected {actual} {matcher} {expected}")]
  Mismatch {
    matcher: Matcher,
    actual: String,
    expected: String,
  },

  /// The body raised an error of its own, e.g. calling something that is
  /// not a function.
  #[error("{0}")]
  Thrown(String),
}

impl Failure {
  pub fn thrown(message: impl Into<String>) -> Self {
    Failure::Thrown(message.into())
  }
}

pub type CaseResult = Result<(), Failure>;

/// Per-case assertion context. The runner creates a fresh one for every case
/// body, so nothing recorded here outlives the case.
#[derive(Debug, Default)]
pub struct Scope {
  assertions: Vec<AssertionRecord>,
}

impl Scope {
  pub fn new() -> Self {
    Self::default()
  }

  /// Asserts structural equality, or kind membership for [`any`].
  pub fn expect_equal(
    &mut self,
    actual: impl Into<Value>,
    expected: impl Into<Expected>,
  ) -> CaseResult {
    let actual = actual.into();
    let expected = expected.into();
    let passed = expected.matches(&actual);
    self.record(Matcher::ToEqual, passed, &actual, expected.to_string())
  }

  /// Asserts identity: same primitive value, or the same composite.
  pub fn expect_same(
    &mut self,
    actual: impl Into<Value>,
    expected: impl Into<Value>,
  ) -> CaseResult {
    let actual = actual.into();
    let expected = expected.into();
    let passed = actual.same_value(&expected);
    self.record(Matcher::ToBe, passed, &actual, format!("{expected:?}"))
  }

  pub fn fail(&self, message: impl Into<String>) -> CaseResult {
    Err(Failure::thrown(message))
  }

  pub fn assertions(&self) -> &[AssertionRecord] {
    &self.assertions
  }

  fn record(
    &mut self,
    matcher: Matcher,
    passed: bool,
    actual: &Value,
    expected: String,
  ) -> CaseResult {
    let record = AssertionRecord {
      matcher,
      passed,
      actual: format!("{actual:?}"),
      expected,
    };
    self.assertions.push(record.clone());
    if passed {
      return Ok(());
    }
    tracing::debug!(
      matcher = %matcher,
      actual = %record.actual,
      expected = %record.expected,
      "assertion failed"
    );
    Err(Failure::Mismatch {
      matcher,
      actual: record.actual,
      expected: record.expected,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::function;

  #[test]
  fn expect_equal_is_reflexive_for_distinct_composites() {
    let mut scope = Scope::new();
    let make = || Value::object([("hello", Value::from("world"))]);
    scope.expect_equal(make(), make()).unwrap();
    scope
      .expect_equal(Value::array([make(), Value::Null]), Value::array([make(), Value::Null]))
      .unwrap();
    assert_eq!(scope.assertions().len(), 2);
    assert!(scope.assertions().iter().all(|a| a.passed));
  }

  #[test]
  fn expect_same_rejects_distinct_composites() {
    let mut scope = Scope::new();
    let a = Value::array([Value::from(1)]);
    let b = Value::array([Value::from(1)]);
    let err = scope.expect_same(a.clone(), b).unwrap_err();
    assert_eq!(
      err,
      Failure::Mismatch {
        matcher: Matcher::ToBe,
        actual: "[1]".to_string(),
        expected: "[1]".to_string(),
      }
    );
    scope.expect_same(a.clone(), a).unwrap();
  }

  #[test]
  fn any_callable_checks_capability() {
    let mut scope = Scope::new();
    scope
      .expect_equal(function(0, |_| Ok(Value::Undefined)), any(ValueKind::Callable))
      .unwrap();
    let err = scope
      .expect_equal(Value::from(3), any(ValueKind::Callable))
      .unwrap_err();
    assert_eq!(err.to_string(), "expected 3 to equal <any function>");
  }

  #[test]
  fn mismatch_message_names_both_values() {
    let mut scope = Scope::new();
    let err = scope.expect_same(Value::Undefined, 3).unwrap_err();
    assert_eq!(err.to_string(), "expected undefined to be 3");
    let err = scope.expect_equal("3", 3).unwrap_err();
    assert_eq!(err.to_string(), r#"expected "3" to equal 3"#);
    let record = scope.assertions().last().unwrap();
    assert!(!record.passed);
    assert_eq!(record.matcher, Matcher::ToEqual);
  }
}
