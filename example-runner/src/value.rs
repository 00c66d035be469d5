//! Dynamic values observed by example bodies.
//!
//! The model is deliberately small: enough to talk about arity mismatch,
//! `undefined`, record literals and callables without an interpreter. Arrays
//! and objects are shared behind `Rc`, so they have an identity that
//! [`Value::same_value`] can observe while [`Value::deep_equals`] ignores it.

use crate::scope::Failure;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, Failure>;

#[derive(Clone)]
pub enum Value {
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(Rc<str>),
  Array(Rc<Vec<Value>>),
  Object(Rc<BTreeMap<String, Value>>),
  Callable(Callable),
}

/// Capability tag of a value. `any(ValueKind::Callable)` is how an example
/// asserts "this is a function" without comparing bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
  Undefined,
  Null,
  Boolean,
  Number,
  String,
  Array,
  Object,
  Callable,
}

impl fmt::Display for ValueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ValueKind::Undefined => "undefined",
      ValueKind::Null => "null",
      ValueKind::Boolean => "boolean",
      ValueKind::Number => "number",
      ValueKind::String => "string",
      ValueKind::Array => "array",
      ValueKind::Object => "object",
      ValueKind::Callable => "function",
    })
  }
}

/// A callable value: a native closure plus the declared parameter count.
///
/// Invocation never checks the argument count. Missing arguments read as
/// `undefined` through [`arg`], extra ones are simply never looked at.
#[derive(Clone)]
pub struct Callable {
  name: Option<Rc<str>>,
  arity: usize,
  func: Rc<NativeFn>,
}

impl Callable {
  pub fn new(arity: usize, func: impl Fn(&[Value]) -> Result<Value, Failure> + 'static) -> Self {
    Self {
      name: None,
      arity,
      func: Rc::new(func),
    }
  }

  pub fn named(
    name: &str,
    arity: usize,
    func: impl Fn(&[Value]) -> Result<Value, Failure> + 'static,
  ) -> Self {
    Self {
      name: Some(Rc::from(name)),
      arity,
      func: Rc::new(func),
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// Declared parameter count (the `length` of the function).
  pub fn arity(&self) -> usize {
    self.arity
  }

  pub fn call(&self, args: &[Value]) -> Result<Value, Failure> {
    (self.func)(args)
  }

  /// Identity comparison. Only the data pointer is compared; vtable pointers
  /// for the same closure type are not guaranteed unique.
  pub fn ptr_eq(&self, other: &Callable) -> bool {
    std::ptr::eq(
      Rc::as_ptr(&self.func).cast::<()>(),
      Rc::as_ptr(&other.func).cast::<()>(),
    )
  }
}

/// Shorthand for an anonymous callable value.
pub fn function(
  arity: usize,
  func: impl Fn(&[Value]) -> Result<Value, Failure> + 'static,
) -> Value {
  Value::Callable(Callable::new(arity, func))
}

/// Reads argument `idx`, or `undefined` when the caller passed fewer.
pub fn arg(args: &[Value], idx: usize) -> Value {
  args.get(idx).cloned().unwrap_or(Value::Undefined)
}

/// Reads argument `idx`, substituting `default` when it is missing or
/// explicitly `undefined`.
pub fn arg_or(args: &[Value], idx: usize, default: impl Into<Value>) -> Value {
  match arg(args, idx) {
    Value::Undefined => default.into(),
    value => value,
  }
}

impl Value {
  pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
    Value::Array(Rc::new(items.into_iter().collect()))
  }

  pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
    Value::Object(Rc::new(
      entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    ))
  }

  pub fn kind(&self) -> ValueKind {
    match self {
      Value::Undefined => ValueKind::Undefined,
      Value::Null => ValueKind::Null,
      Value::Bool(_) => ValueKind::Boolean,
      Value::Number(_) => ValueKind::Number,
      Value::String(_) => ValueKind::String,
      Value::Array(_) => ValueKind::Array,
      Value::Object(_) => ValueKind::Object,
      Value::Callable(_) => ValueKind::Callable,
    }
  }

  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  /// Property read. Anything that is not an own member reads as `undefined`;
  /// arrays answer numeric indices and `length`, callables answer `length`
  /// and `name`.
  pub fn get(&self, key: &str) -> Value {
    match self {
      Value::Object(entries) => entries.get(key).cloned().unwrap_or(Value::Undefined),
      Value::Array(items) => {
        if key == "length" {
          return Value::from(items.len());
        }
        key
          .parse::<usize>()
          .ok()
          .and_then(|idx| items.get(idx).cloned())
          .unwrap_or(Value::Undefined)
      }
      Value::String(s) if key == "length" => Value::from(s.encode_utf16().count()),
      Value::Callable(callable) => match key {
        "length" => Value::from(callable.arity()),
        "name" => Value::from(callable.name().unwrap_or("")),
        _ => Value::Undefined,
      },
      _ => Value::Undefined,
    }
  }

  /// Calls the value, failing the same way a host would when it is not a
  /// function.
  pub fn call(&self, args: &[Value]) -> Result<Value, Failure> {
    match self {
      Value::Callable(callable) => callable.call(args),
      other => Err(Failure::thrown(format!(
        "TypeError: {other} is not a function"
      ))),
    }
  }

  /// Calls the member `key` of this value.
  pub fn invoke(&self, key: &str, args: &[Value]) -> Result<Value, Failure> {
    match self.get(key) {
      Value::Callable(callable) => callable.call(args),
      _ => Err(Failure::thrown(format!(
        "TypeError: {self}.{key} is not a function"
      ))),
    }
  }

  pub fn to_number(&self) -> f64 {
    match self {
      Value::Undefined => f64::NAN,
      Value::Null => 0.0,
      Value::Bool(b) => f64::from(u8::from(*b)),
      Value::Number(n) => *n,
      Value::String(s) => {
        let trimmed = s.trim();
        if trimmed.is_empty() {
          0.0
        } else {
          trimmed.parse().unwrap_or(f64::NAN)
        }
      }
      Value::Array(_) | Value::Object(_) | Value::Callable(_) => f64::NAN,
    }
  }

  /// The `+` operator: string concatenation when either side is a string,
  /// numeric addition otherwise.
  pub fn add(&self, other: &Value) -> Value {
    match (self, other) {
      (Value::String(_), _) | (_, Value::String(_)) => Value::from(format!("{self}{other}")),
      _ => Value::Number(self.to_number() + other.to_number()),
    }
  }

  pub fn gt(&self, other: &Value) -> bool {
    self.to_number() > other.to_number()
  }

  /// Structural equality. Primitives compare by value, arrays and objects
  /// member by member, and any two callables are equal.
  pub fn deep_equals(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Array(a), Value::Array(b)) => {
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_equals(y))
      }
      (Value::Object(a), Value::Object(b)) => {
        a.len() == b.len()
          && a
            .iter()
            .all(|(key, x)| b.get(key).is_some_and(|y| x.deep_equals(y)))
      }
      (Value::Callable(_), Value::Callable(_)) => true,
      _ => false,
    }
  }

  /// Identity. NaN is the same as NaN, `0` and `-0` differ, composites and
  /// callables must be the very same allocation.
  pub fn same_value(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Number(a), Value::Number(b)) => {
        if a.is_nan() && b.is_nan() {
          return true;
        }
        a == b && a.is_sign_negative() == b.is_sign_negative()
      }
      (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
      (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
      (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
      (Value::Undefined | Value::Null | Value::Bool(_) | Value::String(_), _) => {
        self.deep_equals(other)
      }
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Undefined => f.write_str("undefined"),
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Number(n) if n.is_infinite() => {
        f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
      }
      Value::Number(n) => write!(f, "{n}"),
      Value::String(s) => write!(f, "{s}"),
      Value::Array(items) => {
        f.write_str("[")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{item:?}")?;
        }
        f.write_str("]")
      }
      Value::Object(entries) => {
        if entries.is_empty() {
          return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, (key, value)) in entries.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{key}: {value:?}")?;
        }
        f.write_str(" }")
      }
      Value::Callable(callable) => match callable.name() {
        Some(name) if !name.is_empty() => write!(f, "[Function: {name}]"),
        _ => f.write_str("[Function (anonymous)]"),
      },
    }
  }
}

/// Like `Display`, but strings are quoted so `"3"` and `3` stay apart in
/// failure messages.
impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(s) => write!(f, "{:?}", &**s),
      other => fmt::Display::fmt(other, f),
    }
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Number(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Number(f64::from(value))
  }
}

impl From<u32> for Value {
  fn from(value: u32) -> Self {
    Value::Number(f64::from(value))
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Number(value as f64)
  }
}

impl From<usize> for Value {
  fn from(value: usize) -> Self {
    Value::Number(value as f64)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(Rc::from(value))
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(Rc::from(value))
  }
}

impl From<Callable> for Value {
  fn from(value: Callable) -> Self {
    Value::Callable(value)
  }
}

impl From<Vec<Value>> for Value {
  fn from(value: Vec<Value>) -> Self {
    Value::Array(Rc::new(value))
  }
}

impl From<()> for Value {
  fn from(_: ()) -> Self {
    Value::Undefined
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Value::Undefined)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(hello: &str) -> Value {
    Value::object([("hello", Value::from(hello))])
  }

  #[test]
  fn deep_equality_ignores_identity() {
    let a = record("world");
    let b = record("world");
    assert!(a.deep_equals(&b));
    assert!(!a.same_value(&b));
    assert!(a.same_value(&a.clone()));
    assert!(!a.deep_equals(&record("you")));
  }

  #[test]
  fn callables_are_equal_by_capability_only() {
    let incr = function(1, |args| Ok(arg(args, 0).add(&Value::from(1))));
    let noop = function(0, |_| Ok(Value::Undefined));
    assert!(incr.deep_equals(&noop));
    assert!(!incr.same_value(&noop));
    assert!(incr.same_value(&incr.clone()));
    assert!(!incr.deep_equals(&Value::from(1)));
  }

  #[test]
  fn number_identity_follows_same_value() {
    assert!(Value::from(f64::NAN).same_value(&Value::from(f64::NAN)));
    assert!(!Value::from(0.0).same_value(&Value::from(-0.0)));
    assert!(Value::from(0.0).deep_equals(&Value::from(-0.0)));
    assert!(Value::from(3).same_value(&Value::from(3.0)));
  }

  #[test]
  fn missing_arguments_and_members_read_as_undefined() {
    assert!(arg(&[], 0).is_undefined());
    assert!(arg_or(&[Value::Undefined], 0, 3).same_value(&Value::from(3)));
    assert!(arg_or(&[Value::Null], 0, 3).same_value(&Value::Null));
    assert!(record("x").get("missing").is_undefined());
    assert!(Value::from(4).get("count").is_undefined());
    let f = Callable::named("twice", 2, |_| Ok(Value::Undefined));
    assert!(Value::from(f.clone()).get("length").same_value(&Value::from(2)));
    assert!(Value::from(f).get("name").same_value(&Value::from("twice")));
  }

  #[test]
  fn add_concatenates_strings_and_sums_numbers() {
    assert!(Value::from(2).add(&Value::from(3)).same_value(&Value::from(5)));
    assert!(Value::from("a").add(&Value::from(1)).same_value(&Value::from("a1")));
    assert!(Value::from(1).add(&Value::Undefined).to_number().is_nan());
  }

  #[test]
  fn calling_a_non_callable_fails() {
    let err = Value::from(3).call(&[]).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: 3 is not a function");
    let err = record("x").invoke("incr", &[]).unwrap_err();
    assert!(err.to_string().contains("incr is not a function"));
  }

  #[test]
  fn display_is_readable() {
    assert_eq!(record("world").to_string(), r#"{ hello: "world" }"#);
    assert_eq!(
      Value::array([Value::from(1), Value::from("2")]).to_string(),
      r#"[1, "2"]"#
    );
    assert_eq!(Value::from(2.5).to_string(), "2.5");
    assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");
    assert_eq!(
      function(0, |_| Ok(Value::Undefined)).to_string(),
      "[Function (anonymous)]"
    );
  }
}
