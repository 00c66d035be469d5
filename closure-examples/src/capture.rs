//! Closure constructors the "Closures" examples are written against.
//!
//! Every constructor call builds a new environment. Closures returned from
//! one call share it; closures from different calls never do.

use example_runner::{function, Value};
use std::cell::Cell;
use std::rc::Rc;

/// Returns a procedure that always yields `value`.
pub fn make_constant<T: Clone>(value: T) -> impl Fn() -> T {
  move || value.clone()
}

/// Returns a counter owning its count: each call bumps and returns it.
pub fn make_count_fn() -> impl FnMut() -> u32 {
  let mut count = 0;
  move || {
    count += 1;
    count
  }
}

/// Two procedures over one shared count.
pub struct CounterPair {
  pub increment: Box<dyn Fn()>,
  pub read: Box<dyn Fn() -> u32>,
}

pub fn make_counter() -> CounterPair {
  let count = Rc::new(Cell::new(0u32));
  let shared = Rc::clone(&count);
  CounterPair {
    increment: Box::new(move || shared.set(shared.get() + 1)),
    read: Box::new(move || count.get()),
  }
}

/// Opaque counter handle. The count is only reachable through the methods.
#[derive(Debug, Default)]
pub struct CounterModule {
  count: Cell<i64>,
}

impl CounterModule {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn incr(&self) {
    self.count.set(self.count.get() + 1);
  }

  pub fn decr(&self) {
    self.count.set(self.count.get() - 1);
  }

  pub fn get(&self) -> i64 {
    self.count.get()
  }
}

/// The same module as a dynamic record: `incr`, `decr` and `get` members
/// closing over one count, and nothing else.
pub fn counter_module() -> Value {
  let count = Rc::new(Cell::new(0i64));
  let (incr, decr, get) = (Rc::clone(&count), Rc::clone(&count), count);
  Value::object([
    (
      "incr",
      function(0, move |_| {
        incr.set(incr.get() + 1);
        Ok(Value::Undefined)
      }),
    ),
    (
      "decr",
      function(0, move |_| {
        decr.set(decr.get() - 1);
        Ok(Value::Undefined)
      }),
    ),
    ("get", function(0, move |_| Ok(Value::from(get.get())))),
  ])
}

/// Object counterpart of [`make_count_fn`]: same behavior, public state.
#[derive(Debug, Default)]
pub struct Counter {
  pub count: u32,
}

impl Counter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn increment(&mut self) -> u32 {
    self.count += 1;
    self.count
  }
}

pub type Constant = Box<dyn Fn() -> u32>;

/// Maps over `[1, 2, 3]`; every element gets its own binding.
pub fn make_constants_per_element() -> Vec<Constant> {
  [1u32, 2, 3]
    .into_iter()
    .map(|i| Box::new(move || i) as Constant)
    .collect()
}

/// A `while` loop whose three closures all capture the one loop counter.
/// By the time they are called the loop has left it at 3, so all yield 4.
pub fn make_constants_shared_binding() -> Vec<Constant> {
  let i = Rc::new(Cell::new(0u32));
  let mut result: Vec<Constant> = Vec::new();
  while i.get() < 3 {
    let captured = Rc::clone(&i);
    result.push(Box::new(move || captured.get() + 1));
    i.set(i.get() + 1);
  }
  result
}

/// The same loop with a fresh binding per iteration: yields 1, 2, 3.
pub fn make_constants_fresh_binding() -> Vec<Constant> {
  let mut result: Vec<Constant> = Vec::new();
  for i in 0..3u32 {
    result.push(Box::new(move || i + 1));
  }
  result
}
