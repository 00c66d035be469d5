use crate::capture::{
  counter_module, make_constant, make_constants_fresh_binding, make_constants_per_element,
  make_constants_shared_binding, make_count_fn, make_counter, Counter, CounterModule,
};
use example_runner::{describe, function, it, Node, Value};
use std::cell::RefCell;

/// A closure counter wrapped as a dynamic callable, so its (missing)
/// properties can be inspected like any other value.
fn count_fn_value() -> Value {
  let counter = RefCell::new(make_count_fn());
  function(0, move |_| {
    let mut next = counter.borrow_mut();
    Ok(Value::from((*next)()))
  })
}

pub fn group() -> Node {
  describe(
    "Closures",
    vec![
      it("inner functions can use parent arguments", |cx| {
        let six = make_constant(6);
        cx.expect_same(six(), 6)
      }),
      it("inner functions can use parent variables", |cx| {
        let mut count_guests = make_count_fn();
        cx.expect_same(count_guests(), 1)
      }),
      it(
        "each time that a parent is called a new set of variables is created",
        |cx| {
          let mut count_guests = make_count_fn();
          let mut count_audience = make_count_fn();
          cx.expect_same(count_guests(), 1)?;
          cx.expect_same(count_guests(), 2)?;
          cx.expect_same(count_audience(), 1)?;
          cx.expect_same(count_guests(), 3)?;
          cx.expect_same(count_audience(), 2)
        },
      ),
      it("functions created together share one set of variables", |cx| {
        let guests = make_counter();
        (guests.increment)();
        (guests.increment)();
        cx.expect_same((guests.read)(), 2)?;

        let audience = make_counter();
        cx.expect_same((audience.read)(), 0)?;
        (audience.increment)();
        cx.expect_same((audience.read)(), 1)?;
        cx.expect_same((guests.read)(), 2)
      }),
      it("reading without incrementing always returns the same value", |cx| {
        let counter = make_counter();
        (counter.increment)();
        for _ in 0..3 {
          cx.expect_same((counter.read)(), 1)?;
        }
        Ok(())
      }),
      it(
        "can be used to create objects with private variables (module pattern)",
        |cx| {
          let counter = counter_module();
          counter.invoke("incr", &[])?;
          counter.invoke("incr", &[])?;
          cx.expect_same(counter.invoke("get", &[])?, 2)?;
          cx.expect_same(counter.get("count"), Value::Undefined)
        },
      ),
      it("an opaque handle counts up and down through incr and decr", |cx| {
        let counter = CounterModule::new();
        counter.incr();
        counter.incr();
        cx.expect_same(counter.get(), 2)?;
        counter.decr();
        cx.expect_same(counter.get(), 1)?;
        counter.decr();
        counter.decr();
        cx.expect_same(counter.get(), -1)
      }),
      it("use array traversal high order functions", |cx| {
        let constants = make_constants_per_element();
        let [one, two, three] = constants.as_slice() else {
          return cx.fail(format!("expected 3 constants, got {}", constants.len()));
        };
        cx.expect_same(one(), 1)?;
        cx.expect_same(two(), 2)?;
        cx.expect_same(three(), 3)
      }),
      it("avoid loops: every closure sees the final loop value", |cx| {
        let constants = make_constants_shared_binding();
        let [one, two, three] = constants.as_slice() else {
          return cx.fail(format!("expected 3 constants, got {}", constants.len()));
        };
        cx.expect_same(one(), 4)?;
        cx.expect_same(two(), 4)?;
        cx.expect_same(three(), 4)
      }),
      it("a fresh binding per iteration keeps the iteration value", |cx| {
        let values: Vec<u32> = make_constants_fresh_binding().iter().map(|f| f()).collect();
        cx.expect_equal(
          Value::array(values.into_iter().map(Value::from)),
          Value::array([Value::from(1), Value::from(2), Value::from(3)]),
        )
      }),
      it("a closure is very similar to an object", |cx| {
        let mut count_guests = make_count_fn();
        let mut audience_counter = Counter::new();
        cx.expect_same(count_guests(), 1)?;
        cx.expect_same(audience_counter.increment(), 1)
      }),
      it("but closures has private variables", |cx| {
        let count_guests = count_fn_value();
        let audience_counter = Counter::new();
        cx.expect_same(count_guests.get("count"), Value::Undefined)?;
        cx.expect_same(audience_counter.count, 0)
      }),
    ],
  )
}
