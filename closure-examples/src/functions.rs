use example_runner::{
  any, arg, arg_or, describe, function, it, Callable, Failure, Node, Value, ValueKind,
};

fn three(_: &[Value]) -> Result<Value, Failure> {
  Ok(Value::from(3))
}

fn identity(args: &[Value]) -> Result<Value, Failure> {
  Ok(arg(args, 0))
}

fn sum(args: &[Value]) -> Result<Value, Failure> {
  Ok(arg(args, 0).add(&arg(args, 1)))
}

fn greeting(args: &[Value]) -> Result<Value, Failure> {
  Ok(Value::object([("hello", arg(args, 0))]))
}

fn at_least_three(args: &[Value]) -> Result<Value, Failure> {
  let a = arg(args, 0);
  if a.gt(&Value::from(3)) {
    return Ok(a);
  }
  Ok(Value::from(3))
}

fn twice() -> Value {
  function(2, |args| {
    let (f, value) = (arg(args, 0), arg(args, 1));
    let once = f.call(&[value])?;
    f.call(&[once])
  })
}

fn incr() -> Value {
  function(1, |args| Ok(arg(args, 0).add(&Value::from(1))))
}

fn double() -> Value {
  function(1, |args| Ok(Value::from(arg(args, 0).to_number() * 2.0)))
}

pub fn group() -> Node {
  describe(
    "Functions",
    vec![
      closure_notation(),
      record_members(),
      named_notation(),
      mismatching_arity(),
      default_arguments(),
      higher_order(),
    ],
  )
}

fn closure_notation() -> Node {
  describe(
    "closure notation",
    vec![
      it("|| {} is the shortest function", |cx| {
        cx.expect_equal(function(0, |_| Ok(Value::Undefined)), any(ValueKind::Callable))
      }),
      it("|a, b| {} accepts arguments", |cx| {
        cx.expect_equal(function(2, |_| Ok(Value::Undefined)), any(ValueKind::Callable))
      }),
      it("|a| {} takes a single argument", |cx| {
        cx.expect_equal(function(1, |_| Ok(Value::Undefined)), any(ValueKind::Callable))
      }),
      it("|| n returns n", |cx| {
        let f = function(0, |_| Ok(Value::from(3)));
        cx.expect_same(f.call(&[])?, 3)
      }),
      it("|n| n is identity", |cx| {
        let f = function(1, |args| Ok(arg(args, 0)));
        cx.expect_same(f.call(&[Value::from(5)])?, 5)
      }),
      it("|a, b| a + b sums two numbers", |cx| {
        let f = function(2, |args| Ok(arg(args, 0).add(&arg(args, 1))));
        cx.expect_same(f.call(&[Value::from(2), Value::from(3)])?, 5)
      }),
      it("|a| a record literal returns a fresh record", |cx| {
        let f = function(1, |args| Ok(Value::object([("hello", arg(args, 0))])));
        let world = f.call(&[Value::from("world")])?;
        cx.expect_equal(world.clone(), Value::object([("hello", Value::from("world"))]))?;
        cx.expect_equal(
          f.call(&[Value::from("you")])?,
          Value::object([("hello", Value::from("you"))]),
        )?;
        let again = f.call(&[Value::from("world")])?;
        cx.expect_equal(again.clone(), world.clone())?;
        cx.expect_same(again.same_value(&world), false)
      }),
      it("|a| { /* code */ } accepts any arbitrary code inside braces", |cx| {
        let f = function(1, |args| {
          let a = arg(args, 0);
          if a.gt(&Value::from(3)) {
            Ok(a)
          } else {
            Ok(Value::from(3))
          }
        });
        cx.expect_equal(f.call(&[Value::from(2)])?, 3)?;
        cx.expect_equal(f.call(&[Value::from(5)])?, 5)
      }),
    ],
  )
}

fn record_members() -> Node {
  describe(
    "object function shorthand",
    vec![
      it("a record member can be a function", |cx| {
        let object = Value::object([("incr", incr())]);
        cx.expect_equal(object.get("incr"), any(ValueKind::Callable))?;
        cx.expect_same(object.invoke("incr", &[Value::from(2)])?, 3)
      }),
      it("calling a member that is not a function throws", |cx| {
        let object = Value::object([("incr", Value::from(1))]);
        match object.invoke("incr", &[Value::from(2)]) {
          Err(Failure::Thrown(message)) => cx.expect_equal(
            message.contains("is not a function"),
            true,
          ),
          other => cx.fail(format!("expected a TypeError, got {other:?}")),
        }
      }),
    ],
  )
}

fn named_notation() -> Node {
  describe(
    "named fn notation",
    vec![
      it("fn() {} is a function", |cx| {
        cx.expect_equal(Callable::new(0, three), any(ValueKind::Callable))
      }),
      it("fn(a, b) {} accepts arguments", |cx| {
        cx.expect_equal(Callable::new(2, sum), any(ValueKind::Callable))
      }),
      it("fn(a) {} has no shorthand for one argument", |cx| {
        cx.expect_equal(Callable::new(1, identity), any(ValueKind::Callable))
      }),
      it("fn() { return n; } returns n", |cx| {
        cx.expect_same(Callable::new(0, three).call(&[])?, 3)
      }),
      it("fn name() { … } can be named", |cx| {
        let f = Value::from(Callable::named("three", 0, three));
        cx.expect_same(f.call(&[])?, 3)?;
        cx.expect_same(f.get("name"), "three")
      }),
      it("fn(n) { return n; } is identity", |cx| {
        cx.expect_same(Callable::new(1, identity).call(&[Value::from(5)])?, 5)
      }),
      it("fn(a, b) { return a + b; } sums two numbers", |cx| {
        cx.expect_same(
          Callable::new(2, sum).call(&[Value::from(2), Value::from(3)])?,
          5,
        )
      }),
      it("fn() { return record; } requires nothing special to return a record", |cx| {
        let f = Callable::new(1, greeting);
        cx.expect_equal(
          f.call(&[Value::from("world")])?,
          Value::object([("hello", Value::from("world"))]),
        )?;
        cx.expect_equal(
          f.call(&[Value::from("you")])?,
          Value::object([("hello", Value::from("you"))]),
        )
      }),
      it("fn() { /* code */ } accepts any arbitrary code inside braces", |cx| {
        let f = Callable::new(1, at_least_three);
        cx.expect_equal(f.call(&[Value::from(2)])?, 3)?;
        cx.expect_equal(f.call(&[Value::from(5)])?, 5)
      }),
      it("length reports the declared parameter count", |cx| {
        cx.expect_same(Value::from(Callable::new(2, sum)).get("length"), 2)?;
        cx.expect_same(Value::from(Callable::new(0, three)).get("length"), 0)
      }),
    ],
  )
}

fn mismatching_arity() -> Node {
  describe(
    "mismatching parameters / returns",
    vec![
      it("ignores extra parameters", |cx| {
        let f = Callable::new(2, sum);
        cx.expect_same(
          f.call(&[Value::from(1), Value::from(2), Value::from(3)])?,
          3,
        )
      }),
      it("converts missing parameters into undefined", |cx| {
        let f = Callable::new(1, identity);
        cx.expect_same(f.call(&[])?, Value::Undefined)
      }),
      it("always returns something, returns undefined by default", |cx| {
        let f = function(0, |_| Ok(Value::Undefined));
        cx.expect_same(f.call(&[])?, Value::Undefined)
      }),
      it("returns undefined if no value specified", |cx| {
        let f = function(0, |_| Ok(().into()));
        cx.expect_same(f.call(&[])?, Value::Undefined)
      }),
    ],
  )
}

fn default_arguments() -> Node {
  describe(
    "default arguments",
    vec![
      it("allows arguments with default value", |cx| {
        let f = function(0, |args| Ok(arg_or(args, 0, 3)));
        let three = f.call(&[])?;
        let four = f.call(&[Value::from(4)])?;
        cx.expect_same(three, 3)?;
        cx.expect_same(four, 4)
      }),
      it("an explicit undefined also takes the default", |cx| {
        let f = function(0, |args| Ok(arg_or(args, 0, 3)));
        cx.expect_same(f.call(&[Value::Undefined])?, 3)?;
        cx.expect_same(f.call(&[Value::Null])?, Value::Null)
      }),
    ],
  )
}

fn higher_order() -> Node {
  describe(
    "high order functions",
    vec![
      it("functions can receive other functions", |cx| {
        let twice = twice();
        cx.expect_same(twice.call(&[incr(), Value::from(2)])?, 4)?;
        cx.expect_same(twice.call(&[double(), Value::from(3)])?, 12)
      }),
      it("functions can be defined in place as expressions", |cx| {
        let halve = function(1, |args| Ok(Value::from(arg(args, 0).to_number() / 2.0)));
        cx.expect_same(twice().call(&[halve, Value::from(4)])?, 1)
      }),
      it("functions can return other functions", |cx| {
        let compose = function(2, |args| {
          let (first, second) = (arg(args, 0), arg(args, 1));
          Ok(function(1, move |inner| {
            let value = first.call(&[arg(inner, 0)])?;
            second.call(&[value])
          }))
        });
        let incr_then_double = compose.call(&[incr(), double()])?;
        cx.expect_same(incr_then_double.call(&[Value::from(3)])?, 8)
      }),
    ],
  )
}
