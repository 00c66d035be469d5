use crate::scope::{CaseResult, Scope};
use anyhow::{bail, Result};
use std::collections::HashSet;

pub const ID_SEPARATOR: &str = " > ";

pub type Body = Box<dyn Fn(&mut Scope) -> CaseResult>;

pub struct Case {
  name: String,
  body: Body,
}

impl Case {
  pub fn run(&self, scope: &mut Scope) -> CaseResult {
    (self.body)(scope)
  }
}

pub struct Group {
  name: String,
  children: Vec<Node>,
}

pub enum Node {
  Group(Group),
  Case(Case),
}

/// Registers a named group. Nothing runs at registration.
pub fn describe(name: impl Into<String>, children: Vec<Node>) -> Node {
  Node::Group(Group {
    name: name.into(),
    children,
  })
}

/// Registers a named case. The body runs later, once, inside the runner.
pub fn it(name: impl Into<String>, body: impl Fn(&mut Scope) -> CaseResult + 'static) -> Node {
  Node::Case(Case {
    name: name.into(),
    body: Box::new(body),
  })
}

/// The anonymous root of a run. Its name never shows up in case paths.
#[derive(Default)]
pub struct Suite {
  roots: Vec<Node>,
}

/// A case paired with its full path, in depth-first registration order.
pub struct PlannedCase<'a> {
  pub id: String,
  pub path: Vec<String>,
  pub case: &'a Case,
}

impl Suite {
  pub fn new(roots: Vec<Node>) -> Self {
    Self { roots }
  }

  /// Flattens the tree. Fails if two cases end up with the same id, since
  /// manifests and reports could not tell them apart.
  pub fn cases(&self) -> Result<Vec<PlannedCase<'_>>> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    collect(&self.roots, &mut path, &mut out);

    let mut seen = HashSet::new();
    for planned in &out {
      if !seen.insert(planned.id.as_str()) {
        bail!("duplicate case id `{}`", planned.id);
      }
    }
    Ok(out)
  }
}

fn collect<'a>(nodes: &'a [Node], path: &mut Vec<String>, out: &mut Vec<PlannedCase<'a>>) {
  for node in nodes {
    match node {
      Node::Group(group) => {
        path.push(group.name.clone());
        collect(&group.children, path, out);
        path.pop();
      }
      Node::Case(case) => {
        let mut full = path.clone();
        full.push(case.name.clone());
        out.push(PlannedCase {
          id: case_id(&full),
          path: full,
          case,
        });
      }
    }
  }
}

pub fn case_id(path: &[String]) -> String {
  path.join(ID_SEPARATOR)
}
