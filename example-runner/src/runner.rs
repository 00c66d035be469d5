use crate::expectations::{AppliedExpectation, ExpectationKind, Expectations};
use crate::report::{
  CaseOutcome, CaseReport, ExpectationOutcome, FailureDetail, MismatchSummary, Summary,
};
use crate::scope::{Failure, Scope};
use crate::shard::Shard;
use crate::tree::{PlannedCase, Suite};
use anyhow::{anyhow, bail, Result};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::Once;

/// Case selection. A pattern equal to a case id always selects exactly that
/// case, so ids full of glob or regex syntax stay addressable.
#[derive(Debug, Clone, Default)]
pub enum Filter {
  #[default]
  All,
  Exact(String),
  Glob { raw: String, glob: GlobMatcher },
  Regex { raw: String, re: Regex },
}

impl Filter {
  /// Patterns using regex-only syntax (anchors, groups, alternation,
  /// escapes) are tried as regexes first, anything else as a glob first.
  /// A pattern that compiles as neither only matches an identical id.
  pub fn parse(pattern: Option<&str>) -> Result<Self> {
    let Some(raw) = pattern else {
      return Ok(Filter::All);
    };
    if raw.is_empty() {
      bail!("empty filter");
    }
    let looks_like_regex = raw.contains(['^', '$', '(', ')', '|', '+', '\\']);
    let as_glob = || {
      Glob::new(raw).ok().map(|glob| Filter::Glob {
        raw: raw.to_string(),
        glob: glob.compile_matcher(),
      })
    };
    let as_regex = || {
      Regex::new(raw).ok().map(|re| Filter::Regex {
        raw: raw.to_string(),
        re,
      })
    };
    let parsed = if looks_like_regex {
      as_regex().or_else(as_glob)
    } else {
      as_glob().or_else(as_regex)
    };
    Ok(parsed.unwrap_or_else(|| Filter::Exact(raw.to_string())))
  }

  /// The pattern as written, if any.
  pub fn raw(&self) -> Option<&str> {
    match self {
      Filter::All => None,
      Filter::Exact(raw) | Filter::Glob { raw, .. } | Filter::Regex { raw, .. } => {
        Some(raw.as_str())
      }
    }
  }

  pub fn matches(&self, id: &str) -> bool {
    match self {
      Filter::All => true,
      Filter::Exact(raw) => raw == id,
      Filter::Glob { raw, glob } => raw == id || glob.is_match(id),
      Filter::Regex { raw, re } => raw == id || re.is_match(id),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub filter: Filter,
  pub shard: Option<Shard>,
  pub expectations: Expectations,
}

#[derive(Debug, Default)]
pub struct Runner {
  options: RunOptions,
}

/// Runs every case of `suite` with no filtering and no manifest.
pub fn run(suite: &Suite) -> Result<Vec<CaseReport>> {
  Runner::default().run(suite)
}

impl Runner {
  pub fn new(options: RunOptions) -> Self {
    Self { options }
  }

  /// Selects the cases this runner will execute, in execution order.
  pub fn plan<'a>(&self, suite: &'a Suite) -> Result<Vec<PlannedCase<'a>>> {
    let all = suite.cases()?;
    let filter = &self.options.filter;
    let exact = filter
      .raw()
      .filter(|raw| all.iter().any(|case| case.id == *raw));
    let selected: Vec<_> = all
      .into_iter()
      .filter(|case| match exact {
        Some(raw) => case.id == raw,
        None => filter.matches(&case.id),
      })
      .collect();
    if selected.is_empty() && filter.raw().is_some() {
      bail!("filter matched no cases");
    }

    let Some(shard) = self.options.shard else {
      return Ok(selected);
    };
    let total = selected.len();
    let sharded = shard.apply(selected);
    if sharded.is_empty() && total > 0 {
      bail!(
        "shard {}/{} matched no cases out of {total}",
        shard.index,
        shard.total
      );
    }
    Ok(sharded)
  }

  /// Executes the planned cases one at a time, in order. A failing case is
  /// recorded and the run moves on.
  pub fn run(&self, suite: &Suite) -> Result<Vec<CaseReport>> {
    let planned = self.plan(suite)?;
    Ok(
      planned
        .iter()
        .map(|case| run_single_case(case, self.options.expectations.lookup(&case.id)))
        .collect(),
    )
  }
}

fn run_single_case(case: &PlannedCase<'_>, expectation: AppliedExpectation) -> CaseReport {
  if expectation.expectation.kind == ExpectationKind::Skip {
    tracing::debug!(id = %case.id, "skipped by manifest");
    return CaseReport {
      id: case.id.clone(),
      path: case.path.clone(),
      outcome: CaseOutcome::Skipped,
      assertions: 0,
      failure: None,
      skip_reason: expectation.expectation.reason.clone(),
      expectation: expectation_outcome(&expectation, false),
      mismatched: false,
      expected_mismatch: false,
      flaky: false,
      unexpected_pass: false,
    };
  }

  let span = tracing::debug_span!("case", id = %case.id);
  let _enter = span.enter();

  let (assertions, failure) = execute(case);
  let outcome = if failure.is_some() {
    CaseOutcome::Failed
  } else {
    CaseOutcome::Passed
  };
  let mismatched = outcome != CaseOutcome::Passed;
  if let Some(failure) = &failure {
    tracing::debug!(%failure, "case failed");
  }

  let expectation_out = expectation_outcome(&expectation, mismatched);
  CaseReport {
    id: case.id.clone(),
    path: case.path.clone(),
    outcome,
    assertions,
    failure,
    skip_reason: None,
    mismatched,
    expected_mismatch: mismatched && expectation_out.expectation == ExpectationKind::Xfail,
    flaky: mismatched && expectation_out.expectation == ExpectationKind::Flaky,
    unexpected_pass: !mismatched
      && expectation_out.from_manifest
      && expectation_out.expectation == ExpectationKind::Xfail,
    expectation: expectation_out,
  }
}

static PANIC_HOOK_INIT: Once = Once::new();

thread_local! {
  static IN_CASE: Cell<bool> = const { Cell::new(false) };
}

/// Panics raised inside a case body are reported with the case, so the hook
/// only traces them. Panics anywhere else keep the previous hook.
fn install_panic_hook() {
  PANIC_HOOK_INIT.call_once(|| {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
      if IN_CASE.with(Cell::get) {
        tracing::debug!(panic = %info, "case panicked");
      } else {
        default_hook(info);
      }
    }));
  });
}

/// Runs one body in a fresh scope. Panics are caught so they count against
/// this case only.
fn execute(case: &PlannedCase<'_>) -> (usize, Option<FailureDetail>) {
  install_panic_hook();
  let mut scope = Scope::new();
  IN_CASE.with(|flag| flag.set(true));
  let result = catch_unwind(AssertUnwindSafe(|| case.case.run(&mut scope)));
  IN_CASE.with(|flag| flag.set(false));
  let failure = match result {
    Ok(Ok(())) => None,
    Ok(Err(Failure::Mismatch {
      matcher,
      actual,
      expected,
    })) => Some(FailureDetail::Mismatch {
      matcher,
      actual,
      expected,
    }),
    Ok(Err(Failure::Thrown(message))) => Some(FailureDetail::Thrown { message }),
    Err(payload) => Some(FailureDetail::Panicked {
      message: panic_message(payload.as_ref()),
    }),
  };
  (scope.assertions().len(), failure)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    return message.to_string();
  }
  if let Some(message) = payload.downcast_ref::<String>() {
    return message.clone();
  }
  "non-string panic payload".to_string()
}

fn expectation_outcome(expectation: &AppliedExpectation, mismatched: bool) -> ExpectationOutcome {
  ExpectationOutcome {
    expectation: expectation.expectation.kind,
    expected: expectation.matches(mismatched),
    from_manifest: expectation.from_manifest,
    reason: expectation.expectation.reason.clone(),
    tracking_issue: expectation.expectation.tracking_issue.clone(),
  }
}

pub fn summarize(results: &[CaseReport]) -> Summary {
  let mut summary = Summary::default();
  let mut mismatches = MismatchSummary::default();

  for result in results {
    summary.total += 1;
    match result.outcome {
      CaseOutcome::Passed => summary.passed += 1,
      CaseOutcome::Failed => summary.failed += 1,
      CaseOutcome::Skipped => summary.skipped += 1,
    }

    if result.unexpected_pass {
      mismatches.xpass += 1;
    } else if result.mismatched {
      if result.flaky {
        mismatches.flaky += 1;
      } else if result.expected_mismatch {
        mismatches.expected += 1;
      } else {
        mismatches.unexpected += 1;
      }
    }
  }

  if mismatches.total() + mismatches.xpass > 0 {
    summary.mismatches = Some(mismatches);
  }
  tracing::info!(
    total = summary.total,
    passed = summary.passed,
    failed = summary.failed,
    skipped = summary.skipped,
    xpass = summary.mismatches.as_ref().map_or(0, |m| m.xpass),
    "run finished"
  );
  summary
}
