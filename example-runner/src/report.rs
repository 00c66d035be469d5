use crate::expectations::ExpectationKind;
use crate::scope::Matcher;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
  Passed,
  Failed,
  Skipped,
}

impl fmt::Display for CaseOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      CaseOutcome::Passed => "passed",
      CaseOutcome::Failed => "failed",
      CaseOutcome::Skipped => "skipped",
    })
  }
}

/// What went wrong inside a failed case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureDetail {
  Mismatch {
    matcher: Matcher,
    actual: String,
    expected: String,
  },
  Thrown {
    message: String,
  },
  Panicked {
    message: String,
  },
}

impl fmt::Display for FailureDetail {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureDetail::Mismatch {
        matcher,
        actual,
        expected,
      } => write!(f, "expected {actual} {matcher} {expected}"),
      FailureDetail::Thrown { message } => write!(f, "thrown: {message}"),
      FailureDetail::Panicked { message } => write!(f, "panicked: {message}"),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpectationOutcome {
  pub expectation: ExpectationKind,
  /// The case behaved as the manifest said it would.
  #[serde(default)]
  pub expected: bool,
  #[serde(default)]
  pub from_manifest: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tracking_issue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseReport {
  pub id: String,
  pub path: Vec<String>,
  pub outcome: CaseOutcome,
  pub assertions: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub failure: Option<FailureDetail>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<String>,
  pub expectation: ExpectationOutcome,
  #[serde(default, skip_serializing_if = "is_false")]
  pub mismatched: bool,
  #[serde(default, skip_serializing_if = "is_false")]
  pub expected_mismatch: bool,
  #[serde(default, skip_serializing_if = "is_false")]
  pub flaky: bool,
  /// Passed although the manifest marks it `xfail`.
  #[serde(default, skip_serializing_if = "is_false")]
  pub unexpected_pass: bool,
}

impl CaseReport {
  pub fn passed(&self) -> bool {
    self.outcome == CaseOutcome::Passed
  }
}

fn is_false(value: &bool) -> bool {
  !*value
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct MismatchSummary {
  pub expected: usize,
  pub unexpected: usize,
  pub flaky: usize,
  /// `xfail` cases that passed; the manifest entry is stale.
  #[serde(default)]
  pub xpass: usize,
}

impl MismatchSummary {
  pub fn total(&self) -> usize {
    self.expected + self.unexpected + self.flaky
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Summary {
  pub total: usize,
  pub passed: usize,
  pub failed: usize,
  pub skipped: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mismatches: Option<MismatchSummary>,
}

/// Which mismatches turn into a non-zero exit status. An `xfail` case that
/// passes counts under both `all` and `new`.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum FailOn {
  /// Any failed case.
  All,
  /// Failed cases the manifest does not account for.
  #[default]
  New,
  /// Never.
  None,
}

impl Summary {
  pub fn should_fail(&self, fail_on: FailOn) -> bool {
    let Some(mismatches) = &self.mismatches else {
      return false;
    };
    match fail_on {
      FailOn::All => mismatches.total() + mismatches.xpass > 0,
      FailOn::New => mismatches.unexpected + mismatches.xpass > 0,
      FailOn::None => false,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
  pub schema_version: u32,
  pub summary: Summary,
  pub results: Vec<CaseReport>,
}

impl Report {
  pub fn new(summary: Summary, results: Vec<CaseReport>) -> Self {
    Self {
      schema_version: REPORT_SCHEMA_VERSION,
      summary,
      results,
    }
  }
}

pub fn read_report(path: &Path) -> Result<Report> {
  let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
  let report: Report =
    serde_json::from_str(&raw).with_context(|| format!("parse report JSON {}", path.display()))?;
  if report.schema_version != REPORT_SCHEMA_VERSION {
    bail!(
      "unsupported report schema_version {} (expected {})",
      report.schema_version,
      REPORT_SCHEMA_VERSION
    );
  }
  Ok(report)
}

/// Writes the report as pretty JSON, creating parent directories.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
  }
  let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
  let mut writer = BufWriter::new(file);
  serde_json::to_writer_pretty(&mut writer, report).context("write JSON report")?;
  writeln!(writer)?;
  writer
    .flush()
    .with_context(|| format!("write report to {}", path.display()))
}

/// Human readable listing: one line per case, failure details indented
/// below it, then the totals.
pub fn write_text<W: Write>(
  out: &mut W,
  results: &[CaseReport],
  summary: &Summary,
) -> io::Result<()> {
  for result in results {
    let status = match result.outcome {
      CaseOutcome::Passed if result.unexpected_pass => "XPASS",
      CaseOutcome::Passed => "ok",
      CaseOutcome::Failed if result.expected_mismatch => "FAILED (expected)",
      CaseOutcome::Failed if result.flaky => "FAILED (flaky)",
      CaseOutcome::Failed => "FAILED",
      CaseOutcome::Skipped => "skipped",
    };
    writeln!(out, "{status:>8} {}", result.id)?;
    if let Some(failure) = &result.failure {
      writeln!(out, "         {failure}")?;
    }
    if result.unexpected_pass {
      writeln!(out, "         expected to fail (xfail), but passed")?;
    }
    if let Some(reason) = &result.skip_reason {
      writeln!(out, "         reason: {reason}")?;
    }
  }
  writeln!(
    out,
    "\n{} cases: {} passed, {} failed, {} skipped",
    summary.total, summary.passed, summary.failed, summary.skipped
  )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeChange {
  pub id: String,
  pub baseline: CaseOutcome,
  pub current: CaseOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
  pub regressions: Vec<OutcomeChange>,
  pub improvements: Vec<OutcomeChange>,
  pub new_cases: Vec<String>,
  pub removed_cases: Vec<String>,
}

/// Diffs two reports by case id. All lists come out sorted by id.
pub fn compare_reports(baseline: &Report, current: &Report) -> Result<Comparison> {
  if baseline.schema_version != current.schema_version {
    bail!(
      "report schema_version mismatch: baseline={} current={}",
      baseline.schema_version,
      current.schema_version
    );
  }

  let baseline_outcomes = index_outcomes("baseline", &baseline.results)?;
  let current_outcomes = index_outcomes("current", &current.results)?;
  let ids: BTreeSet<&str> = baseline_outcomes
    .keys()
    .chain(current_outcomes.keys())
    .copied()
    .collect();

  let mut comparison = Comparison::default();
  for id in ids {
    match (baseline_outcomes.get(id), current_outcomes.get(id)) {
      (Some(&baseline), Some(&current)) => {
        let change = OutcomeChange {
          id: id.to_string(),
          baseline,
          current,
        };
        match (baseline, current) {
          (CaseOutcome::Passed, CaseOutcome::Failed) => comparison.regressions.push(change),
          (CaseOutcome::Failed, CaseOutcome::Passed) => comparison.improvements.push(change),
          _ => {}
        }
      }
      (None, Some(_)) => comparison.new_cases.push(id.to_string()),
      (Some(_), None) => comparison.removed_cases.push(id.to_string()),
      (None, None) => unreachable!("id came from either report"),
    }
  }
  Ok(comparison)
}

fn index_outcomes<'a>(
  label: &str,
  results: &'a [CaseReport],
) -> Result<BTreeMap<&'a str, CaseOutcome>> {
  let mut map = BTreeMap::new();
  for result in results {
    if map.insert(result.id.as_str(), result.outcome).is_some() {
      bail!("{label} report contains duplicate case id `{}`", result.id);
    }
  }
  Ok(map)
}

pub fn write_comparison<W: Write>(out: &mut W, comparison: &Comparison) -> io::Result<()> {
  writeln!(out, "example report comparison:")?;
  writeln!(out, "  regressions: {}", comparison.regressions.len())?;
  writeln!(out, "  improvements: {}", comparison.improvements.len())?;
  writeln!(out, "  new cases: {}", comparison.new_cases.len())?;
  writeln!(out, "  removed cases: {}", comparison.removed_cases.len())?;

  let sections: [(&str, Vec<String>); 4] = [
    (
      "Regressions",
      comparison.regressions.iter().map(describe_change).collect(),
    ),
    (
      "Improvements",
      comparison.improvements.iter().map(describe_change).collect(),
    ),
    ("New cases", comparison.new_cases.clone()),
    ("Removed cases", comparison.removed_cases.clone()),
  ];
  for (title, lines) in sections {
    if lines.is_empty() {
      continue;
    }
    writeln!(out, "\n{title}:")?;
    for line in lines {
      writeln!(out, "  {line}")?;
    }
  }
  Ok(())
}

fn describe_change(change: &OutcomeChange) -> String {
  format!("{}: {} -> {}", change.id, change.baseline, change.current)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn result(id: &str, outcome: CaseOutcome) -> CaseReport {
    CaseReport {
      id: id.to_string(),
      path: id.split(" > ").map(str::to_string).collect(),
      outcome,
      assertions: 1,
      failure: None,
      skip_reason: None,
      expectation: ExpectationOutcome {
        expectation: ExpectationKind::Pass,
        expected: outcome == CaseOutcome::Passed,
        from_manifest: false,
        reason: None,
        tracking_issue: None,
      },
      mismatched: outcome == CaseOutcome::Failed,
      expected_mismatch: false,
      flaky: false,
      unexpected_pass: false,
    }
  }

  #[test]
  fn compare_classifies_and_sorts() {
    let baseline = Report::new(
      Summary::default(),
      vec![
        result("g > e", CaseOutcome::Passed),
        result("g > b", CaseOutcome::Failed),
        result("g > a", CaseOutcome::Passed),
        result("g > c", CaseOutcome::Passed),
        result("g > f", CaseOutcome::Passed),
      ],
    );
    let current = Report::new(
      Summary::default(),
      vec![
        result("g > c", CaseOutcome::Failed),
        result("g > d", CaseOutcome::Passed),
        result("g > a", CaseOutcome::Failed),
        result("g > b", CaseOutcome::Passed),
        result("g > f", CaseOutcome::Skipped),
      ],
    );

    let comparison = compare_reports(&baseline, &current).unwrap();
    let regressed: Vec<_> = comparison.regressions.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(regressed, vec!["g > a", "g > c"]);
    assert_eq!(
      comparison.improvements,
      vec![OutcomeChange {
        id: "g > b".to_string(),
        baseline: CaseOutcome::Failed,
        current: CaseOutcome::Passed,
      }]
    );
    assert_eq!(comparison.new_cases, vec!["g > d"]);
    assert_eq!(comparison.removed_cases, vec!["g > e"]);
  }

  #[test]
  fn compare_rejects_schema_mismatch_and_duplicates() {
    let mut baseline = Report::new(Summary::default(), vec![]);
    baseline.schema_version = 2;
    let current = Report::new(Summary::default(), vec![]);
    let err = compare_reports(&baseline, &current).unwrap_err();
    assert!(err.to_string().contains("schema_version mismatch"));

    let duplicated = Report::new(
      Summary::default(),
      vec![result("x", CaseOutcome::Passed), result("x", CaseOutcome::Failed)],
    );
    let err = compare_reports(&duplicated, &current).unwrap_err();
    assert!(err.to_string().contains("duplicate case id `x`"));
  }

  #[test]
  fn fail_on_policy() {
    let clean = Summary::default();
    assert!(!clean.should_fail(FailOn::All));

    let covered = Summary {
      mismatches: Some(MismatchSummary {
        expected: 1,
        ..MismatchSummary::default()
      }),
      ..Summary::default()
    };
    assert!(covered.should_fail(FailOn::All));
    assert!(!covered.should_fail(FailOn::New));

    let fresh = Summary {
      mismatches: Some(MismatchSummary {
        unexpected: 1,
        ..MismatchSummary::default()
      }),
      ..Summary::default()
    };
    assert!(fresh.should_fail(FailOn::New));
    assert!(!fresh.should_fail(FailOn::None));

    let stale = Summary {
      mismatches: Some(MismatchSummary {
        xpass: 1,
        ..MismatchSummary::default()
      }),
      ..Summary::default()
    };
    assert!(stale.should_fail(FailOn::New));
    assert!(stale.should_fail(FailOn::All));
    assert!(!stale.should_fail(FailOn::None));
  }

  #[test]
  fn report_file_round_trips_and_is_versioned() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out/report.json");
    let mut failed = result("g > broken", CaseOutcome::Failed);
    failed.failure = Some(FailureDetail::Mismatch {
      matcher: Matcher::ToBe,
      actual: "1".to_string(),
      expected: "2".to_string(),
    });
    let report = Report::new(Summary::default(), vec![failed]);
    write_report(&path, &report).unwrap();

    let raw: serde_json::Value =
      serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["schema_version"], REPORT_SCHEMA_VERSION);
    assert_eq!(raw["results"][0]["failure"]["kind"], "mismatch");
    assert_eq!(raw["results"][0]["failure"]["matcher"], "to_be");
    assert_eq!(read_report(&path).unwrap(), report);

    let future = serde_json::json!({
      "schema_version": 9,
      "summary": { "total": 0, "passed": 0, "failed": 0, "skipped": 0 },
      "results": []
    });
    fs::write(&path, future.to_string()).unwrap();
    let err = read_report(&path).unwrap_err();
    assert!(err.to_string().contains("unsupported report schema_version 9"));
  }

  #[test]
  fn text_output_lists_every_case() {
    let mut failed = result("g > bad", CaseOutcome::Failed);
    failed.failure = Some(FailureDetail::Thrown {
      message: "boom".to_string(),
    });
    let results = vec![result("g > good", CaseOutcome::Passed), failed];
    let summary = Summary {
      total: 2,
      passed: 1,
      failed: 1,
      ..Summary::default()
    };
    let mut out = Vec::new();
    write_text(&mut out, &results, &summary).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("      ok g > good"));
    assert!(text.contains("  FAILED g > bad\n         thrown: boom"));
    assert!(text.ends_with("2 cases: 1 passed, 1 failed, 0 skipped\n"));
  }
}
