//! Expectations manifest: which cases are known to fail, be flaky, or should
//! not run at all.
//!
//! ```toml
//! [[expectations]]
//! glob = "Closures > *"
//! status = "xfail"
//! reason = "counter example under construction"
//! ```
//!
//! Exactly one of `id`, `glob` or `regex` per entry. Lookup tries exact ids,
//! then globs, then regexes, each in file order.

use anyhow::{anyhow, bail, Context, Result};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationKind {
  #[default]
  Pass,
  Skip,
  Xfail,
  Flaky,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expectation {
  #[serde(default)]
  pub kind: ExpectationKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tracking_issue: Option<String>,
}

/// The expectation that applied to one case, and whether it came from a
/// manifest entry or is the implicit `pass`.
#[derive(Debug, Clone, Default)]
pub struct AppliedExpectation {
  pub expectation: Expectation,
  pub from_manifest: bool,
}

impl AppliedExpectation {
  /// Whether a case whose outcome did (or did not) deviate from `passed`
  /// behaved as the manifest predicted.
  pub fn matches(&self, mismatched: bool) -> bool {
    match self.expectation.kind {
      ExpectationKind::Pass => !mismatched,
      ExpectationKind::Skip => true,
      ExpectationKind::Xfail | ExpectationKind::Flaky => mismatched,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Expectations {
  exact: Vec<Entry>,
  globs: Vec<Entry>,
  regexes: Vec<Entry>,
}

impl Expectations {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Self::parse(&raw).with_context(|| format!("parse manifest {}", path.display()))
  }

  /// Parses a TOML manifest, falling back to JSON with the same shape.
  pub fn parse(raw: &str) -> Result<Self> {
    let manifest = match toml::from_str::<RawManifest>(raw) {
      Ok(manifest) => manifest,
      Err(toml_err) => serde_json::from_str::<RawManifest>(raw).map_err(|json_err| {
        anyhow!("failed to parse manifest as TOML ({toml_err}) or JSON ({json_err})")
      })?,
    };

    let mut expectations = Expectations::default();
    for raw in manifest.expectations {
      let pattern = raw.pattern()?;
      let expectation = Expectation {
        kind: raw
          .status
          .ok_or_else(|| anyhow!("manifest entry missing `status`"))?,
        reason: raw.reason,
        tracking_issue: raw.tracking_issue,
      };
      let bucket = match &pattern {
        Pattern::Exact(_) => &mut expectations.exact,
        Pattern::Glob(_) => &mut expectations.globs,
        Pattern::Regex(_) => &mut expectations.regexes,
      };
      bucket.push(Entry {
        pattern,
        expectation,
      });
    }
    Ok(expectations)
  }

  pub fn lookup(&self, id: &str) -> AppliedExpectation {
    [&self.exact, &self.globs, &self.regexes]
      .into_iter()
      .flat_map(|entries| entries.iter())
      .find(|entry| entry.pattern.matches(id))
      .map(|entry| AppliedExpectation {
        expectation: entry.expectation.clone(),
        from_manifest: true,
      })
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone)]
struct Entry {
  pattern: Pattern,
  expectation: Expectation,
}

#[derive(Debug, Clone)]
enum Pattern {
  Exact(String),
  Glob(GlobMatcher),
  Regex(Regex),
}

impl Pattern {
  fn matches(&self, id: &str) -> bool {
    match self {
      Pattern::Exact(exact) => exact == id,
      Pattern::Glob(glob) => glob.is_match(id),
      Pattern::Regex(re) => re.is_match(id),
    }
  }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
  #[serde(default)]
  expectations: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
  id: Option<String>,
  glob: Option<String>,
  regex: Option<String>,
  status: Option<ExpectationKind>,
  reason: Option<String>,
  tracking_issue: Option<String>,
}

impl RawEntry {
  fn pattern(&self) -> Result<Pattern> {
    match (&self.id, &self.glob, &self.regex) {
      (Some(id), None, None) => Ok(Pattern::Exact(id.clone())),
      (None, Some(glob), None) => {
        let glob = Glob::new(glob).map_err(|err| anyhow!("invalid glob '{glob}': {err}"))?;
        Ok(Pattern::Glob(glob.compile_matcher()))
      }
      (None, None, Some(regex)) => {
        let re = Regex::new(regex).map_err(|err| anyhow!("invalid regex '{regex}': {err}"))?;
        Ok(Pattern::Regex(re))
      }
      (None, None, None) => bail!("manifest entry must specify one of `id`/`glob`/`regex`"),
      _ => bail!("manifest entry must specify exactly one of `id`/`glob`/`regex`"),
    }
  }
}
