use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn cli() -> Command {
  assert_cmd::cargo::cargo_bin_cmd!("example-runner-cli")
}

#[test]
fn run_passes_and_lists_every_case() {
  cli()
    .arg("run")
    .assert()
    .success()
    .stdout(contains(
      "      ok Closures > each time that a parent is called a new set of variables is created",
    ))
    .stdout(contains(" 0 failed, 0 skipped"));
}

#[test]
fn list_prints_ids_in_run_order() {
  let output = cli().arg("list").assert().success().get_output().stdout.clone();
  let stdout = String::from_utf8(output).unwrap();
  let lines: Vec<_> = stdout.lines().collect();
  assert_eq!(
    lines.first().copied(),
    Some("Functions > closure notation > || {} is the shortest function")
  );
  assert!(lines.contains(&"Closures > avoid loops: every closure sees the final loop value"));
}

#[test]
fn json_report_is_written_and_stable() {
  let dir = tempdir().unwrap();
  let first = dir.path().join("first.json");
  let second = dir.path().join("nested/second.json");
  for path in [&first, &second] {
    cli()
      .args(["run", "--filter", "Closures > *", "--json"])
      .arg(path)
      .assert()
      .success();
  }

  let raw = fs::read_to_string(&first).unwrap();
  assert_eq!(raw, fs::read_to_string(&second).unwrap());
  let report: Value = serde_json::from_str(&raw).unwrap();
  assert_eq!(report["schema_version"], 1);
  assert_eq!(report["summary"]["failed"], 0);
  let results = report["results"].as_array().unwrap();
  assert!(!results.is_empty());
  assert!(results.iter().all(|r| r["path"][0] == "Closures"));
}

#[test]
fn shard_and_filter_narrow_the_run() {
  cli()
    .args(["run", "--filter", "^Functions > default", "--shard", "1/2"])
    .assert()
    .success()
    .stdout(contains("1 cases: 1 passed"));
}

#[test]
fn filter_without_matches_fails() {
  cli()
    .args(["run", "--filter", "Nothing > *"])
    .assert()
    .failure()
    .stderr(contains("filter matched no cases"));
}

#[test]
fn manifest_skips_cases() {
  let dir = tempdir().unwrap();
  let manifest = dir.path().join("expectations.toml");
  fs::write(
    &manifest,
    "[[expectations]]\nglob = \"Functions > *\"\nstatus = \"skip\"\nreason = \"closures only\"\n",
  )
  .unwrap();

  cli()
    .arg("run")
    .arg("--expectations")
    .arg(&manifest)
    .assert()
    .success()
    .stdout(contains(
      " skipped Functions > default arguments > allows arguments with default value",
    ))
    .stdout(contains("reason: closures only"));
}

#[test]
fn a_full_case_id_selects_exactly_that_case() {
  cli()
    .args([
      "run",
      "--filter",
      "Functions > named fn notation > fn(a, b) { return a + b; } sums two numbers",
    ])
    .assert()
    .success()
    .stdout(contains("1 cases: 1 passed, 0 failed, 0 skipped"));
}

fn xfail_manifest(dir: &std::path::Path) -> std::path::PathBuf {
  let manifest = dir.join("expectations.toml");
  fs::write(
    &manifest,
    concat!(
      "[[expectations]]\n",
      "id = \"Closures > inner functions can use parent arguments\"\n",
      "status = \"xfail\"\n",
    ),
  )
  .unwrap();
  manifest
}

#[test]
fn an_xfail_case_that_passes_fails_the_run() {
  let dir = tempdir().unwrap();
  let manifest = xfail_manifest(dir.path());

  cli()
    .args(["run", "--filter", "Closures > *", "--expectations"])
    .arg(&manifest)
    .assert()
    .failure()
    .stdout(contains(concat!(
      "   XPASS Closures > inner functions can use parent arguments\n",
      "         expected to fail (xfail), but passed",
    )));
}

#[test]
fn fail_on_selects_the_exit_policy() {
  let dir = tempdir().unwrap();
  let manifest = xfail_manifest(dir.path());

  cli()
    .args(["run", "--fail-on", "all", "--expectations"])
    .arg(&manifest)
    .assert()
    .failure();

  cli()
    .args(["run", "--fail-on", "none", "--expectations"])
    .arg(&manifest)
    .assert()
    .success()
    .stdout(contains("XPASS"));
}

#[test]
fn compare_flags_regressions() {
  let dir = tempdir().unwrap();
  let baseline = dir.path().join("baseline.json");
  let current = dir.path().join("current.json");
  cli()
    .args(["run", "--filter", "Closures > *", "--json"])
    .arg(&baseline)
    .assert()
    .success();

  let mut report: Value = serde_json::from_str(&fs::read_to_string(&baseline).unwrap()).unwrap();
  report["results"][0]["outcome"] = Value::from("failed");
  fs::write(&current, serde_json::to_string(&report).unwrap()).unwrap();

  cli()
    .args(["report", "compare", "--baseline"])
    .arg(&baseline)
    .arg("--current")
    .arg(&current)
    .assert()
    .success()
    .stdout(contains("regressions: 1"));

  cli()
    .args(["report", "compare", "--fail-on-regression", "--baseline"])
    .arg(&baseline)
    .arg("--current")
    .arg(&current)
    .assert()
    .failure()
    .stdout(contains("Closures > inner functions can use parent arguments: passed -> failed"));
}
