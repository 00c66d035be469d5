use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use closure_examples::suite;
use example_runner::report::{
  compare_reports, read_report, write_comparison, write_report, write_text,
};
use example_runner::{summarize, Expectations, FailOn, Filter, Report, RunOptions, Runner, Shard};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(version, about = "Runs the function and closure example suite")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run the examples and report pass/fail per case.
  Run(RunArgs),
  /// Print every case id in run order.
  List,
  /// Work with JSON report artifacts.
  Report(ReportArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
  /// Only run cases whose id matches this glob or regex.
  #[arg(long)]
  filter: Option<String>,

  /// Run only the `<index>/<total>` slice of the selected cases.
  #[arg(long)]
  shard: Option<Shard>,

  /// Expectations manifest (TOML or JSON) marking cases skip/xfail/flaky.
  #[arg(long, value_name = "PATH")]
  expectations: Option<PathBuf>,

  /// Write a JSON report to this path.
  #[arg(long, value_name = "PATH")]
  json: Option<PathBuf>,

  /// Which failures make the exit status non-zero.
  #[arg(long, value_enum, default_value_t = FailOn::New)]
  fail_on: FailOn,

  /// Emit tracing spans (JSON) on stderr.
  #[arg(long)]
  trace: bool,
}

#[derive(Args, Debug)]
struct ReportArgs {
  #[command(subcommand)]
  command: ReportCommand,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
  /// Compare two JSON reports (baseline vs current).
  Compare(CompareArgs),
}

#[derive(Args, Debug)]
struct CompareArgs {
  /// Path to the baseline JSON report.
  #[arg(long, value_name = "PATH")]
  baseline: PathBuf,

  /// Path to the current JSON report.
  #[arg(long, value_name = "PATH")]
  current: PathBuf,

  /// Exit with a non-zero code when regressions are detected.
  #[arg(long)]
  fail_on_regression: bool,
}

fn main() -> ExitCode {
  match try_main() {
    Ok(code) => code,
    Err(err) => {
      eprintln!("{err:#}");
      ExitCode::FAILURE
    }
  }
}

fn try_main() -> Result<ExitCode> {
  let cli = Cli::parse();
  match cli.command {
    Command::Run(args) => run_examples(args),
    Command::List => list_cases(),
    Command::Report(args) => match args.command {
      ReportCommand::Compare(args) => compare(args),
    },
  }
}

fn run_examples(args: RunArgs) -> Result<ExitCode> {
  init_tracing(args.trace);

  let expectations = match &args.expectations {
    Some(path) => Expectations::from_path(path)?,
    None => Expectations::empty(),
  };
  let runner = Runner::new(RunOptions {
    filter: Filter::parse(args.filter.as_deref())?,
    shard: args.shard,
    expectations,
  });

  let suite = suite();
  let results = runner.run(&suite)?;
  let summary = summarize(&results);

  let stdout = io::stdout();
  let mut out = stdout.lock();
  write_text(&mut out, &results, &summary)?;
  out.flush()?;

  let should_fail = summary.should_fail(args.fail_on);
  if let Some(path) = &args.json {
    write_report(path, &Report::new(summary, results))?;
  }

  Ok(if should_fail {
    ExitCode::FAILURE
  } else {
    ExitCode::SUCCESS
  })
}

fn list_cases() -> Result<ExitCode> {
  let suite = suite();
  let stdout = io::stdout();
  let mut out = stdout.lock();
  for case in suite.cases()? {
    writeln!(out, "{}", case.id)?;
  }
  Ok(ExitCode::SUCCESS)
}

fn compare(args: CompareArgs) -> Result<ExitCode> {
  let baseline = read_report(&args.baseline)?;
  let current = read_report(&args.current)?;
  let comparison = compare_reports(&baseline, &current)?;

  let stdout = io::stdout();
  write_comparison(&mut stdout.lock(), &comparison)?;

  Ok(if args.fail_on_regression && !comparison.regressions.is_empty() {
    ExitCode::FAILURE
  } else {
    ExitCode::SUCCESS
  })
}

fn init_tracing(enabled: bool) {
  if !enabled {
    return;
  }
  let _ = tracing_subscriber::fmt()
    .with_span_events(FmtSpan::CLOSE)
    .with_max_level(Level::DEBUG)
    .with_writer(io::stderr)
    .json()
    .with_ansi(false)
    .try_init();
}
