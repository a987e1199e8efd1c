//! This crate runs the `lox-tests/` snapshot suite against one or more interpreter binaries.
//!
//! Every `.lox` file under the test directory is executed and checked three ways: captured
//! stdout and stderr are compared (after ANSI stripping) against sibling `.stdout`/`.stderr`
//! snapshot files (a missing file means "expect nothing"), and the process exit code is checked
//! against the code implied by the expected diagnostics: 65 for scan/parse/resolve errors, 70
//! for runtime errors, 0 otherwise.

use clap::Parser;
use crossterm::style::Stylize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitCode},
    str,
    sync::mpsc,
};
use strip_ansi::strip_ansi;
use thiserror::Error;
use threadpool::ThreadPool;
use walkdir::WalkDir;

/// A problem that stopped a test from running at all.
#[derive(Debug, Error)]
enum HarnessError {
    /// A standard I/O error.
    #[error("I/O error: `{0}`")]
    Io(#[from] io::Error),

    /// The interpreter wrote something that wasn't UTF-8.
    #[error("invalid UTF-8 in interpreter output: `{0}`")]
    Decoding(#[from] str::Utf8Error),
}

/// What a test expects of an interpreter run.
#[derive(Debug)]
struct Expectation {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl Expectation {
    /// Load the expectation for a test file from its sibling snapshot files.
    ///
    /// The exit code follows the interpreter's contract: 65 when the expected stderr carries a
    /// scan/parse/resolve diagnostic, 70 for a runtime diagnostic, and 0 otherwise (warnings
    /// alone don't fail a run).
    fn load(test_file: &Path) -> Self {
        let stdout = read_snapshot(test_file, "stdout");
        let stderr = read_snapshot(test_file, "stderr");

        let exit_code = if stderr.starts_with("Runtime Error -") {
            70
        } else if ["Scan Error -", "Parse Error -", "Resolve Error -"]
            .iter()
            .any(|prefix| stderr.starts_with(prefix))
        {
            65
        } else {
            0
        };

        Self {
            stdout,
            stderr,
            exit_code,
        }
    }
}

/// Read an expected output snapshot next to the test file, defaulting to empty.
fn read_snapshot(test_file: &Path, extension: &str) -> String {
    fs::read_to_string(test_file.with_extension(extension))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// One stream (or the exit code) that disagreed with its snapshot.
#[derive(Debug)]
struct Mismatch {
    what: &'static str,
    expected: String,
    got: String,
}

/// The outcome of running one test file with one interpreter.
#[derive(Debug)]
enum Outcome {
    Passed,
    Failed(Vec<Mismatch>),
    Broken(String),
}

/// Run a single test file with the given interpreter and compare against its expectation.
fn run_case(test_file: &Path, interpreter: &Path) -> Result<Outcome, HarnessError> {
    let expectation = Expectation::load(test_file);
    let output = Command::new(interpreter).arg(test_file).output()?;

    let stdout = strip_ansi(str::from_utf8(&output.stdout)?)
        .trim()
        .to_string();
    let stderr = strip_ansi(str::from_utf8(&output.stderr)?)
        .trim()
        .to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    let mut mismatches = Vec::new();
    if stdout != expectation.stdout {
        mismatches.push(Mismatch {
            what: "stdout",
            expected: expectation.stdout,
            got: stdout,
        });
    }
    if stderr != expectation.stderr {
        mismatches.push(Mismatch {
            what: "stderr",
            expected: expectation.stderr,
            got: stderr,
        });
    }
    if exit_code != expectation.exit_code {
        mismatches.push(Mismatch {
            what: "exit code",
            expected: expectation.exit_code.to_string(),
            got: exit_code.to_string(),
        });
    }

    Ok(if mismatches.is_empty() {
        Outcome::Passed
    } else {
        Outcome::Failed(mismatches)
    })
}

/// Print the outcome of one test.
fn render(label: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Passed => println!("{} {label}", "PASS".green().bold()),
        Outcome::Failed(mismatches) => {
            println!("{} {label}", "FAIL".red().bold());
            for mismatch in mismatches {
                println!("  {} differs:", mismatch.what.bold());
                print_block("expected", &mismatch.expected);
                print_block("got", &mismatch.got);
            }
        }
        Outcome::Broken(reason) => println!("{} {label}: {reason}", "BROKEN".red().bold()),
    }
}

/// Print one side of a mismatch, indented under a dimmed header.
fn print_block(header: &str, content: &str) {
    println!("    {}", format!("--- {header} ---").dark_grey());
    if content.is_empty() {
        println!("    <nothing>");
    } else {
        for line in content.lines() {
            println!("    {line}");
        }
    }
}

/// Run the Lox snapshot tests against one or more interpreter binaries.
#[derive(Parser, Debug)]
struct Args {
    /// The directory containing `.lox` test files and their snapshots.
    tests: PathBuf,

    /// An interpreter binary to run the tests with (repeatable).
    #[arg(short, long = "interpreter", required = true)]
    interpreters: Vec<PathBuf>,
}

fn main() -> Result<ExitCode, io::Error> {
    let args = Args::parse();
    let base = args.tests.canonicalize()?;

    let mut test_files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(&base) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                eprintln!("skipping unreadable entry: {error}");
                continue;
            }
        };
        if entry.file_type().is_file() {
            let path = entry.into_path();
            if path.extension().is_some_and(|ext| ext == "lox") {
                test_files.push(path);
            }
        }
    }
    test_files.sort();

    let pool = ThreadPool::new(num_cpus::get());
    let (sender, receiver) = mpsc::channel();

    for interpreter in &args.interpreters {
        let interpreter_name = interpreter
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("interpreter")
            .to_string();

        for test_file in &test_files {
            let relative = test_file.strip_prefix(&base).unwrap_or(test_file);
            let label = format!("{} [{interpreter_name}]", relative.display());

            let sender = sender.clone();
            let test_file = test_file.clone();
            let interpreter = interpreter.clone();
            pool.execute(move || {
                let outcome = run_case(&test_file, &interpreter)
                    .unwrap_or_else(|error| Outcome::Broken(error.to_string()));
                let _ = sender.send((label, outcome));
            });
        }
    }
    drop(sender);

    let mut total = 0u32;
    let mut failed = 0u32;
    for (label, outcome) in receiver {
        total += 1;
        if !matches!(outcome, Outcome::Passed) {
            failed += 1;
        }
        render(&label, &outcome);
    }

    Ok(if failed > 0 {
        println!(
            "\n{}",
            format!("{failed} of {total} tests failed").red().bold()
        );
        ExitCode::FAILURE
    } else {
        println!("\n{}", format!("all {total} tests passed").green().bold());
        ExitCode::SUCCESS
    })
}
