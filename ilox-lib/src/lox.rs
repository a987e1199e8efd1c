//! This module acts as a top-level entrypoint to evaluating Lox code.
//!
//! The pipeline is `scan → parse → resolve → interpret`. It is fail-fast: the first error at any
//! stage aborts the run and is printed as a three-line diagnostic.

use crate::{
    interpreter::{ResolveError, RuntimeError},
    parser::{ParseError, Parser},
    scanner::{ScanError, Scanner},
    span::{LineOffsets, Span},
    Interpreter,
};
use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    tty::IsTty,
};
use lazy_static::lazy_static;
use rustyline::{error::ReadlineError, DefaultEditor};
use std::{fs, io, path::Path, process::ExitCode, sync::RwLock};
use thiserror::Error;
use tracing::{debug, instrument, trace};

lazy_static! {
    /// The LineOffsets of the code being worked with.
    static ref LINE_OFFSETS: RwLock<LineOffsets> = RwLock::new(LineOffsets::new(""));

    /// The source code that we're working with.
    static ref SOURCE_CODE: RwLock<String> = RwLock::new(String::new());
}

/// An error from any stage of the pipeline.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LoxError {
    /// An error from the scanner.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// An error from the parser.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An error from the resolver.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An error from the interpreter at runtime.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// The name of the pipeline stage that produced this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "Scan",
            Self::Parse(_) => "Parse",
            Self::Resolve(_) => "Resolve",
            Self::Runtime(_) => "Runtime",
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::Scan(e) => &e.message,
            Self::Parse(e) => &e.message,
            Self::Resolve(e) => &e.message,
            Self::Runtime(e) => &e.message,
        }
    }

    /// The offending lexeme or token name.
    pub fn lexeme(&self) -> &str {
        match self {
            Self::Scan(e) => &e.lexeme,
            Self::Parse(e) => &e.lexeme,
            Self::Resolve(e) => &e.lexeme,
            Self::Runtime(e) => &e.lexeme,
        }
    }

    /// The span where the error occurred.
    pub fn span(&self) -> Span {
        match self {
            Self::Scan(e) => e.span,
            Self::Parse(e) => e.span,
            Self::Resolve(e) => e.span,
            Self::Runtime(e) => e.span,
        }
    }

    /// The process exit code for this error: 65 for static errors, 70 for runtime errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Scan(_) | Self::Parse(_) | Self::Resolve(_) => 65,
            Self::Runtime(_) => 70,
        }
    }
}

/// The Lox interpreter.
#[derive(Clone, Debug)]
pub struct LoxInterpreter<T: Interpreter> {
    /// The core interpreter implementation to use.
    interpreter: T,
}

/// An error that can be returned from [`LoxInterpreter::run_prompt`].
#[derive(Debug, Error)]
pub enum PromptError {
    /// An error from `rustyline`.
    #[error("rustyline error: `{0:?}`")]
    Readline(#[from] ReadlineError),

    /// A standard I/O error.
    #[error("I/O error: `{0:?}`")]
    Io(#[from] io::Error),
}

impl<T: Interpreter> LoxInterpreter<T> {
    /// Create a new interpreter.
    pub fn new() -> Self {
        Self {
            interpreter: T::new(),
        }
    }

    /// Read the file and run the contents, mapping any Lox error to its exit code.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<ExitCode, io::Error> {
        let code = fs::read_to_string(path)?;

        *SOURCE_CODE.write().unwrap() = code.clone();
        *LINE_OFFSETS.write().unwrap() = LineOffsets::new(&code);

        match self.run_code(&code) {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(error) => {
                report_error(&error);
                Ok(ExitCode::from(error.exit_code()))
            }
        }
    }

    /// Read code from an interactive prompt and run it.
    ///
    /// The interpreter (environment chain and accumulated distance map) persists across lines, so
    /// later lines can use names declared earlier. Each line is appended to the accumulated source
    /// (space-padded when re-scanned) so spans keep pointing at the right place.
    pub fn run_prompt(&mut self) -> Result<(), PromptError> {
        let mut prompt = DefaultEditor::new()?;

        let history_file =
            home::home_dir().map(|home| home.join(".config").join("ilox").join(".history"));
        if let Some(history_file) = &history_file {
            if !history_file.exists() {
                if let Some(parent) = history_file.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::File::create(history_file)?;
            }
            prompt.load_history(&history_file)?;
        }

        loop {
            match prompt.readline("> ") {
                Ok(mut line) => {
                    prompt.add_history_entry(&line)?;
                    if let Some(history_file) = &history_file {
                        prompt.save_history(history_file)?;
                    }

                    // Let bare expressions run as expression statements.
                    if !line.trim_end().ends_with([';', '}']) && !line.trim().is_empty() {
                        line.push(';');
                    }
                    line.push('\n');

                    let old_code_width = SOURCE_CODE.read().unwrap().len();
                    SOURCE_CODE.write().unwrap().push_str(&line);
                    *LINE_OFFSETS.write().unwrap() = LineOffsets::new(&SOURCE_CODE.read().unwrap());

                    let line = format!("{:old_code_width$}{line}", "");

                    if let Err(error) = self.run_code(&line) {
                        report_error(&error);
                    }
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => return Ok(()),
                Err(ReadlineError::Io(e)) => return Err(e)?,
                Err(error) => panic!("Unknown error: `{error:?}`"),
            }
        }
    }

    /// Run the given Lox code, stopping at the first error from any stage.
    fn run_code(&mut self, code: &str) -> Result<(), LoxError> {
        debug!("Running code: ```lox\n{}```", code.trim_start());

        let tokens = Scanner::scan_tokens(code)?;
        trace!(?tokens);

        let stmts = Parser::parse(tokens)?;
        trace!(?stmts);

        self.interpreter.resolve(&stmts)?;
        self.interpreter.interpret(&stmts)?;

        Ok(())
    }
}

/// Print the given error to stderr.
pub fn report_error(error: &LoxError) {
    print_diagnostic(
        Color::Red,
        &format!("{} Error - {}", error.kind(), error.message()),
        error.lexeme(),
        error.span(),
    );
}

/// Print a non-fatal warning to stderr.
pub fn report_warning(span: Span, lexeme: &str, message: &str) {
    print_diagnostic(Color::Yellow, &format!("Warning - {message}"), lexeme, span);
}

/// Print a three-line diagnostic, with the header line coloured when stderr is a terminal.
#[instrument(skip_all)]
fn print_diagnostic(header_color: Color, header: &str, lexeme: &str, span: Span) {
    let (line, col) = LINE_OFFSETS.read().unwrap().line_and_col(span.start);
    trace!(?span, ?line, ?col);

    let mut stderr = io::stderr();

    if stderr.is_tty() {
        execute!(
            stderr,
            SetForegroundColor(header_color),
            SetAttribute(Attribute::Bold),
            Print(header),
            ResetColor,
            SetAttribute(Attribute::Reset),
            Print("\n"),
        )
        .expect("Should be able to print error messages with crossterm");
    } else {
        eprintln!("{header}");
    }

    eprintln!("Lexeme - {lexeme}");
    eprintln!("Position - ({line}, {col})");
}
