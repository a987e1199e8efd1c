//! This crate contains the language front end, runtime model, and pipeline driver for ilox, a
//! tree-walk interpreter for Lox, as described in
//! <https://craftinginterpreters.com/a-tree-walk-interpreter.html>.

pub mod ast;
pub mod callable;
pub mod class;
pub mod environment;
pub mod interpreter;
pub mod lox;
pub mod object;
pub mod parser;
pub mod scanner;
pub mod span;
pub mod tokens;

use color_eyre::Result;
use std::{env::args, process::ExitCode};
use tracing_subscriber::{filter::LevelFilter, fmt::Layer, prelude::*, EnvFilter};

pub use self::interpreter::Interpreter;

/// Run the interpreter, taking a source file as the first CLI argument, or running the REPL if no
/// file was given.
///
/// The returned exit code is 0 on success, 65 on scan/parse/resolve errors, and 70 on runtime
/// errors.
pub fn run_interpreter<T: Interpreter>() -> Result<ExitCode> {
    color_eyre::install()?;

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(
            Layer::new().with_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::WARN.into())
                    .from_env_lossy(),
            ),
        ),
    )?;

    let mut interpreter = lox::LoxInterpreter::<T>::new();

    match args().nth(1) {
        Some(path) => Ok(interpreter.run_file(path)?),
        None => {
            interpreter.run_prompt()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
