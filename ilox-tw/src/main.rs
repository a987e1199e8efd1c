use color_eyre::Result;
use std::process::ExitCode;

/// Run the interpreter.
fn main() -> Result<ExitCode> {
    ilox_lib::run_interpreter::<ilox_tw::TwInterpreter>()
}
