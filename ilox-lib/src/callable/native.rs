//! This module provides the native functions callable from Lox.

use super::LoxCallable;
use crate::{
    interpreter::{Interpreter, RuntimeError},
    object::{LoxObject, SpanObject},
    span::Span,
};
use std::time;

/// Return the current Unix time in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock;

impl LoxCallable for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn arity(&self) -> u8 {
        0
    }

    fn call(
        &self,
        _interpreter: &mut dyn Interpreter,
        callee_span: Span,
        _arguments: &[SpanObject],
        close_paren: Span,
    ) -> Result<LoxObject, RuntimeError> {
        Ok(LoxObject::Number(
            time::SystemTime::now()
                .duration_since(time::UNIX_EPOCH)
                .map_err(|error| RuntimeError {
                    message: format!("NATIVE FUNCTION INTERNAL ERROR: {error:?}"),
                    lexeme: self.name().to_string(),
                    span: callee_span.union(&close_paren),
                })?
                .as_nanos() as f64
                / 1_000_000_000.0,
        ))
    }
}
