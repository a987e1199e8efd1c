//! This module provides the [`Interpreter`] trait and the error types shared by its backends.

use crate::{
    ast::SpanStmt,
    environment::Environment,
    object::SpanObject,
    span::Span,
};
use std::{cell::RefCell, fmt, rc::Rc};
use thiserror::Error;

/// An error encountered by the interpreter at runtime.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct RuntimeError {
    /// The error message.
    pub message: String,

    /// The offending lexeme or node name.
    pub lexeme: String,

    /// The span where the error occurred.
    pub span: Span,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeError({:?})", self.message)
    }
}

/// An error encountered by the resolver before runtime.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct ResolveError {
    /// The error message.
    pub message: String,

    /// The offending name.
    pub lexeme: String,

    /// The span where the error occurred.
    pub span: Span,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolveError({:?})", self.message)
    }
}

/// A runtime error has occurred or we need to return from a function call.
pub enum ErrorOrReturn {
    /// A [`RuntimeError`] has occurred.
    Error(RuntimeError),

    /// Return from the current function.
    Return(SpanObject),
}

impl From<RuntimeError> for ErrorOrReturn {
    fn from(value: RuntimeError) -> Self {
        Self::Error(value)
    }
}

/// A result wrapping [`ErrorOrReturn`], so that `?` propagates both runtime errors and the
/// non-local exit of a `return` statement.
pub type Result<T, E = ErrorOrReturn> = ::std::result::Result<T, E>;

/// A backend that can execute a resolved AST.
pub trait Interpreter {
    /// Create a new interpreter.
    fn new() -> Self
    where
        Self: Sized;

    /// Run the static resolution pass over the given AST, accumulating its variable distance map
    /// into the interpreter's state.
    fn resolve(&mut self, stmts: &[SpanStmt]) -> ::std::result::Result<(), ResolveError>;

    /// Interpret the given AST, returning the first runtime error if one occurs.
    fn interpret(&mut self, stmts: &[SpanStmt]) -> ::std::result::Result<(), RuntimeError>;

    /// Execute the given block.
    ///
    /// If the environment argument is Some, then use that environment. Otherwise, create a
    /// new one for this block. Either way, restore the parent environment at the end.
    fn execute_block(
        &mut self,
        stmts: &[SpanStmt],
        environment: Option<Rc<RefCell<Environment>>>,
    ) -> Result<()>;
}
