//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! Two taxonomies never mix: [`ResolveError`] is what the static resolver pass
//! reports (any one of them suppresses interpretation), and [`RuntimeError`] is
//! what halts a running program.  Control signals (`return`, `break`,
//! `continue`) are *not* errors; they travel as
//! [`ExecOutcome`](crate::interpreter::ExecOutcome) values.
//!
//! [`LoxError`] wraps both plus the scanner/parser failures so the driver can
//! collect everything behind one `Result<T>` alias.  The module **does not**
//! print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        /// ` at 'lexeme'` or ` at end`.
        location: String,
        line: usize,
    },

    /// Static‑analysis failure reported by the resolver.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  `lexeme` is `None` at end of input.
    pub fn parse<S: Into<String>>(line: usize, lexeme: Option<&str>, msg: S) -> Self {
        let message: String = msg.into();
        let location: String = match lexeme {
            Some(lexeme) => format!(" at '{}'", lexeme),
            None => " at end".to_string(),
        };

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            location,
            line,
        }
    }

    /// `true` for failures detected before any code runs (exit code 65).
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve(_)
        )
    }
}

/// Static errors found by the [`Resolver`](crate::resolver::Resolver).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("[line {line}] Error at '{name}': Already a variable with this name in this scope.")]
    DuplicateDeclaration { name: String, line: usize },

    #[error("[line {line}] Error at '{name}': Can't read local variable in its own initializer.")]
    UseBeforeInit { name: String, line: usize },

    #[error("[line {line}] Error at '{name}': Variable is defined but never used.")]
    UnusedVariable { name: String, line: usize },

    #[error("[line {line}] Error at 'return': Can't return from top-level code.")]
    ReturnOutsideFunction { line: usize },

    #[error("[line {line}] Error at 'return': Can't return a value from an initializer.")]
    ReturnFromInitializer { line: usize },

    #[error("[line {line}] Error at 'this': Can't use 'this' outside of a class.")]
    ThisOutsideClass { line: usize },

    #[error("[line {line}] Error at 'this': Can't use 'this' inside a static method.")]
    ThisOutsideInstanceContext { line: usize },

    #[error("[line {line}] Error at '{keyword}': '{keyword}' must be used inside a loop.")]
    TerminateOutsideLoop { keyword: String, line: usize },

    #[error("[line {line}] Error at '{name}': Can't set field '{name}' without declaring it in class '{class}'.")]
    UndeclaredFieldAssignment {
        name: String,
        class: String,
        line: usize,
    },
}

impl ResolveError {
    pub fn line(&self) -> usize {
        match self {
            ResolveError::DuplicateDeclaration { line, .. }
            | ResolveError::UseBeforeInit { line, .. }
            | ResolveError::UnusedVariable { line, .. }
            | ResolveError::ReturnOutsideFunction { line }
            | ResolveError::ReturnFromInitializer { line }
            | ResolveError::ThisOutsideClass { line }
            | ResolveError::ThisOutsideInstanceContext { line }
            | ResolveError::TerminateOutsideLoop { line, .. }
            | ResolveError::UndeclaredFieldAssignment { line, .. } => *line,
        }
    }
}

/// Failures raised while a program runs.  The first one halts the current
/// top‑level program (or REPL line).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] RuntimeError at '{name}': Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: usize },

    #[error("[line {line}] RuntimeError at '{operator}': Operand must be a number.")]
    NotANumber { operator: String, line: usize },

    #[error("[line {line}] RuntimeError at '{operator}': Operands must be numbers.")]
    MixedOrNonNumericOperands { operator: String, line: usize },

    #[error("[line {line}] RuntimeError at '+': Operands must be two numbers or two strings.")]
    AmbiguousPlusOperands { line: usize },

    #[error("[line {line}] RuntimeError at ')': Expected {expected} arguments but got {actual}.")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        line: usize,
    },

    #[error("[line {line}] RuntimeError at ')': Can only call functions and classes.")]
    NotCallable { line: usize },

    #[error("[line {line}] RuntimeError at ')': Stack overflow.")]
    StackOverflow { line: usize },

    #[error("[line {line}] RuntimeError at '{name}': Only instances have properties.")]
    NotAnInstance { name: String, line: usize },

    #[error("[line {line}] RuntimeError at '{name}': Can't access private member '{name}' outside the class.")]
    PrivateAccessViolation { name: String, line: usize },

    #[error("[line {line}] RuntimeError at '{name}': Undefined property '{name}'.")]
    UndefinedProperty { name: String, line: usize },

    #[error("[line {line}] RuntimeError at '{name}': Can't set undeclared field '{name}'.")]
    UndefinedField { name: String, line: usize },

    #[error("[line {line}] RuntimeError at '{name}': Undefined static method '{name}'.")]
    UndefinedStaticMethod { name: String, line: usize },

    /// A host native failed.
    #[error("[line {line}] RuntimeError in native '{name}': {message}")]
    Native {
        name: String,
        message: String,
        line: usize,
    },

    /// A control signal reached a frame that cannot consume it.  Only a
    /// resolver bug can produce this.
    #[error("Internal error: stray '{signal}' signal escaped its handler.")]
    StraySignal { signal: &'static str },

    /// Writing `print` output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
