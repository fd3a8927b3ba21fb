//! Pipeline driver: scan → parse → resolve → interpret.
//!
//! A [`Lox`] owns one [`Interpreter`] for its whole life, so globals defined
//! by one [`run`](Lox::run) call stay visible to the next.  That is what the
//! REPL relies on.  Expression ids are threaded across runs for the same
//! reason: hop counts noted for an earlier line must never be shadowed by a
//! later line reusing the id.

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Resolution, Resolver};
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::from_interpreter(Interpreter::new())
    }

    /// `print` output goes to `out` instead of stdout.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_output(out))
    }

    fn from_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_id: 0,
        }
    }

    /// Runs a whole program.  Static errors are all reported together and
    /// nothing executes; a runtime error stops execution at that point.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        self.execute(source, false)
    }

    /// Runs one line typed at the prompt.  The final `;` is optional, and a
    /// bare trailing expression prints its value.
    pub fn run_repl_line(&mut self, line: &str) -> Result<(), Vec<LoxError>> {
        self.execute(line, true)
    }

    fn execute(&mut self, source: &str, repl: bool) -> Result<(), Vec<LoxError>> {
        let tokens: Vec<Token> = scan(source)?;

        let mut parser = Parser::new(tokens)
            .starting_at(self.next_id)
            .repl_mode(repl);
        let parsed = parser.parse();
        self.next_id = parser.next_id();
        let statements: Vec<Stmt> = parsed?;

        let resolution: Resolution = Resolver::new()
            .resolve(&statements)
            .map_err(|errors| errors.into_iter().map(LoxError::from).collect::<Vec<_>>())?;
        debug!("Resolved {} local reference(s)", resolution.len());

        self.interpreter.resolve(&resolution);
        self.interpreter
            .interpret(&statements)
            .map_err(|error| vec![LoxError::from(error)])?;

        info!("Run finished");
        Ok(())
    }
}

/// Tokenizes `source`, collecting every lexical error instead of stopping at
/// the first one.
pub fn scan(source: &str) -> Result<Vec<Token>, Vec<LoxError>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Scans, parses and resolves `source` without running it.
pub fn resolve_source(source: &str) -> Result<(Vec<Stmt>, Resolution), Vec<LoxError>> {
    let statements: Vec<Stmt> = Parser::new(scan(source)?).parse()?;

    let resolution: Resolution = Resolver::new()
        .resolve(&statements)
        .map_err(|errors| errors.into_iter().map(LoxError::from).collect::<Vec<_>>())?;

    Ok((statements, resolution))
}
