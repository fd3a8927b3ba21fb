use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::callable::Callable;
use crate::class::{LoxInstance, LoxInstanceProxy};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{ExecOutcome, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// A user function or method: its declaration plus the environment chain
/// visible where it was declared.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    /// A bare `return;` (or falling off the end) yields `this`, not `nil`.
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// A copy of this method whose closure has one extra frame binding `this`
    /// to `instance` with private access enabled.
    pub fn bind(&self, instance: &Rc<LoxInstance>) -> LoxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define(
            "this",
            Value::Instance(LoxInstanceProxy::new(Rc::clone(instance), true)),
        );

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: environment.into_ref(),
            is_initializer: self.is_initializer,
        }
    }

    /// The instance an initializer was bound to, as a public view.
    fn bound_this(&self) -> Result<Value, RuntimeError> {
        match Environment::get_at(&self.closure, 0, "this") {
            Some(Value::Instance(proxy)) => Ok(Value::Instance(proxy.public_view())),
            Some(other) => Ok(other),
            None => Err(RuntimeError::UndefinedVariable {
                name: "this".to_string(),
                line: self.declaration.name.line,
            }),
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        _paren: &Token,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling user-defined function '{}'", self.name());

        // The new frame hangs off the closure, not the caller's environment.
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let outcome = interpreter.execute_block(&self.declaration.body, environment.into_ref())?;

        match outcome {
            ExecOutcome::Return(_) | ExecOutcome::Normal if self.is_initializer => {
                self.bound_this()
            }
            ExecOutcome::Return(value) => Ok(value),
            ExecOutcome::Normal => Ok(Value::Nil),
            ExecOutcome::Break => Err(RuntimeError::StraySignal { signal: "break" }),
            ExecOutcome::Continue => Err(RuntimeError::StraySignal { signal: "continue" }),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.declaration.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}
