use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to an environment.  Closures keep theirs alive after the
/// block that created it has exited.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical frame: local bindings plus a link to the enclosing frame
/// (`None` for the globals).
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Inserts or overwrites a local binding.  Never fails.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Searches this frame, then the enclosing chain outward.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrites the nearest existing binding; never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The frame exactly `distance` links out from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Reads `name` from the frame `distance` links out, without searching.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let frame: EnvRef = Self::ancestor(env, distance)?;
        let value: Option<Value> = frame.borrow().values.get(name).cloned();
        value
    }

    /// Writes `name` in the frame `distance` links out, without searching.
    /// Returns `false` when that frame does not hold the binding.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        let Some(frame) = Self::ancestor(env, distance) else {
            return false;
        };

        let mut frame = frame.borrow_mut();
        match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        name: name.lexeme.clone(),
        line: name.line,
    }
}
