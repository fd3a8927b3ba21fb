//! The surface shared by everything that can appear before `(`: user
//! functions, classes (constructors) and host natives.

use std::fmt;

use chrono::Utc;
use log::debug;

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

pub trait Callable {
    fn arity(&self) -> usize;

    /// Invoke with already‑evaluated arguments.  The caller has checked the
    /// argument count against [`arity`](Callable::arity); `paren` locates
    /// errors raised from inside the call.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError>;
}

/// Host logic exposed to scripts under a global name.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}/{}>", self.name, self.arity)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(&arguments).map_err(|message| RuntimeError::Native {
            name: self.name.to_string(),
            message,
            line: paren.line,
        })
    }
}

/// Natives installed into every interpreter's globals.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }]
}

/// Seconds since the Unix epoch, with sub‑second precision.
fn clock(_args: &[Value]) -> Result<Value, String> {
    let micros: i64 = Utc::now().timestamp_micros();
    Ok(Value::Number(micros as f64 / 1_000_000.0))
}
