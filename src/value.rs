use std::fmt;
use std::rc::Rc;

use crate::ast::LiteralValue;
use crate::callable::{Callable, NativeFunction};
use crate::class::{LoxClass, LoxInstanceProxy};
use crate::function::LoxFunction;

/// A runtime value.  Everything that is not a primitive is reference‑shared.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    /// Always held through a proxy, which decides private visibility.
    Instance(LoxInstanceProxy),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// The callable view of this value, if it has one.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Native(native) => Some(native.as_ref()),
            Value::Function(function) => Some(function.as_ref()),
            Value::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::True => Value::Bool(true),
            LiteralValue::False => Value::Bool(false),
            LiteralValue::Nil => Value::Nil,
        }
    }
}

/// No implicit coercion between types.  Callables compare by identity,
/// instances by the identity of the instance behind the proxy.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => a.same_instance(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            // Shortest round-tripping form; integral values carry no ".0".
            Value::Number(n) => write!(f, "{}", n),

            Value::String(s) => write!(f, "{}", s),

            Value::Native(_) => write!(f, "<native fn>"),

            Value::Function(function) => write!(f, "{}", function),

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(proxy) => write!(f, "{}", proxy),
        }
    }
}
