//! Classes, instances, and the proxy views that enforce private visibility.
//!
//! Instances are only ever reachable through a [`LoxInstanceProxy`].  Code
//! outside the class holds a public view (`allow_private = false`); the
//! `this` bound into every method is a private view, but only a `this.name`
//! receiver uses it directly.  Any other use of `this` (returning it, storing
//! it, passing it on) yields a public view, as does constructing an instance.
//!
//! Field storage stays name‑keyed: the field set is open per class
//! declaration, so there is no fixed layout to compile it down to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::Callable;
use crate::error::RuntimeError;
use crate::function::LoxFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

const INITIALIZER: &str = "init";

pub struct LoxClass {
    pub name: String,
    methods: HashMap<String, Rc<LoxFunction>>,
    static_methods: HashMap<String, Rc<LoxFunction>>,
    private_methods: HashMap<String, Rc<LoxFunction>>,
    /// Declaration tokens only; values live on each instance.
    fields: HashMap<String, Token>,
    private_fields: HashMap<String, Token>,
}

/// Everything a class statement declares, already wrapped as closures.
#[derive(Default)]
pub struct ClassMembers {
    pub methods: HashMap<String, Rc<LoxFunction>>,
    pub static_methods: HashMap<String, Rc<LoxFunction>>,
    pub private_methods: HashMap<String, Rc<LoxFunction>>,
    pub fields: HashMap<String, Token>,
    pub private_fields: HashMap<String, Token>,
}

impl LoxClass {
    pub fn new(name: String, members: ClassMembers) -> Self {
        Self {
            name,
            methods: members.methods,
            static_methods: members.static_methods,
            private_methods: members.private_methods,
            fields: members.fields,
            private_fields: members.private_fields,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<LoxFunction>> {
        self.methods.get(name)
    }

    pub fn find_private_method(&self, name: &str) -> Option<&Rc<LoxFunction>> {
        self.private_methods.get(name)
    }

    /// `ClassName.method`: static methods are returned unbound.
    pub fn get_static(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.static_methods
            .get(&name.lexeme)
            .map(|method| Value::Function(Rc::clone(method)))
            .ok_or_else(|| RuntimeError::UndefinedStaticMethod {
                name: name.lexeme.clone(),
                line: name.line,
            })
    }
}

impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method(INITIALIZER).map_or(0, |init| init.arity())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        debug!("Constructing instance of '{}'", self.name);

        let instance: Rc<LoxInstance> = Rc::new(LoxInstance::new(Rc::clone(self)));

        // The initializer always runs with private access, whoever the caller is.
        if let Some(init) = self.find_method(INITIALIZER) {
            init.bind(&instance).call(interpreter, arguments, paren)?;
        }

        Ok(Value::Instance(LoxInstanceProxy::new(instance, false)))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("static_methods", &self.static_methods.keys().collect::<Vec<_>>())
            .field("private_methods", &self.private_methods.keys().collect::<Vec<_>>())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("private_fields", &self.private_fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
    private_fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    /// Every declared field starts out `nil`.
    pub fn new(class: Rc<LoxClass>) -> Self {
        let nils = |names: &HashMap<String, Token>| -> HashMap<String, Value> {
            names.keys().map(|name| (name.clone(), Value::Nil)).collect()
        };

        Self {
            fields: RefCell::new(nils(&class.fields)),
            private_fields: RefCell::new(nils(&class.private_fields)),
            class,
        }
    }

    /// Lookup order: public field, private field, public method, private
    /// method.  Methods come back bound to this instance.
    pub fn get(self: &Rc<Self>, name: &Token, allow_private: bool) -> Result<Value, RuntimeError> {
        if let Some(value) = self.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(value) = self.private_fields.borrow().get(&name.lexeme) {
            return if allow_private {
                Ok(value.clone())
            } else {
                Err(private_violation(name))
            };
        }

        if let Some(method) = self.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(self))));
        }

        if let Some(method) = self.class.find_private_method(&name.lexeme) {
            return if allow_private {
                Ok(Value::Function(Rc::new(method.bind(self))))
            } else {
                Err(private_violation(name))
            };
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }

    /// Only declared fields are assignable; methods never are.
    pub fn set(&self, name: &Token, value: Value, allow_private: bool) -> Result<(), RuntimeError> {
        if let Some(slot) = self.fields.borrow_mut().get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        if let Some(slot) = self.private_fields.borrow_mut().get_mut(&name.lexeme) {
            if !allow_private {
                return Err(private_violation(name));
            }

            *slot = value;
            return Ok(());
        }

        Err(RuntimeError::UndefinedField {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

fn private_violation(name: &Token) -> RuntimeError {
    RuntimeError::PrivateAccessViolation {
        name: name.lexeme.clone(),
        line: name.line,
    }
}

/// A capability view over an instance.
#[derive(Clone)]
pub struct LoxInstanceProxy {
    instance: Rc<LoxInstance>,
    allow_private: bool,
}

impl LoxInstanceProxy {
    pub fn new(instance: Rc<LoxInstance>, allow_private: bool) -> Self {
        Self {
            instance,
            allow_private,
        }
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        self.instance.get(name, self.allow_private)
    }

    pub fn set(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        self.instance.set(name, value, self.allow_private)
    }

    /// The same instance without private access.
    pub fn public_view(&self) -> Self {
        Self::new(Rc::clone(&self.instance), false)
    }

    pub fn same_instance(&self, other: &LoxInstanceProxy) -> bool {
        Rc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Display for LoxInstanceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instance)
    }
}

impl fmt::Debug for LoxInstanceProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxInstanceProxy")
            .field("class", &self.instance.class.name)
            .field("allow_private", &self.allow_private)
            .finish()
    }
}
