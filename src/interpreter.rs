//! Tree‑walking evaluator.
//!
//! The runtime environment chain mirrors the resolver's scope stack exactly:
//! one frame per block execution, one per call (parameters + body), and one
//! `this` frame per method binding.  A variable reference the resolver
//! annotated is read with [`Environment::get_at`] at that hop count; anything
//! unannotated is a global.
//!
//! `return`, `break` and `continue` are not errors: statements yield an
//! [`ExecOutcome`] that the nearest call (for `Return`) or loop (for
//! `Break`/`Continue`) consumes.

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::callable::natives;
use crate::class::{ClassMembers, LoxClass};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::function::LoxFunction;
use crate::resolver::Resolution;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nested calls allowed before a script is stopped with a runtime error.
pub const MAX_CALL_DEPTH: usize = 512;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// Hop counts from the resolver, keyed by expression identity.
    locals: HashMap<ExprId, usize>,
    call_depth: usize,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an Interpreter printing to stdout, with the natives defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates an Interpreter whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();

        for native in natives() {
            debug!("Defining native function '{}'", native.name);
            let name: &'static str = native.name;
            globals
                .borrow_mut()
                .define(name, Value::Native(Rc::new(native)));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            call_depth: 0,
            out,
        }
    }

    /// Records that the expression `id` binds `depth` frames out.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Merges a completed resolver pass into the hop‑count table.
    pub fn resolve(&mut self, resolution: &Resolution) {
        for binding in resolution.bindings() {
            self.note_local(binding.id, binding.depth);
        }
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error stops the remaining statements.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt)? {
                ExecOutcome::Normal => {}
                // The resolver rejects all of these at top level.
                ExecOutcome::Return(_) => {
                    return Err(RuntimeError::StraySignal { signal: "return" })
                }
                ExecOutcome::Break => return Err(RuntimeError::StraySignal { signal: "break" }),
                ExecOutcome::Continue => {
                    return Err(RuntimeError::StraySignal { signal: "continue" })
                }
            }
        }

        self.out.flush()?;
        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Runs `statements` in `environment`, then puts the previous environment
    /// back on every exit path: normal completion, a signal, or an error.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> IResult<ExecOutcome> {
        let previous: EnvRef = mem::replace(&mut self.environment, environment);
        let result: IResult<ExecOutcome> = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> IResult<ExecOutcome> {
        for stmt in statements {
            match self.execute(stmt)? {
                ExecOutcome::Normal => {}
                signal => return Ok(signal),
            }
        }

        Ok(ExecOutcome::Normal)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<ExecOutcome> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ExecOutcome::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(ExecOutcome::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(ExecOutcome::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, environment.into_ref())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(ExecOutcome::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        ExecOutcome::Break => break,
                        ExecOutcome::Continue | ExecOutcome::Normal => {}
                        returned @ ExecOutcome::Return(_) => return Ok(returned),
                    }
                }
                Ok(ExecOutcome::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = self.closure(declaration, false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(ExecOutcome::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(ExecOutcome::Return(value))
            }

            Stmt::Class(class) => {
                self.declare_class(class)?;
                Ok(ExecOutcome::Normal)
            }

            Stmt::Terminate(keyword) => match keyword.token_type {
                TokenType::BREAK => Ok(ExecOutcome::Break),
                _ => Ok(ExecOutcome::Continue),
            },
        }
    }

    fn closure(&self, declaration: &Rc<FunctionDecl>, is_initializer: bool) -> LoxFunction {
        LoxFunction::new(
            Rc::clone(declaration),
            Rc::clone(&self.environment),
            is_initializer,
        )
    }

    /// Only a public method named `init` becomes an initializer.
    fn closures(
        &self,
        methods: &[Rc<FunctionDecl>],
        initializers: bool,
    ) -> HashMap<String, Rc<LoxFunction>> {
        methods
            .iter()
            .map(|method| {
                let is_initializer = initializers && method.name.lexeme == "init";
                (
                    method.name.lexeme.clone(),
                    Rc::new(self.closure(method, is_initializer)),
                )
            })
            .collect()
    }

    /// Binds the name first so methods can refer to their own class.
    fn declare_class(&mut self, class: &ClassDecl) -> IResult<()> {
        debug!("Declaring class '{}'", class.name.lexeme);

        self.environment
            .borrow_mut()
            .define(&class.name.lexeme, Value::Nil);

        let members = ClassMembers {
            methods: self.closures(&class.methods, true),
            static_methods: self.closures(&class.static_methods, false),
            private_methods: self.closures(&class.private_methods, false),
            fields: field_names(&class.fields),
            private_fields: field_names(&class.private_fields),
        };

        let value = Value::Class(Rc::new(LoxClass::new(class.name.lexeme.clone(), members)));
        self.environment.borrow_mut().assign(&class.name, value)?;

        info!("Class '{}' defined", class.name.lexeme);
        Ok(())
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left)?;
                let short_circuit: bool = match operator.token_type {
                    TokenType::OR => left_val.is_truthy(),
                    _ => !left_val.is_truthy(),
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => match self.look_up_variable(*id, keyword)? {
                Value::Instance(proxy) => Ok(Value::Instance(proxy.public_view())),
                other => Ok(other),
            },

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(undefined_variable(name));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let Some(callable) = callee.as_callable() else {
                    return Err(RuntimeError::NotCallable { line: paren.line });
                };

                if args.len() != callable.arity() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: callable.arity(),
                        actual: args.len(),
                        line: paren.line,
                    });
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::StackOverflow { line: paren.line });
                }

                self.call_depth += 1;
                let result = callable.call(self, args, paren);
                self.call_depth -= 1;
                result
            }

            Expr::Get { object, name } => match self.evaluate_receiver(object)? {
                Value::Instance(proxy) => proxy.get(name),
                Value::Class(class) => class.get_static(name),
                _ => Err(not_an_instance(name)),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(proxy) = self.evaluate_receiver(object)? else {
                    return Err(not_an_instance(name));
                };

                let value: Value = self.evaluate(value)?;
                proxy.set(name, value.clone())?;
                Ok(value)
            }
        }
    }

    /// `this.name` keeps the private view bound into the method.
    fn evaluate_receiver(&mut self, object: &Expr) -> IResult<Value> {
        match object {
            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
            _ => self.evaluate(object),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::NotANumber {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                }),
            },
            _ => Ok(Value::Bool(!right_val.is_truthy())),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::AmbiguousPlusOperands {
                    line: operator.line,
                }),
            },
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),
            _ => {
                let (Value::Number(a), Value::Number(b)) = (left_val, right_val) else {
                    return Err(RuntimeError::MixedOrNonNumericOperands {
                        operator: operator.lexeme.clone(),
                        line: operator.line,
                    });
                };

                Ok(match operator.token_type {
                    TokenType::MINUS => Value::Number(a - b),
                    TokenType::STAR => Value::Number(a * b),
                    TokenType::SLASH => Value::Number(a / b),
                    TokenType::GREATER => Value::Bool(a > b),
                    TokenType::GREATER_EQUAL => Value::Bool(a >= b),
                    TokenType::LESS => Value::Bool(a < b),
                    _ => Value::Bool(a <= b),
                })
            }
        }
    }
}

fn field_names(fields: &[Token]) -> HashMap<String, Token> {
    fields
        .iter()
        .map(|field| (field.lexeme.clone(), field.clone()))
        .collect()
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        name: name.lexeme.clone(),
        line: name.line,
    }
}

fn not_an_instance(name: &Token) -> RuntimeError {
    RuntimeError::NotAnInstance {
        name: name.lexeme.clone(),
        line: name.line,
    }
}
