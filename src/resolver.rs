//! Static resolver pass for **Rox**.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (a stack of `name → VariableMeta` maps) that mirror
//!    the environment frames the interpreter will create.
//! 2. Report static errors (redeclaration, forward‑read in initializer, unused
//!    locals, misplaced `return`/`this`/`break`/`continue`, undeclared field
//!    writes).  Errors accumulate; one bad subtree does not hide the next.
//! 3. Record, for *each* variable occurrence, whether it is a local (and at
//!    what depth) or a global, so the interpreter never falls back to a
//!    dynamic search that would see a later shadowing local.
//!
//! The walk context (function kind, enclosing class, loop flag) is passed down
//! by value, so leaving a construct restores the outer context for free.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use serde::Serialize;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Stmt};
use crate::error::ResolveError;
use crate::token::{Token, TokenType};

/// One resolved local reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub id: ExprId,
    pub name: String,
    pub line: usize,
    /// Hops from the referencing frame out to the declaring frame.
    pub depth: usize,
}

/// Output of a successful pass: hop counts for every local reference.
/// References absent from the table are globals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    bindings: BTreeMap<ExprId, Binding>,
}

impl Resolution {
    pub fn depth(&self, id: ExprId) -> Option<usize> {
        self.bindings.get(&id).map(|binding| binding.depth)
    }

    /// `(id, depth)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ExprId, usize)> + '_ {
        self.bindings
            .iter()
            .map(|(id, binding)| (*id, binding.depth))
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Per‑name bookkeeping inside one scope.
#[derive(Debug, Clone)]
struct VariableMeta {
    name: Token,
    /// False between declaration and the end of its initializer.
    initialized: bool,
    accessed: bool,
}

/// What kind of function body we are in.  Used to validate `return`/`this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
    StaticMethod,
}

/// Which class body (if any) encloses the current node.
#[derive(Copy, Clone, Debug)]
enum ClassContext<'s> {
    None,
    /// Instance or private method: `this` is bound.
    Instance(&'s ClassDecl),
    /// Static method: no `this`.
    Static,
}

#[derive(Copy, Clone, Debug)]
struct Context<'s> {
    function: FunctionKind,
    class: ClassContext<'s>,
    in_loop: bool,
    /// Name of the global whose initializer is being resolved.
    initializing_global: Option<&'s str>,
}

const TOP_LEVEL: Context<'static> = Context {
    function: FunctionKind::None,
    class: ClassContext::None,
    in_loop: false,
    initializing_global: None,
};

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for the interpreter.
#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Vec<HashMap<String, VariableMeta>>,
    bindings: BTreeMap<ExprId, Binding>,
    errors: Vec<ResolveError>,
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Self::default()
    }

    /// Walk all top‑level statements.  Any error means the program must not run.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Resolution, Vec<ResolveError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt, TOP_LEVEL);
        }

        if self.errors.is_empty() {
            info!("Resolve pass finished: {} local binding(s)", self.bindings.len());
            Ok(Resolution {
                bindings: self.bindings,
            })
        } else {
            info!("Resolve pass finished with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt<'s>(&mut self, stmt: &'s Stmt, ctx: Context<'s>) {
        match stmt {
            Stmt::Class(class) => self.resolve_class(class, ctx),

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements, ctx);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    let ctx = Context {
                        initializing_global: self.scopes.is_empty().then_some(name.lexeme.as_str()),
                        ..ctx
                    };
                    self.resolve_expr(expr, ctx);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // The name is visible inside its own body.
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionKind::Function, ctx);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr, ctx),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition, ctx);
                self.resolve_stmt(then_branch, ctx);
                if let Some(else_branch) = else_branch.as_deref() {
                    self.resolve_stmt(else_branch, ctx);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition, ctx);
                self.resolve_stmt(body, Context { in_loop: true, ..ctx });
            }

            Stmt::Return { keyword, value } => {
                if ctx.function == FunctionKind::None {
                    self.errors.push(ResolveError::ReturnOutsideFunction { line: keyword.line });
                }

                if let Some(value) = value {
                    if ctx.function == FunctionKind::Initializer {
                        self.errors.push(ResolveError::ReturnFromInitializer { line: keyword.line });
                    }
                    self.resolve_expr(value, ctx);
                }
            }

            Stmt::Terminate(keyword) => {
                if !ctx.in_loop {
                    self.errors.push(ResolveError::TerminateOutsideLoop {
                        keyword: keyword.lexeme.clone(),
                        line: keyword.line,
                    });
                }
            }
        }
    }

    fn resolve_stmts<'s>(&mut self, statements: &'s [Stmt], ctx: Context<'s>) {
        for stmt in statements {
            self.resolve_stmt(stmt, ctx);
        }
    }

    /// Parameters and body share one scope, matching the single frame a call
    /// creates at run time.
    fn resolve_function<'s>(
        &mut self,
        function: &'s FunctionDecl,
        kind: FunctionKind,
        ctx: Context<'s>,
    ) {
        debug!("Resolving function '{}' as {:?}", function.name.lexeme, kind);

        let ctx = Context {
            function: kind,
            in_loop: false,
            ..ctx
        };

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&function.body, ctx);
        self.end_scope();
    }

    fn resolve_class<'s>(&mut self, class: &'s ClassDecl, ctx: Context<'s>) {
        debug!("Resolving class '{}'", class.name.lexeme);

        self.declare(&class.name);
        self.define(&class.name);

        // Instance and private methods close over a frame holding `this`.
        let instance = Context {
            class: ClassContext::Instance(class),
            ..ctx
        };

        self.begin_scope();
        let this = Token::new(TokenType::THIS, "this", class.name.line);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                this.lexeme.clone(),
                VariableMeta {
                    name: this,
                    initialized: true,
                    accessed: false,
                },
            );
        }

        for method in &class.methods {
            let kind = if method.name.lexeme == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind, instance);
        }
        for method in &class.private_methods {
            self.resolve_function(method, FunctionKind::Method, instance);
        }

        self.end_scope();

        // Static methods close over the class‑declaration frame directly.
        let statics = Context {
            class: ClassContext::Static,
            ..ctx
        };
        for method in &class.static_methods {
            self.resolve_function(method, FunctionKind::StaticMethod, statics);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr<'s>(&mut self, expr: &'s Expr, ctx: Context<'s>) {
        match expr {
            Expr::Variable { id, name } => {
                self.check_initialized(name, ctx);
                self.resolve_local(*id, name, true);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value, ctx);
                self.resolve_local(*id, name, false);
            }

            Expr::This { id, keyword } => match ctx.class {
                ClassContext::None => {
                    self.errors.push(ResolveError::ThisOutsideClass { line: keyword.line });
                }
                ClassContext::Static => {
                    self.errors
                        .push(ResolveError::ThisOutsideInstanceContext { line: keyword.line });
                }
                ClassContext::Instance(_) => self.resolve_local(*id, keyword, true),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                if let (Expr::This { .. }, ClassContext::Instance(class)) = (object.as_ref(), ctx.class) {
                    if !class.declares_field(&name.lexeme) {
                        self.errors.push(ResolveError::UndeclaredFieldAssignment {
                            name: name.lexeme.clone(),
                            class: class.name.lexeme.clone(),
                            line: name.line,
                        });
                    }
                }
                self.resolve_expr(object, ctx);
                self.resolve_expr(value, ctx);
            }

            Expr::Get { object, .. } => self.resolve_expr(object, ctx),

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee, ctx);
                for argument in arguments {
                    self.resolve_expr(argument, ctx);
                }
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left, ctx);
                self.resolve_expr(right, ctx);
            }

            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition, ctx);
                self.resolve_expr(then_branch, ctx);
                self.resolve_expr(else_branch, ctx);
            }

            Expr::Grouping(inner) | Expr::Unary { right: inner, .. } => {
                self.resolve_expr(inner, ctx)
            }

            Expr::Literal(_) => {}
        }
    }

    /// Reads of a name whose initializer is still being resolved.
    fn check_initialized(&mut self, name: &Token, ctx: Context<'_>) {
        let pending_local = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name.lexeme))
            .is_some_and(|meta| !meta.initialized);

        let pending_global = self.scopes.is_empty() && ctx.initializing_global == Some(name.lexeme.as_str());

        if pending_local || pending_global {
            self.errors.push(ResolveError::UseBeforeInit {
                name: name.lexeme.clone(),
                line: name.line,
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        debug!("Begin scope (depth={})", self.scopes.len() + 1);
        self.scopes.push(HashMap::new());
    }

    /// Pops the innermost scope and reports locals that were never read.
    fn end_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        debug!("End scope (depth={})", self.scopes.len() + 1);

        let mut unused: Vec<&VariableMeta> = scope
            .values()
            .filter(|meta| !meta.accessed && meta.name.token_type != TokenType::THIS)
            .collect();
        unused.sort_by(|a, b| {
            (a.name.line, &a.name.lexeme).cmp(&(b.name.line, &b.name.lexeme))
        });

        self.errors
            .extend(unused.into_iter().map(|meta| ResolveError::UnusedVariable {
                name: meta.name.lexeme.clone(),
                line: meta.name.line,
            }));
    }

    /// No-op at global scope: globals are late‑bound.
    fn declare(&mut self, name: &Token) {
        let depth = self.scopes.len();
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.errors.push(ResolveError::DuplicateDeclaration {
                name: name.lexeme.clone(),
                line: name.line,
            });
            return;
        }

        debug!("Declare '{}' in scope {}", name.lexeme, depth);
        scope.insert(
            name.lexeme.clone(),
            VariableMeta {
                name: name.clone(),
                initialized: false,
                accessed: false,
            },
        );
    }

    fn define(&mut self, name: &Token) {
        if let Some(meta) = self
            .scopes
            .last_mut()
            .and_then(|scope| scope.get_mut(&name.lexeme))
        {
            meta.initialized = true;
        }
    }

    /// Records the hop count of the innermost scope declaring `name`.
    /// Unmatched names stay unannotated and resolve as globals.
    fn resolve_local(&mut self, id: ExprId, name: &Token, is_read: bool) {
        let innermost = self.scopes.len().saturating_sub(1);

        for (index, scope) in self.scopes.iter_mut().enumerate().rev() {
            if let Some(meta) = scope.get_mut(&name.lexeme) {
                if is_read {
                    meta.accessed = true;
                }

                let depth = innermost - index;
                debug!("Resolved '{}' {} at depth {}", name.lexeme, id, depth);
                self.bindings.insert(
                    id,
                    Binding {
                        id,
                        name: name.lexeme.clone(),
                        line: name.line,
                        depth,
                    },
                );
                return;
            }
        }

        debug!("'{}' {} left global", name.lexeme, id);
    }
}
