//! Abstract syntax tree for Rox.
//!
//! Two closed families, [`Expr`] and [`Stmt`], matched exhaustively by the
//! resolver and the interpreter.  Nodes are never mutated after parsing: the
//! resolver's hop counts live in a side table keyed by [`ExprId`], which the
//! parser hands out to every node that reads or writes a variable.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::token::Token;

/// Identity of a variable‑referencing expression (`Variable`, `Assign`, `This`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value out of the token so the tree does not depend
/// on the scanner's output buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in Rox.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary { operator: Token, right: Box<Expr> },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Ternary `condition ? then_branch : else_branch`.
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function‑, method‑ or constructor call.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The 'this' keyword inside a method.
    This { id: ExprId, keyword: Token },
}

/// A named function or method: parameters plus body.
///
/// Shared behind an `Rc` so runtime closures keep the declaration alive
/// without cloning the body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// `class Name { … }` with its members sorted by visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Token,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub static_methods: Vec<Rc<FunctionDecl>>,
    pub private_methods: Vec<Rc<FunctionDecl>>,
    pub fields: Vec<Token>,
    pub private_fields: Vec<Token>,
}

impl ClassDecl {
    /// Whether `name` is declared as a field (public or private).
    pub fn declares_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .chain(self.private_fields.iter())
            .any(|field| field.lexeme == name)
    }
}

/// Complete executable constructs.  A program is a sequence of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration ‑ becomes a first‑class callable value.
    Function(Rc<FunctionDecl>),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class(ClassDecl),

    /// `break` or `continue`; the token says which.
    Terminate(Token),
}
