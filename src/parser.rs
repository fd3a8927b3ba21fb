/*!
Recursive‑descent parser for Rox.

Definitions
-----------
* **n** = number of tokens (including the sole EOF).

Each token is consumed once via `advance()`; error recovery (`synchronize`)
discards tokens up to the next statement boundary, so parsing is **Θ(n)**
overall and keeps going after an error so that one run reports every syntax
error in the file.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths (`consume`, etc.)| `debug`| Context before returning structured error.|

Grammar
-------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT "{" member* "}" ;
member         → "static" function
               | "private"? IDENT ";"
               | "private"? function ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | whileStmt | ifStmt
               | block | returnStmt | terminateStmt ;
terminateStmt  → ( "break" | "continue" ) ";" ;
exprStmt       → expression ";" ;
printStmt      → "print" expression ";" ;
whileStmt      → "while" "(" expression ")" statement ;
ifStmt         → "if" "(" expression ")" statement ( "else" statement )? ;
block          → "{" declaration* "}" ;
returnStmt     → "return" expression? ";" ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → conditional ( ( "!=" | "==" ) conditional )* ;
conditional    → comparison ( "?" conditional ":" conditional )? ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" ;
```

In REPL mode a trailing `;` may be omitted on the last statement of the input;
a bare expression written that way is turned into a `print` statement.
*/

use std::rc::Rc;

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

const MAX_ARGS: usize = 255;

/// A class body entry before it is sorted into its visibility bucket.
enum Member {
    Field(Token),
    Method(Rc<FunctionDecl>),
}

/// Top‑level parser over an owned token vector.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: usize,
    repl_mode: bool,
    errors: Vec<LoxError>,
}

impl Parser {
    /// Construct a new parser.  A missing trailing EOF token is supplied.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        let line: usize = tokens.last().map_or(1, |t| t.line);
        if !matches!(tokens.last(), Some(t) if t.token_type == TokenType::EOF) {
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            next_id: 0,
            repl_mode: false,
            errors: Vec::new(),
        }
    }

    /// Start numbering [`ExprId`]s at `first_id`.  The REPL threads the
    /// counter from one line to the next so hop‑count tables never collide.
    pub fn starting_at(mut self, first_id: usize) -> Self {
        self.next_id = first_id;
        self
    }

    /// Allow the final `;` of the input to be omitted (interactive prompt).
    pub fn repl_mode(mut self, enabled: bool) -> Self {
        self.repl_mode = enabled;
        self
    }

    /// The first [`ExprId`] not yet handed out.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program and return its statement list, or every syntax
    /// error found.
    pub fn parse(&mut self) -> std::result::Result<Vec<Stmt>, Vec<LoxError>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => self.errors.push(e),
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} statement(s)", statements.len());
            Ok(statements)
        } else {
            info!("Parse failed with {} error(s)", self.errors.len());
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Parse a single expression followed by EOF.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        info!("Parsing a single expression");

        let expr: Expr = self.expression()?;

        if let Some(e) = self.errors.drain(..).next() {
            return Err(e);
        }

        if !self.is_at_end() {
            return Err(self.error_at_current("Expect end of expression."));
        }

        Ok(expr)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration");

        let result = if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            self.function("function").map(Stmt::Function)
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        if result.is_err() {
            self.synchronize();
        }

        result
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut class = ClassDecl {
            name,
            methods: Vec::new(),
            static_methods: Vec::new(),
            private_methods: Vec::new(),
            fields: Vec::new(),
            private_fields: Vec::new(),
        };

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if self.matches(TokenType::STATIC) {
                class.static_methods.push(self.function("static method")?);
            } else if self.matches(TokenType::PRIVATE) {
                match self.class_member()? {
                    Member::Field(field) => class.private_fields.push(field),
                    Member::Method(method) => class.private_methods.push(method),
                }
            } else {
                match self.class_member()? {
                    Member::Field(field) => class.fields.push(field),
                    Member::Method(method) => class.methods.push(method),
                }
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!(
            "Parsed class '{}' ({} methods, {} static, {} private methods, {} fields, {} private fields)",
            class.name.lexeme,
            class.methods.len(),
            class.static_methods.len(),
            class.private_methods.len(),
            class.fields.len(),
            class.private_fields.len()
        );

        Ok(Stmt::Class(class))
    }

    /// `IDENT ";"` is a field, `IDENT "(" … ")" block` a method.
    fn class_member(&mut self) -> Result<Member> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class member name.")?;

        if self.matches(TokenType::SEMICOLON) {
            return Ok(Member::Field(name));
        }

        Ok(Member::Method(self.finish_function("method", name)?))
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token =
            self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?;

        self.finish_function(kind, name)
    }

    fn finish_function(&mut self, kind: &str, name: Token) -> Result<Rc<FunctionDecl>> {
        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    let e = self.error_at_current("Can't have more than 255 parameters.");
                    self.errors.push(e);
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        if self.should_consume_semicolon() {
            self.consume(
                TokenType::SEMICOLON,
                "Expect ';' after variable declaration.",
            )?;
        }

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement");

        if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::BREAK) || self.matches(TokenType::CONTINUE) {
            self.terminate_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        if self.should_consume_semicolon() {
            self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;
        }

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;

        if self.should_consume_semicolon() {
            self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;
            return Ok(Stmt::Expression(expr));
        }

        // REPL: a bare trailing expression echoes its value.
        Ok(Stmt::Print(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn terminate_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        self.consume(
            TokenType::SEMICOLON,
            &format!("Expect ';' after '{}'.", keyword.lexeme),
        )?;

        Ok(Stmt::Terminate(keyword))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            match expr {
                Expr::Variable { id, name } => {
                    return Ok(Expr::Assign {
                        id,
                        name,
                        value: Box::new(value),
                    });
                }

                Expr::Get { object, name } => {
                    return Ok(Expr::Set {
                        object,
                        name,
                        value: Box::new(value),
                    });
                }

                other => {
                    // Reported, but the parser is not confused: keep going.
                    debug!("Invalid assignment target on line {}", equals.line);
                    self.errors.push(LoxError::parse(
                        equals.line,
                        Some(&equals.lexeme),
                        "Invalid assignment target.",
                    ));
                    return Ok(other);
                }
            }
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.conditional()?;

        while self.matches(TokenType::BANG_EQUAL) || self.matches(TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.conditional()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr> {
        let expr: Expr = self.comparison()?;

        if self.matches(TokenType::QUESTION) {
            let then_branch: Expr = self.conditional()?;
            self.consume(TokenType::COLON, "Expect ':' after '?' branch.")?;
            let else_branch: Expr = self.conditional()?;

            return Ok(Expr::Conditional {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;

        while self.matches(TokenType::GREATER)
            || self.matches(TokenType::GREATER_EQUAL)
            || self.matches(TokenType::LESS)
            || self.matches(TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.matches(TokenType::MINUS) || self.matches(TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(TokenType::STAR) || self.matches(TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    let e = self.error_at_current("Can't have more than 255 arguments.");
                    self.errors.push(e);
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Number(n)));
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s: String = s.clone();
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenType::THIS) {
            let keyword: Token = self.previous().clone();
            return Ok(Expr::This {
                id: self.fresh_id(),
                keyword,
            });
        }

        if self.matches(TokenType::IDENTIFIER) {
            let name: Token = self.previous().clone();
            return Ok(Expr::Variable {
                id: self.fresh_id(),
                name,
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(self.error_at_current("Expect expression."))
    }

    // ────────────────────── utility helpers ───────────────────────

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    /// In REPL mode the very last statement may leave off its `;`.
    fn should_consume_semicolon(&self) -> bool {
        !self.repl_mode || !self.is_at_end()
    }

    fn error_at_current(&self, message: &str) -> LoxError {
        let token: &Token = self.peek();
        debug!("Parse error at line {}: {}", token.line, message);

        let lexeme: Option<&str> = if token.token_type == TokenType::EOF {
            None
        } else {
            Some(&token.lexeme)
        };

        LoxError::parse(token.line, lexeme, message)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        Err(self.error_at_current(message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK
                | TokenType::CONTINUE => return,
                _ => {}
            }

            self.advance();
        }
    }
}
