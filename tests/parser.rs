use pretty_assertions::assert_eq;

use rox::ast::{Expr, Stmt};
use rox::ast_printer::AstPrinter;
use rox::error::LoxError;
use rox::lox::scan;
use rox::parser::Parser;

fn parser(source: &str) -> Parser {
    Parser::new(scan(source).expect("source should scan"))
}

fn print_expr(source: &str) -> String {
    let expr = parser(source)
        .parse_expression()
        .expect("source should parse");
    AstPrinter::print(&expr)
}

fn parse_program(source: &str) -> Vec<Stmt> {
    parser(source).parse().expect("program should parse")
}

fn parse_errors(source: &str) -> Vec<String> {
    parser(source)
        .parse()
        .expect_err("program should not parse")
        .iter()
        .map(LoxError::to_string)
        .collect()
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
    assert_eq!(print_expr("-a < !b"), "(< (- a) (! b))");
    assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
}

#[test]
fn conditional_is_right_associative() {
    assert_eq!(print_expr("a ? b : c ? d : e"), "(?: a b (?: c d e))");
    assert_eq!(print_expr("x > 1 ? \"big\" : \"small\""), "(?: (> x 1.0) big small)");
}

#[test]
fn calls_and_properties() {
    assert_eq!(print_expr("f(1, g())"), "(call f 1.0 (call g))");
    assert_eq!(print_expr("a.b.c"), "(. (. a b) c)");
    assert_eq!(print_expr("this.x = 2"), "(= (. this x) 2.0)");
    assert_eq!(print_expr("a = b = 3"), "(= a (= b 3.0))");
}

#[test]
fn variable_references_get_distinct_ids() {
    let statements = parse_program("a = a + a;");

    let Stmt::Expression(Expr::Assign { id, value, .. }) = &statements[0] else {
        panic!("expected an assignment, got {:?}", statements[0]);
    };
    let Expr::Binary { left, right, .. } = value.as_ref() else {
        panic!("expected a binary expression");
    };
    let (Expr::Variable { id: left_id, .. }, Expr::Variable { id: right_id, .. }) =
        (left.as_ref(), right.as_ref())
    else {
        panic!("expected two variable reads");
    };

    assert_ne!(id, left_id);
    assert_ne!(left_id, right_id);
    assert_ne!(id, right_id);
}

#[test]
fn ids_continue_from_starting_point() {
    let mut parser = parser("print x;").starting_at(40);
    let statements = parser.parse().unwrap();

    let Stmt::Print(Expr::Variable { id, .. }) = &statements[0] else {
        panic!("expected a print of a variable");
    };
    assert!(id.0 >= 40);
    assert!(parser.next_id() > id.0);
}

#[test]
fn class_members_are_sorted_by_visibility() {
    let statements = parse_program(
        "class Point {
            x;
            private secret;
            init(x) { this.x = x; }
            private hidden() { return 1; }
            static origin() { return Point(0); }
        }",
    );

    let Stmt::Class(class) = &statements[0] else {
        panic!("expected a class declaration");
    };

    let names = |tokens: Vec<&str>| tokens.join(",");
    assert_eq!(class.name.lexeme, "Point");
    assert_eq!(names(class.fields.iter().map(|t| t.lexeme.as_str()).collect()), "x");
    assert_eq!(
        names(class.private_fields.iter().map(|t| t.lexeme.as_str()).collect()),
        "secret"
    );
    assert_eq!(
        names(class.methods.iter().map(|m| m.name.lexeme.as_str()).collect()),
        "init"
    );
    assert_eq!(
        names(class.private_methods.iter().map(|m| m.name.lexeme.as_str()).collect()),
        "hidden"
    );
    assert_eq!(
        names(class.static_methods.iter().map(|m| m.name.lexeme.as_str()).collect()),
        "origin"
    );
    assert!(class.declares_field("secret"));
    assert!(!class.declares_field("hidden"));
}

#[test]
fn break_and_continue_parse_as_terminate() {
    let statements = parse_program("while (true) { break; continue; }");

    let Stmt::While { body, .. } = &statements[0] else {
        panic!("expected a while loop");
    };
    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected a block body");
    };
    let keywords: Vec<&str> = inner
        .iter()
        .map(|stmt| match stmt {
            Stmt::Terminate(keyword) => keyword.lexeme.as_str(),
            other => panic!("unexpected statement {:?}", other),
        })
        .collect();

    assert_eq!(keywords, vec!["break", "continue"]);
}

#[test]
fn recovers_and_reports_every_error() {
    let errors = parse_errors("var = 1;\nprint 2;\nprint (3;");

    assert_eq!(
        errors,
        vec![
            "[line 1] Error at '=': Expect variable name.".to_string(),
            "[line 3] Error at ';': Expect ')' after expression.".to_string(),
        ]
    );
}

#[test]
fn invalid_assignment_target_is_reported() {
    let errors = parse_errors("1 + 2 = 3;");
    assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
}

#[test]
fn missing_semicolon_at_end() {
    let errors = parse_errors("print 1");
    assert_eq!(errors, vec!["[line 1] Error at end: Expect ';' after value."]);
}

#[test]
fn repl_mode_turns_trailing_expression_into_print() {
    let statements = Parser::new(scan("var a = 1; a + 1").unwrap())
        .repl_mode(true)
        .parse()
        .unwrap();

    assert_eq!(statements.len(), 2);
    assert!(matches!(statements[1], Stmt::Print(Expr::Binary { .. })));
}

#[test]
fn parse_expression_rejects_trailing_tokens() {
    let err = parser("1 2").parse_expression().unwrap_err();
    assert!(err.to_string().contains("Expect end of expression."));
}
