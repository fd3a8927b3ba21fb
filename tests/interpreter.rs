mod common;

use pretty_assertions::assert_eq;

use common::{failure_of, on_large_stack, output_of, run};
use rox::error::{LoxError, RuntimeError};

#[test]
fn prints_values_in_canonical_form() {
    let output = output_of(
        "print 1;
         print 2.5;
         print -0.5 + 1;
         print \"text\";
         print nil;
         print true;
         print !true;
         print 10 / 4;
         print clock;",
    );

    assert_eq!(
        output,
        "1\n2.5\n0.5\ntext\nnil\ntrue\nfalse\n2.5\n<native fn>\n"
    );
}

#[test]
fn large_and_signed_numbers_print_exactly() {
    let output = output_of(
        "print 100000000000000000000000;
         print 123456789012;
         print -0;
         print 0.1 + 0.2;
         print 1 / 0;",
    );

    assert_eq!(
        output,
        "100000000000000000000000\n123456789012\n-0\n0.30000000000000004\ninf\n"
    );
}

#[test]
fn shadowing_and_blocks() {
    assert_eq!(output_of("var a = 1; { var a = 2; print a; } print a;"), "2\n1\n");
}

#[test]
fn closures_capture_the_variable() {
    let output = output_of("{ var a = 1; fun f() { print a; } a = 2; f(); }");
    assert_eq!(output, "2\n");
}

#[test]
fn closure_survives_its_block() {
    let output = output_of(
        "fun makeCounter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }
        var counter = makeCounter();
        print counter();
        print counter();
        var other = makeCounter();
        print other();",
    );

    assert_eq!(output, "1\n2\n1\n");
}

#[test]
fn closures_bind_lexically_not_dynamically() {
    let output = output_of(
        "var a = \"global\";
        {
            fun show() {
                print a;
            }
            show();
            var a = \"block\";
            show();
            print a;
        }",
    );

    assert_eq!(output, "global\nglobal\nblock\n");
}

#[test]
fn truthiness() {
    let output = output_of(
        "if (0) print \"yes\"; else print \"no\";
         if (\"\") print \"yes\"; else print \"no\";
         if (nil) print \"yes\"; else print \"no\";
         if (false) print \"yes\"; else print \"no\";",
    );

    assert_eq!(output, "yes\nyes\nno\nno\n");
}

#[test]
fn logical_operators_short_circuit() {
    let output = output_of(
        "fun f() { print \"called\"; return true; }
         print false and f();
         print true or f();
         print nil or \"fallback\";
         print 1 and 2;",
    );

    assert_eq!(output, "false\ntrue\nfallback\n2\n");
}

#[test]
fn conditional_expression_evaluates_one_branch() {
    let output = output_of(
        "fun loud(x) { print x; return x; }
         print 3 > 2 ? loud(\"then\") : loud(\"else\");",
    );

    assert_eq!(output, "then\nthen\n");
}

#[test]
fn continue_skips_to_next_iteration() {
    let output = output_of(
        "var i = 0;
         while (i < 5) {
             i = i + 1;
             if (i == 3) continue;
             print i;
         }",
    );

    assert_eq!(output, "1\n2\n4\n5\n");
}

#[test]
fn break_exits_nearest_loop_only() {
    let output = output_of(
        "var i = 0;
         while (i < 3) {
             i = i + 1;
             var j = 0;
             while (true) {
                 j = j + 1;
                 if (j > i) break;
             }
             print j;
         }",
    );

    assert_eq!(output, "2\n3\n4\n");
}

#[test]
fn return_unwinds_through_loops() {
    let output = output_of(
        "fun find(limit) {
             var n = 0;
             while (true) {
                 n = n + 1;
                 if (n * n > limit) return n;
             }
         }
         print find(10);",
    );

    assert_eq!(output, "4\n");
}

#[test]
fn recursion() {
    let output = output_of(
        "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
         print fib(10);",
    );

    assert_eq!(output, "55\n");
}

#[test]
fn functions_without_return_yield_nil() {
    assert_eq!(output_of("fun f() {} print f(); print f;"), "nil\n<fn f>\n");
}

#[test]
fn equality_rules() {
    let output = output_of(
        "fun f() {}
         print 1 == 1;
         print \"a\" == \"a\";
         print nil == false;
         print 1 == \"1\";
         print f == f;
         print clock == clock;",
    );

    assert_eq!(output, "true\ntrue\nfalse\nfalse\ntrue\ntrue\n");
}

#[test]
fn division_by_zero_follows_ieee() {
    assert_eq!(output_of("print 1 / 0 > 1000000;"), "true\n");
}

#[test]
fn clock_returns_seconds() {
    assert_eq!(output_of("print clock() > 1000000000;"), "true\n");
}

#[test]
fn plus_requires_matching_operands() {
    let (_, error) = failure_of("print 1 + \"a\";");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::AmbiguousPlusOperands { line: 1 })
    ));
    assert_eq!(
        error.to_string(),
        "[line 1] RuntimeError at '+': Operands must be two numbers or two strings."
    );
}

#[test]
fn arithmetic_type_errors() {
    let (_, error) = failure_of("print -\"a\";");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::NotANumber { ref operator, .. }) if operator == "-"
    ));

    let (_, error) = failure_of("print 2 < \"b\";");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::MixedOrNonNumericOperands { ref operator, .. }) if operator == "<"
    ));
}

#[test]
fn runtime_error_stops_the_program() {
    let (output, error) = failure_of("print 1;\nprint missing;\nprint 3;");

    assert_eq!(output, "1\n");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::UndefinedVariable { ref name, line: 2 }) if name == "missing"
    ));
}

#[test]
fn assigning_an_undefined_global_fails() {
    let (_, error) = failure_of("ghost = 1;");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::UndefinedVariable { .. })
    ));
}

#[test]
fn call_errors() {
    let (_, error) = failure_of("fun f(a, b) { return a + b; }\nf(1);");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::ArityMismatch {
            expected: 2,
            actual: 1,
            line: 2
        })
    ));

    let (_, error) = failure_of("\"not a function\"();");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::NotCallable { .. })
    ));
}

#[test]
fn static_errors_prevent_execution() {
    let (output, result) = run("print \"before\";\n{ var a = 1; var a = 2; print a; }");

    assert_eq!(output, "");
    let errors = result.unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_static());
}

#[test]
fn scan_errors_are_all_reported() {
    let (output, result) = run("print 1; @ $");

    assert_eq!(output, "");
    let messages: Vec<String> = result
        .unwrap_err()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        messages,
        vec![
            "[line 1] Error: Unexpected character: @",
            "[line 1] Error: Unexpected character: $",
        ]
    );
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let (output, error) = on_large_stack(|| {
        failure_of("print \"start\";\nfun spin(n) { return spin(n + 1); }\nspin(0);")
    });

    assert_eq!(output, "start\n");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::StackOverflow { line: 2 })
    ));
    assert_eq!(
        error.to_string(),
        "[line 2] RuntimeError at ')': Stack overflow."
    );
}

#[test]
fn deep_recursion_below_the_limit_completes() {
    let output = on_large_stack(|| {
        output_of(
            "fun down(n) { if (n == 0) return \"bottom\"; return down(n - 1); }
             print down(500);",
        )
    });

    assert_eq!(output, "bottom\n");
}
