mod common;

use pretty_assertions::assert_eq;

use common::{failure_of, output_of};
use rox::error::{LoxError, RuntimeError};

#[test]
fn construct_and_use_fields() {
    let output = output_of(
        "class Point {
            x;
            y;
            init(x, y) {
                this.x = x;
                this.y = y;
            }
            sum() {
                return this.x + this.y;
            }
        }
        var p = Point(1, 2);
        print p.sum();
        p.x = 10;
        print p.x;
        print p;
        print Point;",
    );

    assert_eq!(output, "3\n10\nPoint instance\nPoint\n");
}

#[test]
fn declared_fields_start_nil() {
    assert_eq!(output_of("class Box { item; } print Box().item;"), "nil\n");
}

#[test]
fn initializer_returns_this() {
    let output = output_of(
        "class Thing {
            name;
            init(name) {
                this.name = name;
                return;
            }
        }
        var t = Thing(\"first\");
        print t.init(\"second\").name;
        print t.name;",
    );

    assert_eq!(output, "second\nsecond\n");
}

#[test]
fn class_arity_follows_init() {
    let (_, error) = failure_of("class P { init(a) { print a; } }\nP();");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::ArityMismatch {
            expected: 1,
            actual: 0,
            ..
        })
    ));

    assert_eq!(output_of("class Empty {} print Empty();"), "Empty instance\n");
}

#[test]
fn private_members_are_reachable_inside_the_class() {
    let output = output_of(
        "class Account {
            private balance;
            init(amount) {
                this.balance = amount;
            }
            private fee() {
                return 1;
            }
            withdraw(n) {
                this.balance = this.balance - n - this.fee();
                return this.balance;
            }
        }
        var a = Account(10);
        print a.withdraw(3);",
    );

    assert_eq!(output, "6\n");
}

#[test]
fn private_field_read_outside_the_class_fails() {
    let (_, error) = failure_of(
        "class Safe { private code; init() { this.code = 1234; } }
         print Safe().code;",
    );

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::PrivateAccessViolation { ref name, .. }) if name == "code"
    ));
}

#[test]
fn private_field_write_outside_the_class_fails() {
    let (_, error) = failure_of("class Safe { private code; }\nSafe().code = 1;");

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::PrivateAccessViolation { line: 2, .. })
    ));
}

#[test]
fn private_method_call_outside_the_class_fails() {
    let (_, error) = failure_of("class Safe { private open() { return 1; } }\nSafe().open();");

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::PrivateAccessViolation { ref name, .. }) if name == "open"
    ));
}

#[test]
fn returned_this_is_a_public_view() {
    let (_, error) = failure_of(
        "class Leaky {
            private secret;
            me() { return this; }
        }
        print Leaky().me().secret;",
    );

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::PrivateAccessViolation { .. })
    ));
}

#[test]
fn undeclared_fields_cannot_be_set_from_outside() {
    let (_, error) = failure_of("class Closed { x; }\nClosed().y = 1;");

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::UndefinedField { ref name, line: 2 }) if name == "y"
    ));
}

#[test]
fn unknown_property_read_fails() {
    let (_, error) = failure_of("class Closed { x; }\nprint Closed().nope;");

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::UndefinedProperty { ref name, .. }) if name == "nope"
    ));
}

#[test]
fn properties_need_an_instance() {
    let (_, error) = failure_of("var n = 3;\nprint n.field;");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::NotAnInstance { line: 2, .. })
    ));

    let (_, error) = failure_of("var n = 3;\nn.field = 1;");
    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::NotAnInstance { line: 2, .. })
    ));
}

#[test]
fn static_methods_are_called_on_the_class() {
    let output = output_of(
        "class Math {
            static square(n) {
                return n * n;
            }
        }
        print Math.square(4);
        print Math.square;",
    );

    assert_eq!(output, "16\n<fn square>\n");
}

#[test]
fn unknown_static_method_fails() {
    let (_, error) = failure_of("class Math {}\nMath.cube(2);");

    assert!(matches!(
        error,
        LoxError::Runtime(RuntimeError::UndefinedStaticMethod { ref name, line: 2 }) if name == "cube"
    ));
}

#[test]
fn static_method_can_construct_its_class() {
    let output = output_of(
        "class Point {
            x;
            init(x) { this.x = x; }
            static origin() { return Point(0); }
        }
        print Point.origin().x;",
    );

    assert_eq!(output, "0\n");
}

#[test]
fn bound_methods_are_fresh_but_share_state() {
    let output = output_of(
        "class Counter {
            n;
            init() { this.n = 0; }
            bump() { this.n = this.n + 1; return this.n; }
        }
        var c = Counter();
        var first = c.bump;
        var second = c.bump;
        print first == second;
        first();
        print second();
        print c.n;",
    );

    assert_eq!(output, "false\n2\n2\n");
}

#[test]
fn instances_compare_by_identity() {
    let output = output_of(
        "class Node {
            self() { return this; }
        }
        var a = Node();
        var b = Node();
        print a == a;
        print a == b;
        print a.self() == a;",
    );

    assert_eq!(output, "true\nfalse\ntrue\n");
}

#[test]
fn methods_close_over_their_declaration_scope() {
    let output = output_of(
        "fun make(greeting) {
            class Greeter {
                greet(name) { return greeting + \", \" + name; }
            }
            return Greeter;
        }
        var G = make(\"hello\");
        print G().greet(\"rox\");",
    );

    assert_eq!(output, "hello, rox\n");
}
