//! End-to-end programs run through the public `Lox` facade.

use rlox::{Lox, LoxError};

fn run(source: &str) -> (String, Vec<LoxError>) {
    let mut lox = Lox::new();
    let mut stdout = Vec::new();
    let errors = lox.run(source, &mut stdout);
    (String::from_utf8(stdout).expect("output is utf-8"), errors)
}

fn run_lines(source: &str) -> Vec<String> {
    let (output, errors) = run(source);
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    output.lines().map(str::to_string).collect()
}

#[test]
fn fibonacci() {
    let source = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
    "#;
    assert_eq!(run_lines(source), vec!["55"]);
}

#[test]
fn counter_closure() {
    let source = r#"
        fun make() {
            var i = 0;
            fun inc() {
                i = i + 1;
                return i;
            }
            return inc;
        }
        var c = make();
        print c();
        print c();
        print c();
    "#;
    assert_eq!(run_lines(source), vec!["1", "2", "3"]);
}

#[test]
fn inheritance_with_super() {
    let source = r#"
        class A { greet() { print "hi from A"; } }
        class B < A {
            greet() {
                super.greet();
                print "and B";
            }
        }
        B().greet();
    "#;
    assert_eq!(run_lines(source), vec!["hi from A", "and B"]);
}

#[test]
fn initializer_stores_constructor_arguments() {
    let source = r#"
        class P { init(x) { this.x = x; } }
        print P(42).x;
    "#;
    assert_eq!(run_lines(source), vec!["42"]);
}

#[test]
fn ternary_over_list_with_len() {
    let source = "var xs = [1, 2, 3]; print (len(xs) == 3) ? xs[1] : -1;";
    assert_eq!(run_lines(source), vec!["2"]);
}

#[test]
fn type_mismatch_halts_with_a_runtime_error() {
    let (output, errors) = run("print \"a\" - 1;");
    assert!(output.is_empty());
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        LoxError::Runtime { line, .. } => assert_eq!(*line, 1),
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn lexical_scoping_with_shadowing() {
    let source = r#"
        var a = "outer";
        {
            var a = "inner";
            print a;
        }
        print a;
    "#;
    assert_eq!(run_lines(source), vec!["inner", "outer"]);
}

#[test]
fn method_binding_persists_after_detachment() {
    let source = r#"
        class P {
            init(name) { this.name = name; }
            who() { return this.name; }
        }
        var p = P("original");
        var m = p.who;
        var q = P("other");
        print m();
        print q.who();
    "#;
    assert_eq!(run_lines(source), vec!["original", "other"]);
}

#[test]
fn short_circuit_is_observable_through_side_effects() {
    let source = r#"
        var log = "";
        fun note(tag, result) {
            log = log + tag;
            return result;
        }
        note("a", true) or note("b", true);
        note("c", false) and note("d", true);
        note("e", false) or note("f", true);
        print log;
    "#;
    assert_eq!(run_lines(source), vec!["acef"]);
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let source = r#"
        for (var i = 0; i < 2; i = i + 1) {
            for (var j = 0; j < 10; j = j + 1) {
                if (j == 1) break;
                print j;
            }
        }
        print "after";
    "#;
    assert_eq!(run_lines(source), vec!["0", "0", "after"]);
}

#[test]
fn equality_and_identity() {
    let source = r#"
        print nil == nil;
        print "a" == "a";
        class P {}
        var x = P();
        var y = P();
        print x == y;
        print x == x;
    "#;
    assert_eq!(run_lines(source), vec!["true", "true", "false", "true"]);
}

#[test]
fn empty_collections_are_truthy() {
    let source = r#"
        if ([]) print "list"; else print "no";
        if ({}) print "dict"; else print "no";
        if ("") print "string"; else print "no";
        if (0) print "zero"; else print "no";
    "#;
    assert_eq!(run_lines(source), vec!["list", "dict", "string", "zero"]);
}

#[test]
fn dicts_round_trip_values() {
    let source = r#"
        var d = {"one": 1, "two": 2};
        print d["one"] + d["two"];
    "#;
    assert_eq!(run_lines(source), vec!["3"]);
}

#[test]
fn while_fibonacci_iterative() {
    let source = r#"
        var a = 0;
        var b = 1;
        var n = 0;
        while (n < 10) {
            var next = a + b;
            a = b;
            b = next;
            n = n + 1;
        }
        print a;
    "#;
    assert_eq!(run_lines(source), vec!["55"]);
}

#[test]
fn deep_closure_chain_resolves_depths() {
    let source = r#"
        fun level1() {
            var x = "found";
            fun level2() {
                fun level3() {
                    fun level4() { return x; }
                    return level4();
                }
                return level3();
            }
            return level2();
        }
        print level1();
    "#;
    assert_eq!(run_lines(source), vec!["found"]);
}

#[test]
fn arity_is_enforced_for_every_callable() {
    for source in [
        "fun f(a) {} f();",
        "fun g() {} g(1);",
        "class P { init(a) {} } P();",
        "len(\"a\", \"b\");",
    ] {
        let (_, errors) = run(source);
        assert_eq!(errors.len(), 1, "source {:?}", source);
        match &errors[0] {
            LoxError::Runtime { message, .. } => {
                assert!(message.contains("arguments but got"), "source {:?}", source);
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }
}
