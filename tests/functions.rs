mod common;

use common::{completed, raised};
use ebs::Value;

#[test]
fn test_function_keyword_is_optional() {
    let with_keyword = "\
function twofold(n) { return n * 2; }
twofold(21);";
    let without_keyword = "\
twofold(n) { return n * 2; }
twofold(21);";
    assert_eq!(completed(with_keyword), Value::Int(42));
    assert_eq!(completed(without_keyword), Value::Int(42));
}

#[test]
fn test_missing_return_yields_null() {
    let source = "\
function noop() { var x = 1; }
noop();";
    assert_eq!(completed(source), Value::Null);
}

#[test]
fn test_default_parameters() {
    let source = "\
function greet(name, punct = \"!\") { return name + punct; }
greet(\"hi\");";
    assert_eq!(completed(source), Value::string("hi!"));
}

#[test]
fn test_default_may_reference_earlier_parameter() {
    let source = "\
function span(lo, hi = lo + 10) { return hi - lo; }
span(5);";
    assert_eq!(completed(source), Value::Int(10));
}

#[test]
fn test_named_arguments_override_position() {
    let source = "\
function make(w, h = 1, d = 1) { return w * h * d; }
make(2, d = 5);";
    assert_eq!(completed(source), Value::Int(10));
}

#[test]
fn test_unknown_named_argument_is_type_error() {
    let (kind, message, _) = raised(
        "function f(a) { return a; }\nf(1, b = 2);",
    );
    assert_eq!(kind, "TYPE_ERROR");
    assert!(message.contains("'b'"));
}

#[test]
fn test_missing_required_argument_is_type_error() {
    let (kind, _, _) = raised("function f(a, b) { return a; }\nf(1);");
    assert_eq!(kind, "TYPE_ERROR");
}

#[test]
fn test_too_many_positional_arguments_is_type_error() {
    let (kind, _, _) = raised("function f(a) { return a; }\nf(1, 2);");
    assert_eq!(kind, "TYPE_ERROR");
}

#[test]
fn test_typed_parameters_coerce_arguments() {
    let source = "\
function half(n: int) { return n / 2; }
half(9.9);";
    assert_eq!(completed(source), Value::Int(4));
}

#[test]
fn test_return_type_casts_result() {
    let source = "\
function ratio(a, b): double { return a / b; }
typeof(ratio(7, 2));";
    assert_eq!(completed(source), Value::string("double"));
}

#[test]
fn test_recursion() {
    let source = "\
function fib(n) {
    if (n < 2) { return n; }
    return fib(n - 1) + fib(n - 2);
}
fib(10);";
    assert_eq!(completed(source), Value::Int(55));
}

#[test]
fn test_unbounded_recursion_is_caught() {
    let (kind, _, _) = raised("function loop() { return loop(); }\nloop();");
    assert_eq!(kind, "VALIDATION_ERROR");
}

#[test]
fn test_closures_share_captured_state() {
    let source = "\
function make_counter() {
    var n = 0;
    function next() {
        n += 1;
        return n;
    }
    return next;
}
var a = make_counter();
var b = make_counter();
a();
a();
b();";
    assert_eq!(completed(source), Value::Int(1));
}

#[test]
fn test_closure_declared_in_a_block_keeps_its_locals() {
    let source = "\
var f = 0;
if (true) {
    var n = 5;
    function g() { return n; }
    f = g;
}
f();";
    assert_eq!(completed(source), Value::Int(5));
}

#[test]
fn test_closure_captures_the_loop_iteration_variable() {
    let source = "\
var first = 0;
var last = 0;
foreach i in [10, 20] {
    function cap() { return i; }
    if (first == 0) {
        first = cap;
    }
    last = cap;
}
first() + last();";
    assert_eq!(completed(source), Value::Int(30));
}

#[test]
fn test_functions_are_first_class_values() {
    let source = "\
function twice(f, x) { return f(f(x)); }
function inc(n) { return n + 1; }
twice(inc, 5);";
    assert_eq!(completed(source), Value::Int(7));
}

#[test]
fn test_calling_a_non_function_is_type_error() {
    let (kind, _, _) = raised("var x = 3;\nx(1);");
    assert_eq!(kind, "TYPE_ERROR");
}

#[test]
fn test_calling_an_undefined_name_is_not_found() {
    let (kind, _, _) = raised("ghost();");
    assert_eq!(kind, "NOT_FOUND_ERROR");
}

#[test]
fn test_function_names_are_case_insensitive() {
    let source = "\
function Shout(s) { return string.upper(s); }
SHOUT(\"ok\");";
    assert_eq!(completed(source), Value::string("OK"));
}
