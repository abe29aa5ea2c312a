mod common;

use common::{completed, raised};
use ebs::Value;

#[test]
fn test_if_else_chains() {
    let source = "\
var grade = \"\";
var score = 72;
if (score >= 90) { grade = \"A\"; }
else if (score >= 70) { grade = \"B\"; }
else { grade = \"C\"; }
grade;";
    assert_eq!(completed(source), Value::string("B"));
}

#[test]
fn test_if_then_single_statement_form() {
    let source = "\
var x = 0;
if (true) then x = 1;
x;";
    assert_eq!(completed(source), Value::Int(1));
}

#[test]
fn test_condition_must_be_bool() {
    let (kind, _, _) = raised("if (1) { print 1; }");
    assert_eq!(kind, "TYPE_ERROR");
    let (kind, _, _) = raised("while (\"yes\") { break; }");
    assert_eq!(kind, "TYPE_ERROR");
}

#[test]
fn test_while_accumulates() {
    let source = "\
var total = 0;
var i = 1;
while (i <= 5) {
    total += i;
    i++;
}
total;";
    assert_eq!(completed(source), Value::Int(15));
}

#[test]
fn test_do_while_runs_at_least_once() {
    let source = "\
var n = 0;
do {
    n++;
} while (false);
n;";
    assert_eq!(completed(source), Value::Int(1));
}

#[test]
fn test_for_with_full_header() {
    let source = "\
var total = 0;
for (var i = 0; i < 4; i++) {
    total += i;
}
total;";
    assert_eq!(completed(source), Value::Int(6));
}

#[test]
fn test_for_with_empty_header_and_break() {
    let source = "\
var i = 0;
for (;;) {
    i++;
    if (i == 3) { break; }
}
i;";
    assert_eq!(completed(source), Value::Int(3));
}

#[test]
fn test_continue_skips_iteration() {
    let source = "\
var evens = 0;
for (var i = 0; i < 10; i++) {
    if (i % 2 == 1) { continue; }
    evens++;
}
evens;";
    assert_eq!(completed(source), Value::Int(5));
}

#[test]
fn test_foreach_over_array() {
    let source = "\
var total = 0;
foreach n in [1, 2, 3, 4] {
    total += n;
}
total;";
    assert_eq!(completed(source), Value::Int(10));
}

#[test]
fn test_foreach_over_string_chars() {
    let source = "\
var count = 0;
foreach c in \"hello\" {
    count++;
}
count;";
    assert_eq!(completed(source), Value::Int(5));
}

#[test]
fn test_foreach_over_json_object_yields_keys() {
    let source = "\
var keys = \"\";
foreach k in {\"x\": 1, \"y\": 2} {
    keys += k;
}
keys;";
    assert_eq!(completed(source), Value::string("xy"));
}

#[test]
fn test_foreach_over_null_is_null_error() {
    let (kind, _, _) = raised("var nothing = null;\nforeach x in nothing { print x; }");
    assert_eq!(kind, "NULL_ERROR");
}

#[test]
fn test_loop_variable_is_scoped_per_iteration() {
    let source = "\
var outside = 0;
foreach n in [1, 2] {
    var inner = n * 10;
    outside = inner;
}
outside;";
    assert_eq!(completed(source), Value::Int(20));
}

#[test]
fn test_block_scope_restored_after_exception() {
    let source = "\
var x = 1;
try {
    var x = 2;
    raise exception IO_ERROR(\"boom\");
} exceptions {
    when IO_ERROR { }
}
x;";
    assert_eq!(completed(source), Value::Int(1));
}

#[test]
fn test_nested_loops_break_inner_only() {
    let source = "\
var count = 0;
for (var i = 0; i < 3; i++) {
    for (var j = 0; j < 10; j++) {
        if (j == 2) { break; }
        count++;
    }
}
count;";
    assert_eq!(completed(source), Value::Int(6));
}

#[test]
fn test_keyword_case_is_insensitive() {
    let source = "\
VAR total = 0;
WHILE (total < 3) {
    total++;
}
total;";
    assert_eq!(completed(source), Value::Int(3));
}

#[test]
fn test_exit_is_a_break_alias() {
    let source = "\
var i = 0;
while (true) {
    i++;
    if (i == 2) { exit; }
}
i;";
    assert_eq!(completed(source), Value::Int(2));
}
