mod common;

use common::{completed, raised};
use ebs::Value;

#[test]
fn test_string_namespace() {
    assert_eq!(completed("string.len(\"abc\");"), Value::Int(3));
    assert_eq!(completed("string.upper(\"abc\");"), Value::string("ABC"));
    assert_eq!(completed("string.lower(\"ABC\");"), Value::string("abc"));
    assert_eq!(completed("string.trim(\"  hi  \");"), Value::string("hi"));
    assert_eq!(completed("string.substr(\"hello\", 1, 3);"), Value::string("el"));
    assert_eq!(
        completed("string.replace(\"a-b-c\", \"-\", \"+\");"),
        Value::string("a+b+c")
    );
    assert_eq!(completed("string.contains(\"hello\", \"ell\");"), Value::Bool(true));
    assert_eq!(completed("string.index_of(\"hello\", \"l\");"), Value::Int(2));
    assert_eq!(completed("string.index_of(\"hello\", \"z\");"), Value::Int(-1));
    assert_eq!(completed("string.starts_with(\"hello\", \"he\");"), Value::Bool(true));
    assert_eq!(completed("string.ends_with(\"hello\", \"lo\");"), Value::Bool(true));
}

#[test]
fn test_string_split_makes_dynamic_array() {
    let source = "\
var parts = string.split(\"a,b,c\", \",\");
parts[1] + \"/\" + parts.length;";
    assert_eq!(completed(source), Value::string("b/3"));
}

#[test]
fn test_array_namespace() {
    assert_eq!(completed("var a = [1]; array.push(a, 2); a.length;"), Value::Int(2));
    assert_eq!(completed("var a = [1, 2]; array.pop(a);"), Value::Int(2));
    assert_eq!(completed("var a = [3, 1, 2]; array.sort(a); a[0];"), Value::Int(1));
    assert_eq!(
        completed("var a = [\"b\", \"a\"]; array.sort(a); a[0];"),
        Value::string("a")
    );
    assert_eq!(completed("var a = [1, 2, 3]; array.reverse(a); a[0];"), Value::Int(3));
    assert_eq!(
        completed("array.join([1, 2, 3], \"-\");"),
        Value::string("1-2-3")
    );
    assert_eq!(completed("var s = array.slice([1, 2, 3, 4], 1, 3); s.length;"), Value::Int(2));
    assert_eq!(completed("array.contains([1, 2], 2);"), Value::Bool(true));
    assert_eq!(completed("var a = [1, 2]; array.clear(a); a.length;"), Value::Int(0));
}

#[test]
fn test_array_push_to_fixed_array_is_type_error() {
    let (kind, _, _) = raised("var a: array.int[2];\narray.push(a, 3);");
    assert_eq!(kind, "TYPE_ERROR");
}

#[test]
fn test_json_namespace() {
    assert_eq!(
        completed("var j = json.parse(\"{\\\"a\\\": 1}\"); j.a;"),
        Value::Int(1)
    );
    assert_eq!(
        completed("json.stringify({\"a\": 1});"),
        Value::string("{\"a\":1}")
    );
    assert_eq!(
        completed("var ks = json.keys({\"a\": 1, \"b\": 2}); ks[1];"),
        Value::string("b")
    );
    assert_eq!(
        completed("var vs = json.values({\"a\": 7}); vs[0];"),
        Value::Int(7)
    );
    assert_eq!(completed("json.has({\"a\": 1}, \"a\");"), Value::Bool(true));
    assert_eq!(completed("json.has({\"a\": 1}, \"z\");"), Value::Bool(false));
    assert_eq!(
        completed("var j = {\"a\": 1, \"b\": 2}; json.remove(j, \"a\"); j.length;"),
        Value::Int(1)
    );
}

#[test]
fn test_json_parse_failure_is_parse_error() {
    let (kind, _, _) = raised("json.parse(\"{oops\");");
    assert_eq!(kind, "PARSE_ERROR");
}

#[test]
fn test_queue_namespace() {
    let source = "\
var q: queue.int;
queue.push(q, 1);
queue.push(q, 2);
var first = queue.pop(q);
\"\" + first + \":\" + queue.peek(q) + \":\" + queue.len(q);";
    assert_eq!(completed(source), Value::string("1:2:1"));
    assert_eq!(completed("var q: queue.int; queue.pop(q);"), Value::Null);
    assert_eq!(
        completed("var q: queue.int; queue.push(q, 1); queue.clear(q); queue.len(q);"),
        Value::Int(0)
    );
}

#[test]
fn test_math_namespace() {
    assert_eq!(completed("math.abs(-3);"), Value::Int(3));
    assert_eq!(completed("math.abs(-3.5);"), Value::Double(3.5));
    assert_eq!(completed("math.min(2, 9);"), Value::Int(2));
    assert_eq!(completed("math.max(2, 9);"), Value::Int(9));
    assert_eq!(completed("math.floor(3.7);"), Value::Double(3.0));
    assert_eq!(completed("math.ceil(3.2);"), Value::Double(4.0));
    assert_eq!(completed("math.round(3.5);"), Value::Double(4.0));
    assert_eq!(completed("math.sqrt(16.0);"), Value::Double(4.0));
    assert_eq!(completed("math.pow(2, 10);"), Value::Double(1024.0));
}

#[test]
fn test_math_sqrt_of_negative_is_math_error() {
    let (kind, _, _) = raised("math.sqrt(-1);");
    assert_eq!(kind, "MATH_ERROR");
}

#[test]
fn test_math_random_is_in_unit_range() {
    let source = "\
var r = math.random();
r >= 0.0 and r < 1.0;";
    assert_eq!(completed(source), Value::Bool(true));
}

#[test]
fn test_date_namespace() {
    assert_eq!(completed("typeof(date.now());"), Value::string("date"));
    assert_eq!(
        completed("var d = date.parse(\"2024-03-01 10:00:00\"); typeof(d);"),
        Value::string("date")
    );
    assert_eq!(
        completed("date.format(date.parse(\"2024-03-01 10:00:00\"), \"%Y/%m/%d\");"),
        Value::string("2024/03/01")
    );
    assert_eq!(
        completed("date.format(date.add_days(date.parse(\"2024-02-28 00:00:00\"), 2), \"%Y-%m-%d\");"),
        Value::string("2024-03-01")
    );
}

#[test]
fn test_date_parse_failure_is_parse_error() {
    let (kind, _, _) = raised("date.parse(\"yesterday\");");
    assert_eq!(kind, "PARSE_ERROR");
}

#[test]
fn test_unknown_builtin_function_is_not_found() {
    let (kind, message, _) = raised("string.frobnicate(\"x\");");
    assert_eq!(kind, "NOT_FOUND_ERROR");
    assert!(message.contains("frobnicate"));
}

#[test]
fn test_wrong_arity_is_type_error() {
    let (kind, _, _) = raised("string.len();");
    assert_eq!(kind, "TYPE_ERROR");
    let (kind, _, _) = raised("math.abs(1, 2);");
    assert_eq!(kind, "TYPE_ERROR");
}

#[test]
fn test_wrong_argument_type_is_type_error() {
    let (kind, _, _) = raised("string.upper(5);");
    assert_eq!(kind, "TYPE_ERROR");
}
