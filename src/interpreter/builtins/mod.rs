pub mod array;
pub mod date;
pub mod json;
pub mod math;
pub mod plugin;
pub mod queue;
pub mod string;
pub mod sys;

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::error::ExceptionValue;
use crate::value::{ArrayValue, QueueValue, Value};

pub use plugin::{plugin_namespace, Plugin};

/// One builtin namespace, reached as `name().func(args)` in scripts.
/// Everything the standard library (and any plugin) exposes goes through
/// `Session::builtin` and ends up here; the evaluator special-cases nothing.
pub trait BuiltinNamespace {
    fn name(&self) -> &str;
    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue>;
}

/// The namespaces every new session starts with.
pub fn default_namespaces() -> Vec<Rc<dyn BuiltinNamespace>> {
    vec![
        Rc::new(string::StringNamespace),
        Rc::new(array::ArrayNamespace),
        Rc::new(json::JsonNamespace),
        Rc::new(queue::QueueNamespace),
        Rc::new(math::MathNamespace),
        Rc::new(date::DateNamespace),
        Rc::new(sys::SysNamespace),
    ]
}

// Shared argument plumbing for the namespace modules.

pub(crate) fn unknown_function(ns: &str, name: &str, line: u32) -> ExceptionValue {
    ExceptionValue::not_found_at(format!("unknown function '{}.{}'", ns, name), line)
}

pub(crate) fn want_args(
    ns: &str,
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
    line: u32,
) -> Result<(), ExceptionValue> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(ExceptionValue::type_error_at(
            format!(
                "{}.{} expects {} argument(s), got {}",
                ns,
                name,
                expected,
                args.len()
            ),
            line,
        ));
    }
    Ok(())
}

pub(crate) fn str_arg(
    ns: &str,
    name: &str,
    args: &[Value],
    i: usize,
    line: u32,
) -> Result<Rc<str>, ExceptionValue> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s.clone()),
        other => Err(ExceptionValue::type_error_at(
            format!(
                "{}.{} expects a string for argument {}, got {}",
                ns,
                name,
                i + 1,
                describe(other)
            ),
            line,
        )),
    }
}

pub(crate) fn int_arg(
    ns: &str,
    name: &str,
    args: &[Value],
    i: usize,
    line: u32,
) -> Result<i64, ExceptionValue> {
    match args.get(i).and_then(|v| v.as_i64()) {
        Some(n) => Ok(n),
        None => Err(ExceptionValue::type_error_at(
            format!(
                "{}.{} expects an integer for argument {}, got {}",
                ns,
                name,
                i + 1,
                describe(args.get(i))
            ),
            line,
        )),
    }
}

pub(crate) fn num_arg(
    ns: &str,
    name: &str,
    args: &[Value],
    i: usize,
    line: u32,
) -> Result<f64, ExceptionValue> {
    match args.get(i).and_then(|v| v.as_f64()) {
        Some(x) => Ok(x),
        None => Err(ExceptionValue::type_error_at(
            format!(
                "{}.{} expects a number for argument {}, got {}",
                ns,
                name,
                i + 1,
                describe(args.get(i))
            ),
            line,
        )),
    }
}

pub(crate) fn array_arg(
    ns: &str,
    name: &str,
    args: &[Value],
    i: usize,
    line: u32,
) -> Result<Rc<RefCell<ArrayValue>>, ExceptionValue> {
    match args.get(i) {
        Some(Value::Array(array)) => Ok(array.clone()),
        other => Err(ExceptionValue::type_error_at(
            format!(
                "{}.{} expects an array for argument {}, got {}",
                ns,
                name,
                i + 1,
                describe(other)
            ),
            line,
        )),
    }
}

pub(crate) fn queue_arg(
    ns: &str,
    name: &str,
    args: &[Value],
    i: usize,
    line: u32,
) -> Result<Rc<RefCell<QueueValue>>, ExceptionValue> {
    match args.get(i) {
        Some(Value::Queue(queue)) => Ok(queue.clone()),
        other => Err(ExceptionValue::type_error_at(
            format!(
                "{}.{} expects a queue for argument {}, got {}",
                ns,
                name,
                i + 1,
                describe(other)
            ),
            line,
        )),
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => crate::types::type_of(v),
        None => "nothing".to_string(),
    }
}
