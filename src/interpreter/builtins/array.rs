use crate::interpreter::builtins::{
    array_arg, int_arg, str_arg, unknown_function, want_args, BuiltinNamespace,
};
use crate::interpreter::error::ExceptionValue;
use crate::value::{ArrayValue, Value};

pub struct ArrayNamespace;

const NS: &str = "array";

impl BuiltinNamespace for ArrayNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "push" => {
                want_args(NS, name, args, 2, 2, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let mut array = array.borrow_mut();
                match &mut *array {
                    ArrayValue::Dynamic(items) => {
                        items.push(args[1].clone());
                        Ok(Value::Int(items.len() as i32))
                    }
                    _ => Err(fixed_size_error(name, line)),
                }
            }
            "pop" => {
                want_args(NS, name, args, 1, 1, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let mut array = array.borrow_mut();
                match &mut *array {
                    ArrayValue::Dynamic(items) => Ok(items.pop().unwrap_or(Value::Null)),
                    _ => Err(fixed_size_error(name, line)),
                }
            }
            "clear" => {
                want_args(NS, name, args, 1, 1, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let mut array = array.borrow_mut();
                match &mut *array {
                    ArrayValue::Dynamic(items) => {
                        items.clear();
                        Ok(Value::Null)
                    }
                    _ => Err(fixed_size_error(name, line)),
                }
            }
            "sort" => {
                want_args(NS, name, args, 1, 1, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                sort_in_place(&mut array.borrow_mut());
                Ok(Value::Null)
            }
            "reverse" => {
                want_args(NS, name, args, 1, 1, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let mut array = array.borrow_mut();
                match &mut *array {
                    ArrayValue::Dynamic(items) => items.reverse(),
                    ArrayValue::FixedGeneric { items, .. } => items.reverse(),
                    ArrayValue::FixedByte(items) => items.reverse(),
                    ArrayValue::FixedInt(items) => items.reverse(),
                }
                Ok(Value::Null)
            }
            "join" => {
                want_args(NS, name, args, 2, 2, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let sep = str_arg(NS, name, args, 1, line)?;
                let parts: Vec<String> = array
                    .borrow()
                    .to_vec()
                    .iter()
                    .map(|v| v.to_string())
                    .collect();
                Ok(Value::string(parts.join(&sep)))
            }
            "slice" => {
                want_args(NS, name, args, 3, 3, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let items = array.borrow().to_vec();
                let start = clamp(int_arg(NS, name, args, 1, line)?, items.len());
                let end = clamp(int_arg(NS, name, args, 2, line)?, items.len()).max(start);
                Ok(Value::dynamic_array(items[start..end].to_vec()))
            }
            "contains" => {
                want_args(NS, name, args, 2, 2, line)?;
                let array = array_arg(NS, name, args, 0, line)?;
                let found = array.borrow().to_vec().iter().any(|v| *v == args[1]);
                Ok(Value::Bool(found))
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}

fn fixed_size_error(name: &str, line: u32) -> ExceptionValue {
    ExceptionValue::type_error_at(
        format!("array.{} cannot resize a fixed array", name),
        line,
    )
}

fn clamp(i: i64, len: usize) -> usize {
    if i < 0 {
        0
    } else {
        (i as usize).min(len)
    }
}

/// Numeric arrays sort numerically; anything else sorts by display text.
fn sort_in_place(array: &mut ArrayValue) {
    match array {
        ArrayValue::FixedByte(items) => items.sort_unstable(),
        ArrayValue::FixedInt(items) => items.sort_unstable(),
        ArrayValue::Dynamic(items) | ArrayValue::FixedGeneric { items, .. } => {
            let all_numeric = items.iter().all(|v| v.is_numeric());
            if all_numeric {
                items.sort_by(|a, b| {
                    let a = a.as_f64().unwrap_or(f64::NAN);
                    let b = b.as_f64().unwrap_or(f64::NAN);
                    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
                });
            } else {
                items.sort_by_key(|v| v.to_string());
            }
        }
    }
}
