use crate::interpreter::builtins::{int_arg, str_arg, unknown_function, want_args, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::Value;

pub struct StringNamespace;

const NS: &str = "string";

impl BuiltinNamespace for StringNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "len" => {
                want_args(NS, name, args, 1, 1, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                Ok(Value::Int(s.chars().count() as i32))
            }
            "upper" => {
                want_args(NS, name, args, 1, 1, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                Ok(Value::string(s.to_uppercase()))
            }
            "lower" => {
                want_args(NS, name, args, 1, 1, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                Ok(Value::string(s.to_lowercase()))
            }
            "trim" => {
                want_args(NS, name, args, 1, 1, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                Ok(Value::string(s.trim()))
            }
            "substr" => {
                want_args(NS, name, args, 2, 3, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let chars: Vec<char> = s.chars().collect();
                let start = clamp_index(int_arg(NS, name, args, 1, line)?, chars.len());
                let end = if args.len() == 3 {
                    clamp_index(int_arg(NS, name, args, 2, line)?, chars.len())
                } else {
                    chars.len()
                };
                let end = end.max(start);
                Ok(Value::string(chars[start..end].iter().collect::<String>()))
            }
            "replace" => {
                want_args(NS, name, args, 3, 3, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let from = str_arg(NS, name, args, 1, line)?;
                let to = str_arg(NS, name, args, 2, line)?;
                Ok(Value::string(s.replace(from.as_ref(), &to)))
            }
            "split" => {
                want_args(NS, name, args, 2, 2, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let sep = str_arg(NS, name, args, 1, line)?;
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(|c| Value::string(c.to_string())).collect()
                } else {
                    s.split(sep.as_ref()).map(Value::string).collect()
                };
                Ok(Value::dynamic_array(parts))
            }
            "contains" => {
                want_args(NS, name, args, 2, 2, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let needle = str_arg(NS, name, args, 1, line)?;
                Ok(Value::Bool(s.contains(needle.as_ref())))
            }
            "index_of" => {
                want_args(NS, name, args, 2, 2, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let needle = str_arg(NS, name, args, 1, line)?;
                // Reported as a character offset, not a byte offset.
                match s.find(needle.as_ref()) {
                    Some(byte) => Ok(Value::Int(s[..byte].chars().count() as i32)),
                    None => Ok(Value::Int(-1)),
                }
            }
            "starts_with" => {
                want_args(NS, name, args, 2, 2, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let prefix = str_arg(NS, name, args, 1, line)?;
                Ok(Value::Bool(s.starts_with(prefix.as_ref())))
            }
            "ends_with" => {
                want_args(NS, name, args, 2, 2, line)?;
                let s = str_arg(NS, name, args, 0, line)?;
                let suffix = str_arg(NS, name, args, 1, line)?;
                Ok(Value::Bool(s.ends_with(suffix.as_ref())))
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}

fn clamp_index(i: i64, len: usize) -> usize {
    if i < 0 {
        0
    } else {
        (i as usize).min(len)
    }
}
