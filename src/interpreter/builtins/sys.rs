use std::time::Duration;

use crate::interpreter::builtins::{int_arg, str_arg, unknown_function, want_args, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::Value;

pub struct SysNamespace;

const NS: &str = "sys";

impl BuiltinNamespace for SysNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "sleep" => {
                want_args(NS, name, args, 1, 1, line)?;
                let millis = int_arg(NS, name, args, 0, line)?;
                if millis > 0 {
                    std::thread::sleep(Duration::from_millis(millis as u64));
                }
                Ok(Value::Null)
            }
            "env" => {
                want_args(NS, name, args, 1, 1, line)?;
                let key = str_arg(NS, name, args, 0, line)?;
                match std::env::var(key.as_ref()) {
                    Ok(value) => Ok(Value::string(value)),
                    Err(_) => Ok(Value::Null),
                }
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}
