use rand::Rng;

use crate::interpreter::builtins::{num_arg, unknown_function, want_args, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::Value;

pub struct MathNamespace;

const NS: &str = "math";

impl BuiltinNamespace for MathNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "abs" => {
                want_args(NS, name, args, 1, 1, line)?;
                match &args[0] {
                    Value::Byte(b) => Ok(Value::Byte(*b)),
                    Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
                    Value::Long(l) => Ok(Value::Long(l.wrapping_abs())),
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    Value::Double(x) => Ok(Value::Double(x.abs())),
                    other => Err(ExceptionValue::type_error_at(
                        format!("math.abs expects a number, got {}", crate::types::type_of(other)),
                        line,
                    )),
                }
            }
            // min/max return whichever argument won, keeping its type.
            "min" => {
                want_args(NS, name, args, 2, 2, line)?;
                pick(args, line, |a, b| a <= b)
            }
            "max" => {
                want_args(NS, name, args, 2, 2, line)?;
                pick(args, line, |a, b| a >= b)
            }
            "floor" => {
                want_args(NS, name, args, 1, 1, line)?;
                Ok(Value::Double(num_arg(NS, name, args, 0, line)?.floor()))
            }
            "ceil" => {
                want_args(NS, name, args, 1, 1, line)?;
                Ok(Value::Double(num_arg(NS, name, args, 0, line)?.ceil()))
            }
            "round" => {
                want_args(NS, name, args, 1, 1, line)?;
                Ok(Value::Double(num_arg(NS, name, args, 0, line)?.round()))
            }
            "sqrt" => {
                want_args(NS, name, args, 1, 1, line)?;
                Ok(Value::Double(num_arg(NS, name, args, 0, line)?.sqrt()))
            }
            "pow" => {
                want_args(NS, name, args, 2, 2, line)?;
                let base = num_arg(NS, name, args, 0, line)?;
                let exp = num_arg(NS, name, args, 1, line)?;
                Ok(Value::Double(base.powf(exp)))
            }
            "random" => {
                want_args(NS, name, args, 0, 0, line)?;
                Ok(Value::Double(rand::thread_rng().gen::<f64>()))
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}

fn pick(
    args: &[Value],
    line: u32,
    keep_first: fn(f64, f64) -> bool,
) -> Result<Value, ExceptionValue> {
    let a = num_arg(NS, "min", args, 0, line)?;
    let b = num_arg(NS, "min", args, 1, line)?;
    Ok(if keep_first(a, b) {
        args[0].clone()
    } else {
        args[1].clone()
    })
}
