use crate::interpreter::builtins::{queue_arg, unknown_function, want_args, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::Value;

pub struct QueueNamespace;

const NS: &str = "queue";

impl BuiltinNamespace for QueueNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "push" => {
                want_args(NS, name, args, 2, 2, line)?;
                let queue = queue_arg(NS, name, args, 0, line)?;
                let mut queue = queue.borrow_mut();
                queue.push(args[1].clone()).map_err(|fault| match fault {
                    crate::value::ElementFault::Incompatible(message) => {
                        ExceptionValue::type_error_at(message, line)
                    }
                    crate::value::ElementFault::OutOfBounds { .. } => {
                        ExceptionValue::index_error_at("queue write out of bounds", line)
                    }
                })?;
                Ok(Value::Int(queue.items.len() as i32))
            }
            "pop" => {
                want_args(NS, name, args, 1, 1, line)?;
                let queue = queue_arg(NS, name, args, 0, line)?;
                let popped = queue.borrow_mut().pop();
                Ok(popped.unwrap_or(Value::Null))
            }
            "peek" => {
                want_args(NS, name, args, 1, 1, line)?;
                let queue = queue_arg(NS, name, args, 0, line)?;
                let front = queue.borrow().peek();
                Ok(front.unwrap_or(Value::Null))
            }
            "len" => {
                want_args(NS, name, args, 1, 1, line)?;
                let queue = queue_arg(NS, name, args, 0, line)?;
                let len = queue.borrow().items.len();
                Ok(Value::Int(len as i32))
            }
            "clear" => {
                want_args(NS, name, args, 1, 1, line)?;
                let queue = queue_arg(NS, name, args, 0, line)?;
                queue.borrow_mut().items.clear();
                Ok(Value::Null)
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;
    use crate::value::QueueValue;

    fn call(name: &str, args: &[Value]) -> Result<Value, ExceptionValue> {
        QueueNamespace.call(name, args, 1)
    }

    #[test]
    fn test_fifo_order() {
        let queue = Value::queue(QueueValue::new(None));
        call("push", &[queue.clone(), Value::Int(1)]).unwrap();
        call("push", &[queue.clone(), Value::Int(2)]).unwrap();
        assert_eq!(call("peek", &[queue.clone()]).unwrap(), Value::Int(1));
        assert_eq!(call("pop", &[queue.clone()]).unwrap(), Value::Int(1));
        assert_eq!(call("pop", &[queue.clone()]).unwrap(), Value::Int(2));
        assert_eq!(call("pop", &[queue]).unwrap(), Value::Null);
    }

    #[test]
    fn test_typed_queue_rejects_incompatible_push() {
        let queue = Value::queue(QueueValue::new(Some(DataType::Int)));
        let err = call("push", &[queue, Value::dynamic_array(vec![])]).unwrap_err();
        assert!(err.matches("TYPE_ERROR"));
    }
}
