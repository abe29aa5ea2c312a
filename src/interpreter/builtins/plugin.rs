use std::rc::Rc;

use crate::interpreter::builtins::{unknown_function, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::Value;

/// An external capability exposed to scripts. Registering one under an
/// alias makes `alias.initialize(config)`, `alias.execute(args...)` and
/// `alias.cleanup()` callable through the ordinary builtin dispatch.
pub trait Plugin {
    fn initialize(&self, config: &Value) -> Result<(), String>;
    fn execute(&self, args: &[Value]) -> Result<Value, String>;
    fn cleanup(&self);
}

struct PluginAdapter {
    alias: String,
    plugin: Box<dyn Plugin>,
}

impl BuiltinNamespace for PluginAdapter {
    fn name(&self) -> &str {
        &self.alias
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "initialize" => {
                let config = args.first().cloned().unwrap_or(Value::Null);
                self.plugin
                    .initialize(&config)
                    .map_err(|message| plugin_error(&self.alias, message, line))?;
                Ok(Value::Null)
            }
            "execute" => self
                .plugin
                .execute(args)
                .map_err(|message| plugin_error(&self.alias, message, line)),
            "cleanup" => {
                self.plugin.cleanup();
                Ok(Value::Null)
            }
            _ => Err(unknown_function(&self.alias, name, line)),
        }
    }
}

fn plugin_error(alias: &str, message: String, line: u32) -> ExceptionValue {
    ExceptionValue::io_error_at(format!("plugin '{}': {}", alias, message), line)
}

/// Wraps a plugin for `Session::register_namespace`.
pub fn plugin_namespace(alias: impl Into<String>, plugin: Box<dyn Plugin>) -> Rc<dyn BuiltinNamespace> {
    Rc::new(PluginAdapter {
        alias: alias.into(),
        plugin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Echo {
        initialized: Cell<bool>,
    }

    impl Plugin for Echo {
        fn initialize(&self, _config: &Value) -> Result<(), String> {
            self.initialized.set(true);
            Ok(())
        }

        fn execute(&self, args: &[Value]) -> Result<Value, String> {
            args.first().cloned().ok_or_else(|| "nothing to echo".to_string())
        }

        fn cleanup(&self) {}
    }

    #[test]
    fn test_plugin_reached_through_dispatch() {
        let ns = plugin_namespace(
            "echo",
            Box::new(Echo {
                initialized: Cell::new(false),
            }),
        );
        ns.call("initialize", &[], 1).unwrap();
        let out = ns.call("execute", &[Value::Int(7)], 1).unwrap();
        assert_eq!(out, Value::Int(7));
        let err = ns.call("execute", &[], 1).unwrap_err();
        assert!(err.matches("IO_ERROR"));
        assert!(err.message.contains("echo"));
    }
}
