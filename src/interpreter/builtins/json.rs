use indexmap::IndexMap;

use crate::interpreter::builtins::{str_arg, unknown_function, want_args, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::{JsonValue, Value};

pub struct JsonNamespace;

const NS: &str = "json";

impl BuiltinNamespace for JsonNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "parse" => {
                want_args(NS, name, args, 1, 1, line)?;
                let text = str_arg(NS, name, args, 0, line)?;
                let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                    ExceptionValue::parse_error_at(format!("invalid json: {}", e), line)
                })?;
                Ok(from_serde(&parsed))
            }
            "stringify" => {
                want_args(NS, name, args, 1, 1, line)?;
                let serde = to_serde(&args[0]).ok_or_else(|| {
                    ExceptionValue::type_error_at(
                        format!(
                            "json.stringify cannot serialize {}",
                            crate::types::type_of(&args[0])
                        ),
                        line,
                    )
                })?;
                Ok(Value::string(serde.to_string()))
            }
            "keys" => {
                let fields = object_arg(name, args, line)?;
                Ok(Value::dynamic_array(
                    fields.keys().map(Value::string).collect(),
                ))
            }
            "values" => {
                let fields = object_arg(name, args, line)?;
                Ok(Value::dynamic_array(fields.values().cloned().collect()))
            }
            "has" => {
                want_args(NS, name, args, 2, 2, line)?;
                let key = str_arg(NS, name, args, 1, line)?;
                let fields = object_arg(name, &args[..1], line)?;
                Ok(Value::Bool(fields.contains_key(key.as_ref())))
            }
            "remove" => {
                want_args(NS, name, args, 2, 2, line)?;
                let key = str_arg(NS, name, args, 1, line)?;
                match args.first() {
                    Some(Value::Json(json)) => {
                        let removed = match &mut *json.borrow_mut() {
                            JsonValue::Object(fields) => fields.shift_remove(key.as_ref()),
                            JsonValue::Array(_) => None,
                        };
                        Ok(removed.unwrap_or(Value::Null))
                    }
                    other => Err(not_an_object(name, other, line)),
                }
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}

fn object_arg(
    name: &str,
    args: &[Value],
    line: u32,
) -> Result<IndexMap<String, Value>, ExceptionValue> {
    match args.first() {
        Some(Value::Json(json)) => match &*json.borrow() {
            JsonValue::Object(fields) => Ok(fields.clone()),
            JsonValue::Array(_) => Err(not_an_object(name, args.first(), line)),
        },
        other => Err(not_an_object(name, other, line)),
    }
}

fn not_an_object(name: &str, value: Option<&Value>, line: u32) -> ExceptionValue {
    let got = value.map(crate::types::type_of).unwrap_or_else(|| "nothing".to_string());
    ExceptionValue::type_error_at(format!("json.{} expects a json object, got {}", name, got), line)
}

/// serde tree -> script value. Integers that fit i32 come back as Int.
pub fn from_serde(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(i) => Value::Int(i),
                    Err(_) => Value::Long(i),
                }
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => Value::json_array(items.iter().map(from_serde).collect()),
        serde_json::Value::Object(fields) => {
            let mut out = IndexMap::new();
            for (key, value) in fields {
                out.insert(key.clone(), from_serde(value));
            }
            Value::json_object(out)
        }
    }
}

/// script value -> serde tree. Functions and dates have no json form.
pub fn to_serde(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Null => Some(serde_json::Value::Null),
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Byte(b) => Some(serde_json::Value::from(*b)),
        Value::Int(i) => Some(serde_json::Value::from(*i)),
        Value::Long(l) => Some(serde_json::Value::from(*l)),
        Value::Float(x) => serde_json::Number::from_f64(*x as f64).map(serde_json::Value::Number),
        Value::Double(x) => serde_json::Number::from_f64(*x).map(serde_json::Value::Number),
        Value::Str(s) => Some(serde_json::Value::String(s.to_string())),
        Value::Json(json) => match &*json.borrow() {
            JsonValue::Object(fields) => {
                let mut out = serde_json::Map::new();
                for (key, value) in fields {
                    out.insert(key.clone(), to_serde(value)?);
                }
                Some(serde_json::Value::Object(out))
            }
            JsonValue::Array(items) => {
                let out: Option<Vec<_>> = items.iter().map(to_serde).collect();
                Some(serde_json::Value::Array(out?))
            }
        },
        Value::Record(record) => {
            let mut out = serde_json::Map::new();
            for (key, value) in record.borrow().fields.iter() {
                out.insert(key.clone(), to_serde(value)?);
            }
            Some(serde_json::Value::Object(out))
        }
        Value::Array(array) => {
            let out: Option<Vec<_>> = array.borrow().to_vec().iter().map(to_serde).collect();
            Some(serde_json::Value::Array(out?))
        }
        Value::Queue(queue) => {
            let out: Option<Vec<_>> = queue.borrow().items.iter().map(to_serde).collect();
            Some(serde_json::Value::Array(out?))
        }
        Value::Date(_) | Value::Function(_) => None,
    }
}
