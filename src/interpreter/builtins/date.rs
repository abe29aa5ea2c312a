use chrono::{Duration, Local};

use crate::interpreter::builtins::{int_arg, str_arg, unknown_function, want_args, BuiltinNamespace};
use crate::interpreter::error::ExceptionValue;
use crate::value::Value;

pub struct DateNamespace;

const NS: &str = "date";

impl BuiltinNamespace for DateNamespace {
    fn name(&self) -> &str {
        NS
    }

    fn call(&self, name: &str, args: &[Value], line: u32) -> Result<Value, ExceptionValue> {
        match name {
            "now" => {
                want_args(NS, name, args, 0, 0, line)?;
                Ok(Value::Date(Local::now().naive_local()))
            }
            "parse" => {
                want_args(NS, name, args, 1, 1, line)?;
                let text = str_arg(NS, name, args, 0, line)?;
                parse_date(&text).ok_or_else(|| {
                    ExceptionValue::parse_error_at(format!("invalid date '{}'", text), line)
                })
            }
            "format" => {
                want_args(NS, name, args, 2, 2, line)?;
                let date = date_arg(name, args, line)?;
                let pattern = str_arg(NS, name, args, 1, line)?;
                Ok(Value::string(date.format(&pattern).to_string()))
            }
            "add_days" => {
                want_args(NS, name, args, 2, 2, line)?;
                let date = date_arg(name, args, line)?;
                let days = int_arg(NS, name, args, 1, line)?;
                Ok(Value::Date(date + Duration::days(days)))
            }
            _ => Err(unknown_function(NS, name, line)),
        }
    }
}

fn date_arg(
    name: &str,
    args: &[Value],
    line: u32,
) -> Result<chrono::NaiveDateTime, ExceptionValue> {
    match args.first() {
        Some(Value::Date(d)) => Ok(*d),
        other => Err(ExceptionValue::type_error_at(
            format!(
                "date.{} expects a date, got {}",
                name,
                other
                    .map(crate::types::type_of)
                    .unwrap_or_else(|| "nothing".to_string())
            ),
            line,
        )),
    }
}

fn parse_date(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Value::Date(dt));
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Value::Date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, ExceptionValue> {
        DateNamespace.call(name, args, 1)
    }

    #[test]
    fn test_parse_format_round_trip() {
        let date = call("parse", &[Value::string("2024-06-01 12:30:00")]).unwrap();
        let text = call("format", &[date, Value::string("%Y/%m/%d")]).unwrap();
        assert_eq!(text, Value::string("2024/06/01"));
    }

    #[test]
    fn test_date_only_parses_at_midnight() {
        let date = call("parse", &[Value::string("2024-06-01")]).unwrap();
        let text = call("format", &[date, Value::string("%H:%M")]).unwrap();
        assert_eq!(text, Value::string("00:00"));
    }

    #[test]
    fn test_add_days_crosses_month() {
        let date = call("parse", &[Value::string("2024-01-31")]).unwrap();
        let moved = call("add_days", &[date, Value::Int(1)]).unwrap();
        let text = call("format", &[moved, Value::string("%Y-%m-%d")]).unwrap();
        assert_eq!(text, Value::string("2024-02-01"));
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let err = call("parse", &[Value::string("not a date")]).unwrap_err();
        assert!(err.matches("PARSE_ERROR"));
    }
}
