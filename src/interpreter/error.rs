use std::fmt;

use crate::value::Value;

/// The standard exception kinds. `Any` is the catch-all sentinel: it never
/// names a raised exception, it only appears in `when` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Db,
    Type,
    Null,
    Index,
    Math,
    Parse,
    Network,
    NotFound,
    Access,
    Validation,
    Any,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::Db => "DB_ERROR",
            ErrorKind::Type => "TYPE_ERROR",
            ErrorKind::Null => "NULL_ERROR",
            ErrorKind::Index => "INDEX_ERROR",
            ErrorKind::Math => "MATH_ERROR",
            ErrorKind::Parse => "PARSE_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::NotFound => "NOT_FOUND_ERROR",
            ErrorKind::Access => "ACCESS_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Any => "ANY_ERROR",
        }
    }

    /// Case-insensitive lookup of a standard kind by its name.
    pub fn from_name(name: &str) -> Option<ErrorKind> {
        let folded = name.to_ascii_uppercase();
        [
            ErrorKind::Io,
            ErrorKind::Db,
            ErrorKind::Type,
            ErrorKind::Null,
            ErrorKind::Index,
            ErrorKind::Math,
            ErrorKind::Parse,
            ErrorKind::Network,
            ErrorKind::NotFound,
            ErrorKind::Access,
            ErrorKind::Validation,
            ErrorKind::Any,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == folded)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExceptionKind {
    Standard(ErrorKind),
    Custom(String),
}

impl ExceptionKind {
    pub fn name(&self) -> String {
        match self {
            ExceptionKind::Standard(kind) => kind.as_str().to_string(),
            ExceptionKind::Custom(name) => name.to_ascii_uppercase(),
        }
    }
}

/// A raised exception travelling up the evaluator. `payload` keeps the
/// raise-time argument values for custom exceptions; standard kinds carry
/// only the message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionValue {
    pub kind: ExceptionKind,
    pub message: String,
    pub payload: Vec<Value>,
    pub line: u32,
}

impl ExceptionValue {
    pub fn standard(kind: ErrorKind, message: impl Into<String>, line: u32) -> Self {
        Self {
            kind: ExceptionKind::Standard(kind),
            message: message.into(),
            payload: Vec::new(),
            line,
        }
    }

    pub fn custom(name: impl Into<String>, payload: Vec<Value>, line: u32) -> Self {
        let name = name.into();
        let rendered: Vec<String> = payload.iter().map(|v| v.to_string()).collect();
        let message = if rendered.is_empty() {
            name.to_ascii_uppercase()
        } else {
            format!("{}: {}", name.to_ascii_uppercase(), rendered.join(", "))
        };
        Self {
            kind: ExceptionKind::Custom(name),
            message,
            payload,
            line,
        }
    }

    pub fn type_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Type, message, line)
    }

    pub fn null_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Null, message, line)
    }

    pub fn index_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Index, message, line)
    }

    pub fn math_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Math, message, line)
    }

    pub fn parse_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Parse, message, line)
    }

    pub fn not_found_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::NotFound, message, line)
    }

    pub fn io_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Io, message, line)
    }

    pub fn validation_error_at(message: impl Into<String>, line: u32) -> Self {
        Self::standard(ErrorKind::Validation, message, line)
    }

    /// Whether a `when <handler_kind>` clause catches this exception.
    /// Standard names match case-insensitively; ANY_ERROR matches everything.
    pub fn matches(&self, handler_kind: &str) -> bool {
        if handler_kind.eq_ignore_ascii_case(ErrorKind::Any.as_str()) {
            return true;
        }
        self.kind.name().eq_ignore_ascii_case(handler_kind)
    }
}

impl fmt::Display for ExceptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExceptionKind::Custom(_) => write!(f, "{} (line {})", self.message, self.line),
            ExceptionKind::Standard(kind) => {
                write!(f, "{}: {} (line {})", kind, self.message, self.line)
            }
        }
    }
}

/// How a whole run ended, for the CLI and embedding tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Value),
    ParseFailed { message: String, line: u32 },
    Raised { kind: String, message: String, line: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(ErrorKind::from_name("math_error"), Some(ErrorKind::Math));
        assert_eq!(ErrorKind::from_name("Io_Error"), Some(ErrorKind::Io));
        assert_eq!(ErrorKind::from_name("bogus"), None);
    }

    #[test]
    fn test_any_error_matches_everything() {
        let exc = ExceptionValue::type_error_at("bad", 3);
        assert!(exc.matches("any_error"));
        assert!(exc.matches("TYPE_ERROR"));
        assert!(!exc.matches("MATH_ERROR"));
    }

    #[test]
    fn test_custom_message_rendering() {
        let exc = ExceptionValue::custom("quota", vec![Value::Int(7), Value::string("daily")], 9);
        assert_eq!(exc.message, "QUOTA: 7, daily");
        assert!(exc.matches("QUOTA"));
        assert!(exc.matches("any_error"));
    }
}
