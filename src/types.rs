use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::{ArrayValue, JsonValue, QueueValue, RecordValue, Value};

/// A type as written in source. Alias names stay unresolved here so that
/// aliases may be declared in any order; resolution happens against the
/// session registry when the type is first used.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Byte,
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
    Date,
    Json,
    Alias(String),
    Record(Vec<(String, TypeExpr)>),
    Array {
        elem: Option<Box<TypeExpr>>,
        size: Option<usize>,
    },
    Queue(Box<TypeExpr>),
}

/// A fully resolved type, with every alias substituted away.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Byte,
    Int,
    Long,
    Float,
    Double,
    Bool,
    String,
    Date,
    Json,
    Record(Rc<RecordType>),
    Array {
        elem: Option<Box<DataType>>,
        size: Option<usize>,
    },
    Queue(Box<DataType>),
}

/// A resolved record schema. Field names are lowercased; every field is
/// required when the schema is enforced by a cast.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub fields: Vec<(String, DataType)>,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Byte => write!(f, "byte"),
            DataType::Int => write!(f, "int"),
            DataType::Long => write!(f, "long"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::Bool => write!(f, "bool"),
            DataType::String => write!(f, "string"),
            DataType::Date => write!(f, "date"),
            DataType::Json => write!(f, "json"),
            DataType::Record(record) => {
                write!(f, "record {{")?;
                for (i, (name, ty)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, "}}")
            }
            DataType::Array { elem, size } => {
                write!(f, "array")?;
                if let Some(elem) = elem {
                    write!(f, ".{}", elem)?;
                }
                match size {
                    Some(n) => write!(f, "[{}]", n),
                    None => write!(f, "[*]"),
                }
            }
            DataType::Queue(elem) => write!(f, "queue.{}", elem),
        }
    }
}

/// Failure while resolving or casting; the evaluator maps `Type` to
/// TYPE_ERROR and `Validation` to VALIDATION_ERROR.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeFault {
    Type(String),
    Validation(String),
}

impl TypeFault {
    pub fn message(&self) -> &str {
        match self {
            TypeFault::Type(m) | TypeFault::Validation(m) => m,
        }
    }
}

const MAX_ALIAS_DEPTH: usize = 64;

/// Resolves a written type against an alias lookup. Cycles among aliases
/// are cut off by a depth bound.
pub fn resolve_type(
    ty: &TypeExpr,
    lookup: &dyn Fn(&str) -> Option<TypeExpr>,
) -> Result<DataType, TypeFault> {
    resolve_at(ty, lookup, 0)
}

fn resolve_at(
    ty: &TypeExpr,
    lookup: &dyn Fn(&str) -> Option<TypeExpr>,
    depth: usize,
) -> Result<DataType, TypeFault> {
    if depth > MAX_ALIAS_DEPTH {
        return Err(TypeFault::Type("type alias nesting too deep".to_string()));
    }
    match ty {
        TypeExpr::Byte => Ok(DataType::Byte),
        TypeExpr::Int => Ok(DataType::Int),
        TypeExpr::Long => Ok(DataType::Long),
        TypeExpr::Float => Ok(DataType::Float),
        TypeExpr::Double => Ok(DataType::Double),
        TypeExpr::Bool => Ok(DataType::Bool),
        TypeExpr::String => Ok(DataType::String),
        TypeExpr::Date => Ok(DataType::Date),
        TypeExpr::Json => Ok(DataType::Json),
        TypeExpr::Alias(name) => match lookup(name) {
            Some(target) => resolve_at(&target, lookup, depth + 1),
            None => Err(TypeFault::Type(format!("unknown type '{}'", name))),
        },
        TypeExpr::Record(fields) => {
            let mut resolved = Vec::with_capacity(fields.len());
            for (name, field_ty) in fields {
                resolved.push((
                    name.to_ascii_lowercase(),
                    resolve_at(field_ty, lookup, depth + 1)?,
                ));
            }
            Ok(DataType::Record(Rc::new(RecordType { fields: resolved })))
        }
        TypeExpr::Array { elem, size } => {
            let elem = match elem {
                Some(e) => Some(Box::new(resolve_at(e, lookup, depth + 1)?)),
                None => None,
            };
            Ok(DataType::Array { elem, size: *size })
        }
        TypeExpr::Queue(elem) => Ok(DataType::Queue(Box::new(resolve_at(
            elem,
            lookup,
            depth + 1,
        )?))),
    }
}

/// Structural type descriptor for `typeof(expr)`, computed from the runtime
/// shape of the value.
pub fn type_of(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Byte(_) => "byte".to_string(),
        Value::Int(_) => "int".to_string(),
        Value::Long(_) => "long".to_string(),
        Value::Float(_) => "float".to_string(),
        Value::Double(_) => "double".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Str(_) => "string".to_string(),
        Value::Date(_) => "date".to_string(),
        Value::Json(_) => "json".to_string(),
        Value::Function(_) => "function".to_string(),
        Value::Record(record) => {
            let record = record.borrow();
            if let Some(schema) = &record.schema {
                return DataType::Record(schema.clone()).to_string();
            }
            let mut out = String::from("record {");
            for (i, (name, field)) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(name);
                out.push_str(": ");
                out.push_str(&type_of(field));
            }
            out.push('}');
            out
        }
        Value::Array(array) => match &*array.borrow() {
            ArrayValue::Dynamic(_) => "array[*]".to_string(),
            ArrayValue::FixedGeneric { elem, items } => match elem {
                Some(elem) => format!("array.{}[{}]", elem, items.len()),
                None => format!("array[{}]", items.len()),
            },
            ArrayValue::FixedByte(items) => format!("array.byte[{}]", items.len()),
            ArrayValue::FixedInt(items) => format!("array.int[{}]", items.len()),
        },
        Value::Queue(queue) => match &queue.borrow().elem {
            Some(elem) => format!("queue.{}", elem),
            None => "queue".to_string(),
        },
    }
}

/// Converts a value to a resolved target type. Numeric casts truncate the
/// way the source language's host integers do; json<->record casts enforce
/// the record schema.
pub fn cast_value(value: &Value, target: &DataType) -> Result<Value, TypeFault> {
    if matches!(value, Value::Null) {
        return Ok(Value::Null);
    }
    match target {
        DataType::Byte => Ok(Value::Byte(numeric_of(value, target)? as u8)),
        DataType::Int => Ok(Value::Int(numeric_of(value, target)? as i32)),
        DataType::Long => Ok(Value::Long(numeric_of(value, target)? as i64)),
        DataType::Float => Ok(Value::Float(numeric_of(value, target)? as f32)),
        DataType::Double => Ok(Value::Double(numeric_of(value, target)?)),
        DataType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(cast_fault(value, target)),
            },
            _ => Err(cast_fault(value, target)),
        },
        DataType::String => Ok(Value::Str(Rc::from(value.to_string().as_str()))),
        DataType::Date => match value {
            Value::Date(d) => Ok(Value::Date(*d)),
            Value::Str(s) => parse_date(s).ok_or_else(|| cast_fault(value, target)),
            _ => Err(cast_fault(value, target)),
        },
        DataType::Json => cast_to_json(value).ok_or_else(|| cast_fault(value, target)),
        DataType::Record(schema) => cast_to_record(value, schema),
        DataType::Array { elem, size } => cast_to_array(value, elem.as_deref(), *size),
        DataType::Queue(elem) => cast_to_queue(value, elem),
    }
}

/// Coerces a value to a declared element type for typed-container writes.
/// Same conversions as `cast_value` but with an element-flavored message.
pub fn coerce_element(value: &Value, elem: &DataType) -> Result<Value, TypeFault> {
    cast_value(value, elem).map_err(|_| {
        TypeFault::Type(format!(
            "cannot store {} in a container of {}",
            type_of(value),
            elem
        ))
    })
}

fn cast_fault(value: &Value, target: &DataType) -> TypeFault {
    TypeFault::Type(format!("cannot cast {} to {}", type_of(value), target))
}

fn numeric_of(value: &Value, target: &DataType) -> Result<f64, TypeFault> {
    match value {
        Value::Byte(b) => Ok(*b as f64),
        Value::Int(i) => Ok(*i as f64),
        Value::Long(l) => Ok(*l as f64),
        Value::Float(x) => Ok(*x as f64),
        Value::Double(x) => Ok(*x),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| TypeFault::Type(format!("cannot parse '{}' as {}", s, target))),
        _ => Err(cast_fault(value, target)),
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

fn cast_to_json(value: &Value) -> Option<Value> {
    match value {
        Value::Json(json) => Some(Value::Json(json.clone())),
        Value::Record(record) => {
            let record = record.borrow();
            let mut fields = IndexMap::new();
            for (name, field) in record.fields.iter() {
                fields.insert(name.clone(), field.clone());
            }
            Some(Value::json_object(fields))
        }
        Value::Array(array) => Some(Value::json_array(array.borrow().to_vec())),
        _ => None,
    }
}

fn cast_to_record(value: &Value, schema: &Rc<RecordType>) -> Result<Value, TypeFault> {
    let source: IndexMap<String, Value> = match value {
        Value::Json(json) => match &*json.borrow() {
            JsonValue::Object(fields) => fields.clone(),
            JsonValue::Array(_) => {
                return Err(TypeFault::Type(
                    "cannot cast a json array to a record".to_string(),
                ))
            }
        },
        Value::Record(record) => record.borrow().fields.clone(),
        _ => return Err(cast_fault(value, &DataType::Record(schema.clone()))),
    };

    // Schema fields are matched case-insensitively and independently of
    // the order they appear in the source.
    let mut fields = IndexMap::new();
    for (name, field_ty) in &schema.fields {
        let found = source
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone());
        match found {
            Some(field_value) => {
                fields.insert(name.clone(), cast_value(&field_value, field_ty)?);
            }
            None => {
                return Err(TypeFault::Validation(format!(
                    "missing required field '{}'",
                    name
                )))
            }
        }
    }
    Ok(Value::record(RecordValue {
        fields,
        schema: Some(schema.clone()),
    }))
}

fn cast_to_array(
    value: &Value,
    elem: Option<&DataType>,
    size: Option<usize>,
) -> Result<Value, TypeFault> {
    let items: Vec<Value> = match value {
        Value::Array(array) => array.borrow().to_vec(),
        Value::Json(json) => match &*json.borrow() {
            JsonValue::Array(items) => items.clone(),
            JsonValue::Object(_) => {
                return Err(TypeFault::Type(
                    "cannot cast a json object to an array".to_string(),
                ))
            }
        },
        _ => {
            return Err(cast_fault(
                value,
                &DataType::Array {
                    elem: elem.cloned().map(Box::new),
                    size,
                },
            ))
        }
    };

    if let Some(size) = size {
        if items.len() != size {
            return Err(TypeFault::Type(format!(
                "cannot cast an array of length {} to a fixed array of length {}",
                items.len(),
                size
            )));
        }
    }

    let converted = match elem {
        Some(elem_ty) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(cast_value(item, elem_ty)?);
            }
            out
        }
        None => items,
    };

    let storage = match (elem, size) {
        (Some(DataType::Byte), Some(_)) => ArrayValue::FixedByte(
            converted
                .iter()
                .map(|v| match v {
                    Value::Byte(b) => *b,
                    _ => 0,
                })
                .collect(),
        ),
        (Some(DataType::Int), Some(_)) => ArrayValue::FixedInt(
            converted
                .iter()
                .map(|v| match v {
                    Value::Int(i) => *i,
                    _ => 0,
                })
                .collect(),
        ),
        (elem, Some(_)) => ArrayValue::FixedGeneric {
            elem: elem.cloned(),
            items: converted,
        },
        (_, None) => ArrayValue::Dynamic(converted),
    };
    Ok(Value::array(storage))
}

fn cast_to_queue(value: &Value, elem: &DataType) -> Result<Value, TypeFault> {
    let items: Vec<Value> = match value {
        Value::Queue(queue) => queue.borrow().items.iter().cloned().collect(),
        Value::Array(array) => array.borrow().to_vec(),
        _ => return Err(cast_fault(value, &DataType::Queue(Box::new(elem.clone())))),
    };
    let mut queue = QueueValue::new(Some(elem.clone()));
    for item in &items {
        queue.items.push_back(coerce_element(item, elem)?);
    }
    Ok(Value::queue(queue))
}
