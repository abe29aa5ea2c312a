use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::ast::{Param, Stmt};
use crate::interpreter::environment::Environment;
use crate::types::{coerce_element, DataType, RecordType, TypeExpr};

/// A runtime value. Scalars are plain; containers share through
/// `Rc<RefCell<..>>` so aliased arrays, records, queues and json trees see
/// each other's mutations.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Str(Rc<str>),
    Date(NaiveDateTime),
    Json(Rc<RefCell<JsonValue>>),
    Record(Rc<RefCell<RecordValue>>),
    Array(Rc<RefCell<ArrayValue>>),
    Queue(Rc<RefCell<QueueValue>>),
    Function(Rc<FunctionValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
}

/// Record fields keep insertion order and lowercased names. `schema` is
/// present only when the record came from a schema-enforcing cast.
#[derive(Debug, Clone)]
pub struct RecordValue {
    pub fields: IndexMap<String, Value>,
    pub schema: Option<Rc<RecordType>>,
}

/// Array storage strategies. Fixed variants keep their length forever;
/// the byte and int variants store elements unboxed.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Dynamic(Vec<Value>),
    FixedGeneric {
        elem: Option<DataType>,
        items: Vec<Value>,
    },
    FixedByte(Vec<u8>),
    FixedInt(Vec<i32>),
}

/// A failed container element access or write.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementFault {
    OutOfBounds { index: i64, len: usize },
    Incompatible(String),
}

impl ArrayValue {
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Dynamic(items) => items.len(),
            ArrayValue::FixedGeneric { items, .. } => items.len(),
            ArrayValue::FixedByte(items) => items.len(),
            ArrayValue::FixedInt(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: i64) -> Result<Value, ElementFault> {
        let len = self.len();
        if index < 0 || index as usize >= len {
            return Err(ElementFault::OutOfBounds { index, len });
        }
        let i = index as usize;
        Ok(match self {
            ArrayValue::Dynamic(items) => items[i].clone(),
            ArrayValue::FixedGeneric { items, .. } => items[i].clone(),
            ArrayValue::FixedByte(items) => Value::Byte(items[i]),
            ArrayValue::FixedInt(items) => Value::Int(items[i]),
        })
    }

    pub fn set(&mut self, index: i64, value: Value) -> Result<(), ElementFault> {
        let len = self.len();
        if index < 0 || index as usize >= len {
            return Err(ElementFault::OutOfBounds { index, len });
        }
        let i = index as usize;
        match self {
            ArrayValue::Dynamic(items) => {
                items[i] = value;
                Ok(())
            }
            ArrayValue::FixedGeneric { elem, items } => {
                let stored = match elem {
                    Some(elem_ty) => coerce_element(&value, elem_ty)
                        .map_err(|fault| ElementFault::Incompatible(fault.message().to_string()))?,
                    None => value,
                };
                items[i] = stored;
                Ok(())
            }
            ArrayValue::FixedByte(items) => {
                items[i] = byte_element(&value)?;
                Ok(())
            }
            ArrayValue::FixedInt(items) => {
                items[i] = int_element(&value)?;
                Ok(())
            }
        }
    }

    /// Materializes the elements as boxed values regardless of storage.
    pub fn to_vec(&self) -> Vec<Value> {
        match self {
            ArrayValue::Dynamic(items) => items.clone(),
            ArrayValue::FixedGeneric { items, .. } => items.clone(),
            ArrayValue::FixedByte(items) => items.iter().map(|b| Value::Byte(*b)).collect(),
            ArrayValue::FixedInt(items) => items.iter().map(|i| Value::Int(*i)).collect(),
        }
    }

    pub fn is_fixed(&self) -> bool {
        !matches!(self, ArrayValue::Dynamic(_))
    }
}

fn byte_element(value: &Value) -> Result<u8, ElementFault> {
    match value {
        Value::Byte(b) => Ok(*b),
        Value::Int(i) if (0..=255).contains(i) => Ok(*i as u8),
        Value::Long(l) if (0..=255).contains(l) => Ok(*l as u8),
        other => Err(ElementFault::Incompatible(format!(
            "cannot store {} in a byte array",
            crate::types::type_of(other)
        ))),
    }
}

fn int_element(value: &Value) -> Result<i32, ElementFault> {
    match value {
        Value::Byte(b) => Ok(*b as i32),
        Value::Int(i) => Ok(*i),
        Value::Long(l) if i32::try_from(*l).is_ok() => Ok(*l as i32),
        other => Err(ElementFault::Incompatible(format!(
            "cannot store {} in an int array",
            crate::types::type_of(other)
        ))),
    }
}

/// FIFO queue with an optional declared element type; pushes coerce to it.
#[derive(Debug, Clone)]
pub struct QueueValue {
    pub elem: Option<DataType>,
    pub items: VecDeque<Value>,
}

impl QueueValue {
    pub fn new(elem: Option<DataType>) -> Self {
        Self {
            elem,
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), ElementFault> {
        let stored = match &self.elem {
            Some(elem_ty) => coerce_element(&value, elem_ty)
                .map_err(|fault| ElementFault::Incompatible(fault.message().to_string()))?,
            None => value,
        };
        self.items.push_back(stored);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<Value> {
        self.items.front().cloned()
    }
}

/// A user-defined function plus the environment it closed over. The return
/// type stays unresolved so aliases declared after the function still apply.
#[derive(Debug)]
pub struct FunctionValue {
    pub name: Rc<str>,
    pub params: Vec<Param>,
    pub return_ty: Option<TypeExpr>,
    pub body: Rc<Vec<Stmt>>,
    pub env: Environment,
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(storage: ArrayValue) -> Self {
        Value::Array(Rc::new(RefCell::new(storage)))
    }

    pub fn dynamic_array(items: Vec<Value>) -> Self {
        Value::array(ArrayValue::Dynamic(items))
    }

    pub fn queue(queue: QueueValue) -> Self {
        Value::Queue(Rc::new(RefCell::new(queue)))
    }

    pub fn record(record: RecordValue) -> Self {
        Value::Record(Rc::new(RefCell::new(record)))
    }

    pub fn json_object(fields: IndexMap<String, Value>) -> Self {
        Value::Json(Rc::new(RefCell::new(JsonValue::Object(fields))))
    }

    pub fn json_array(items: Vec<Value>) -> Self {
        Value::Json(Rc::new(RefCell::new(JsonValue::Array(items))))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Value::Byte(_) | Value::Int(_) | Value::Long(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(b) => Some(*b as f64),
            Value::Int(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::Float(x) => Some(*x as f64),
            Value::Double(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(b) => Some(*b as i64),
            Value::Int(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (a, b) if a.is_integral() && b.is_integral() => a.as_i64() == b.as_i64(),
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            (Value::Json(a), Value::Json(b)) => *a.borrow() == *b.borrow(),
            (Value::Record(a), Value::Record(b)) => a.borrow().fields == b.borrow().fields,
            (Value::Array(a), Value::Array(b)) => a.borrow().to_vec() == b.borrow().to_vec(),
            (Value::Queue(a), Value::Queue(b)) => a.borrow().items == b.borrow().items,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        write!(f, "NaN")
    } else if x.is_infinite() {
        write!(f, "{}", if x > 0.0 { "Infinity" } else { "-Infinity" })
    } else if x == x.trunc() && x.abs() < 1e15 {
        write!(f, "{:.1}", x)
    } else {
        write!(f, "{}", x)
    }
}

/// Like `Display` but quotes strings, for elements inside containers.
fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "\"{}\"", s),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Byte(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(x) => write_float(f, *x as f64),
            Value::Double(x) => write_float(f, *x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Json(json) => match &*json.borrow() {
                JsonValue::Object(fields) => {
                    write!(f, "{{")?;
                    for (i, (key, value)) in fields.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "\"{}\": ", key)?;
                        write_nested(f, value)?;
                    }
                    write!(f, "}}")
                }
                JsonValue::Array(items) => {
                    write!(f, "[")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write_nested(f, item)?;
                    }
                    write!(f, "]")
                }
            },
            Value::Record(record) => {
                write!(f, "{{")?;
                for (i, (name, value)) in record.borrow().fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", name)?;
                    write_nested(f, value)?;
                }
                write!(f, "}}")
            }
            Value::Array(array) => {
                write!(f, "[")?;
                for (i, item) in array.borrow().to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, item)?;
                }
                write!(f, "]")
            }
            Value::Queue(queue) => {
                write!(f, "[")?;
                for (i, item) in queue.borrow().items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, item)?;
                }
                write!(f, "]")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_across_widths() {
        assert_eq!(Value::Int(5), Value::Long(5));
        assert_eq!(Value::Int(5), Value::Double(5.0));
        assert_ne!(Value::Int(5), Value::Str(Rc::from("5")));
    }

    #[test]
    fn test_array_deep_equality_across_storage() {
        let a = ArrayValue::Dynamic(vec![Value::Int(1), Value::Int(2)]);
        let b = ArrayValue::FixedInt(vec![1, 2]);
        assert_eq!(Value::array(a), Value::array(b));
    }

    #[test]
    fn test_fixed_byte_set_rejects_out_of_range() {
        let mut array = ArrayValue::FixedByte(vec![0; 3]);
        assert!(array.set(0, Value::Int(200)).is_ok());
        let fault = array.set(1, Value::Int(300)).unwrap_err();
        assert!(matches!(fault, ElementFault::Incompatible(_)));
        let fault = array.set(9, Value::Int(1)).unwrap_err();
        assert!(matches!(fault, ElementFault::OutOfBounds { .. }));
    }

    #[test]
    fn test_typed_queue_coerces_pushes() {
        let mut queue = QueueValue::new(Some(DataType::Int));
        queue.push(Value::Double(3.7)).unwrap();
        assert_eq!(queue.pop(), Some(Value::Int(3)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Double(3.0).to_string(), "3.0");
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(
            Value::dynamic_array(vec![Value::Int(1), Value::string("a")]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(Value::Null.to_string(), "null");
    }
}
