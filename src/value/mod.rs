//! Description values.
//!
//! A structural description ("gene") is a plain, insertion-ordered record of
//! [`Value`]s. The same type backs every live node's store.
//!
//! # Example
//!
//! ```ignore
//! use spark_cell::{gene, Value};
//!
//! let list = gene! {
//!     "$type" => "ul",
//!     "_items" => vec!["a", "b"],
//!     "$components" => vec![
//!         gene! { "$type" => "li", "$text" => "a" },
//!         gene! { "$type" => "li", "$text" => "b" },
//!     ],
//! };
//! ```

mod callable;
mod freeze;

use indexmap::IndexMap;

pub use callable::Callable;
pub use freeze::{freeze, to_json};

/// A structural description, or a node's store: key to value, in insertion order.
pub type Gene = IndexMap<String, Value>;

/// A value held in a description or store.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Gene),
    Function(Callable),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Arrays and records. Reading one of these may precede an in-place mutation.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Scalars that map directly onto host attributes.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Gene> {
        match self {
            Value::Object(gene) => Some(gene),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Gene> {
        match self {
            Value::Object(gene) => Some(gene),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Callable> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Host attribute text for primitives; `None` for everything else.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Text content rendering: primitives as attribute text, null as empty.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Array(items) => items.iter().map(Value::to_text).collect::<Vec<_>>().join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => f.source().to_string(),
            primitive => primitive.to_attribute().unwrap_or_default(),
        }
    }

    /// Same value with every bound callable replaced by its original.
    pub fn unbound(&self) -> Value {
        match self {
            Value::Function(f) => Value::Function(f.original().clone()),
            Value::Array(items) => Value::Array(items.iter().map(Value::unbound).collect()),
            Value::Object(gene) => Value::Object(unbind_gene(gene)),
            other => other.clone(),
        }
    }
}

/// Copy of a record with every bound callable replaced by its original.
pub fn unbind_gene(gene: &Gene) -> Gene {
    gene.iter().map(|(k, v)| (k.clone(), v.unbound())).collect()
}

/// Number formatting the way host attributes print numbers.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value as f64)
                }
            }
        )*
    };
}

from_integer!(i32, i64, u8, u16, u32, u64, usize, f32);

impl From<Gene> for Value {
    fn from(value: Gene) -> Self {
        Value::Object(value)
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Value::Function(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Build a [`Gene`] from `key => value` pairs.
#[macro_export]
macro_rules! gene {
    () => {
        $crate::Gene::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut gene = $crate::Gene::new();
        $(
            gene.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        gene
    }};
}
