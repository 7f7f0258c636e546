use std::collections::BTreeMap;

use time::OffsetDateTime;

/// Represents an XML-RPC data value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<int>` or `<i4>`. XML-RPC integers are 4-byte signed.
    Int(i32),
    /// `<double>`.
    Double(f64),
    /// `<string>`.
    String(String),
    /// `<boolean>`, transmitted as `0` or `1`.
    Boolean(bool),
    /// `<base64>`, decoded to raw bytes.
    Base64(Vec<u8>),
    /// `<dateTime.iso8601>`, parsed with the RFC 3339 layout.
    DateTime(OffsetDateTime),
    /// `<nil/>`.
    Nil,
    /// `<array>` with a nested `<data>` element.
    Array(self::Array),
    /// `<struct>` of uniquely named `<member>` elements.
    Struct(self::Struct),
}

pub type Array = Vec<Value>;
pub type Struct = BTreeMap<String, Value>;

/// A procedure call: method name plus ordered arguments.
///
/// Built fresh for every serialization and returned by
/// [`decode_call`](crate::decoding::decode_call); never reused across
/// calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub name: String,
    pub params: Vec<Value>,
}

impl Value {
    /// If the value is a Struct, returns the member with the provided name.
    /// Otherwise, returns None.
    pub fn find<'a>(&'a self, key: &str) -> Option<&'a Value> {
        match self {
            Value::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Attempts to get a nested Struct member for each key in `keys`.
    /// If any key is found not to exist, find_path will return None.
    /// Otherwise, it will return the value associated with the final key.
    pub fn find_path<'a>(&'a self, keys: &[&str]) -> Option<&'a Value> {
        let mut target = self;
        for key in keys.iter() {
            match target.find(key) {
                Some(t) => target = t,
                None => return None,
            }
        }
        Some(target)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Base64(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<OffsetDateTime> {
        match *self {
            Value::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Double(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Base64(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Value {
        Value::DateTime(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Value {
        Value::Array(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Value {
        Value::Struct(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_path() {
        let mut inner = Struct::new();
        inner.insert("leaf".to_string(), Value::Int(7));
        let mut outer = Struct::new();
        outer.insert("inner".to_string(), Value::Struct(inner));
        let value = Value::Struct(outer);

        assert_eq!(value.find_path(&["inner", "leaf"]), Some(&Value::Int(7)));
        assert_eq!(value.find_path(&["inner", "missing"]), None);
        assert_eq!(value.find("leaf"), None);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(3).as_i32(), Some(3));
        assert_eq!(Value::Int(3).as_f64(), None);
        assert_eq!(Value::String("x".to_string()).as_str(), Some("x"));
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert!(Value::Nil.is_nil());
        assert!(!Value::Int(0).is_nil());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(41), Value::Int(41));
        assert_eq!(Value::from(2.5f32), Value::Double(2.5));
        assert_eq!(Value::from("hi"), Value::String("hi".to_string()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Base64(vec![1, 2]));
        assert_eq!(
            Value::from(vec![Value::Int(1)]),
            Value::Array(vec![Value::Int(1)])
        );
    }
}
