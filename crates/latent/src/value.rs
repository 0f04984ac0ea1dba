//! value representation
//!
//! There are two trees:
//! - [Value] is what callers build. Besides plain data it may contain [Deferred] values, strings with embedded
//!   token markers, and a few things that are only there so they can be rejected (raw callables, construct nodes).
//! - [Resolved] is what a resolution pass produces. It contains plain data only:
//!   - null
//!   - boolean (true/false)
//!   - integer (signed, i64)
//!   - decimal (f64)
//!   - string (utf-8)
//!   - array ("list" of values)
//!   - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! `undefined` only exists on the input side ([Value::Undefined]). A resolved `undefined` is `None`, and the
//! resolver drops it from arrays and objects.
use crate::context::Context;
use crate::deferred::Deferred;
use crate::error::ErrorKind;
use indexmap::IndexMap;
use serde::{
    ser::{Error as _, SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use std::sync::Arc;

/// A (possibly) unresolved value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Deferred(Deferred),
    /// A bare function. Lazy values must be wrapped in a [Deferred], resolving this always fails.
    Function(Callable),
    /// A node of the construct tree. Never resolvable.
    Construct(Arc<dyn Construct>),
}

impl Value {
    /// Build an [Value::Object] from key/value pairs
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// `true` for string, number and boolean
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) | Value::String(_)
        )
    }
}

/// Shared signature of everything that computes a value from a [Context]
pub type ProducerFn = dyn Fn(&Context) -> Value + Send + Sync;

/// A raw callable
#[derive(Clone)]
pub struct Callable(pub Arc<ProducerFn>);

impl Callable {
    pub fn new(f: impl Fn(&Context) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callable")
    }
}

/// A node of the surrounding construct tree
///
/// Nodes link to their parents and children, so walking into one would never terminate.
pub trait Construct: std::fmt::Debug + Send + Sync {
    /// Path of the node inside the tree, used in error messages
    fn node_path(&self) -> String;
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<Deferred> for Value {
    fn from(value: Deferred) -> Self {
        Self::Deferred(value)
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Self::Function(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Undefined)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::object(value)
    }
}

impl From<Resolved> for Value {
    fn from(value: Resolved) -> Self {
        match value {
            Resolved::Null => Value::Null,
            Resolved::Boolean(b) => b.into(),
            Resolved::Integer(i) => i.into(),
            Resolved::Decimal(d) => d.into(),
            Resolved::String(s) => s.into(),
            Resolved::Array(a) => a.into(),
            Resolved::Object(o) => o.into(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Resolved::from(value).into()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                // undefined members are left out, like the resolver does
                let defined: Vec<_> = value
                    .iter()
                    .filter(|(_, element_value)| !matches!(element_value, Value::Undefined))
                    .collect();
                let mut ser = serializer.serialize_map(Some(defined.len()))?;
                for (element_key, element_value) in defined {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Deferred(deferred) => deferred.serialize(serializer),
            Value::Function(_) | Value::Construct(_) => {
                Err(S::Error::custom(ErrorKind::UnsupportedSerialization))
            }
        }
    }
}

/// A fully resolved value
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Resolved>),
    Object(IndexMap<String, Resolved>),
}

impl Resolved {
    /// Build an [Resolved::Object] from key/value pairs
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Resolved>,
    {
        Resolved::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Resolved::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Resolved {
    fn from(value: String) -> Self {
        Resolved::String(value)
    }
}

impl From<&str> for Resolved {
    fn from(value: &str) -> Self {
        Resolved::String(value.to_string())
    }
}

impl From<bool> for Resolved {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Resolved {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Resolved {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Resolved {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Resolved>> From<Vec<T>> for Resolved {
    fn from(value: Vec<T>) -> Self {
        Resolved::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Resolved>> From<IndexMap<K, V>> for Resolved {
    fn from(value: IndexMap<K, V>) -> Self {
        Resolved::object(value)
    }
}

impl From<serde_json::Value> for Resolved {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Resolved::Null,
            Json::Bool(b) => b.into(),
            Json::Number(num) => match num.as_i64() {
                Some(int) => Resolved::Integer(int),
                // u64 beyond i64::MAX ends up here as well
                None => Resolved::Decimal(num.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => s.into(),
            Json::Array(a) => a.into(),
            Json::Object(o) => Resolved::object(o),
        }
    }
}

/// Text form of a decimal inside a rendered string
///
/// Plain digits between `1e-6` and `1e21`, exponent notation (`1e+21`, `1.5e-7`) outside of that.
/// Non-finite values are written as `NaN`, `Infinity` and `-Infinity`.
pub fn decimal_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    // also covers -0
    if value == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&value.abs()) {
        return value.to_string();
    }

    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

/// Text form used when a value is concatenated into a string
///
/// Strings are written verbatim. Array elements are written one after the other, separated by
/// `,` (nested arrays flatten, `null` elements are empty). Objects are written as compact JSON.
impl std::fmt::Display for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolved::Null => f.write_str("null"),
            Resolved::Boolean(value) => write!(f, "{value}"),
            Resolved::Integer(value) => write!(f, "{value}"),
            Resolved::Decimal(value) => f.write_str(&decimal_text(*value)),
            Resolved::String(value) => f.write_str(value),
            Resolved::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    if *item != Resolved::Null {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Resolved::Object(_) => {
                let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl Serialize for Resolved {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Resolved::Null => serializer.serialize_unit(),
            Resolved::Boolean(value) => serializer.serialize_bool(*value),
            Resolved::Integer(value) => serializer.serialize_i64(*value),
            Resolved::Decimal(value) => serializer.serialize_f64(*value),
            Resolved::String(value) => serializer.serialize_str(value),
            Resolved::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Resolved::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display() {
        assert_eq!(Resolved::Null.to_string(), "null");
        assert_eq!(Resolved::Integer(-3).to_string(), "-3");
        assert_eq!(Resolved::Decimal(1.5).to_string(), "1.5");
        assert_eq!(Resolved::from("plain").to_string(), "plain");
        assert_eq!(
            Resolved::object([("a", Resolved::from(vec![1, 2]))]).to_string(),
            r#"{"a":[1,2]}"#
        );
    }

    #[test]
    fn arrays_display_as_their_elements() {
        assert_eq!(Resolved::from(vec![1, 2]).to_string(), "1,2");
        assert_eq!(
            Resolved::Array(vec![
                Resolved::from("a"),
                Resolved::Null,
                Resolved::from(vec![Resolved::from(true), Resolved::Decimal(0.5)]),
            ])
            .to_string(),
            "a,,true,0.5"
        );
        assert_eq!(Resolved::Array(vec![]).to_string(), "");
    }

    #[test]
    fn decimals() {
        assert_eq!(decimal_text(0.1), "0.1");
        assert_eq!(decimal_text(-0.0), "0");
        assert_eq!(decimal_text(1e20), "100000000000000000000");
        assert_eq!(decimal_text(1e21), "1e+21");
        assert_eq!(decimal_text(-2.5e30), "-2.5e+30");
        assert_eq!(decimal_text(0.000001), "0.000001");
        assert_eq!(decimal_text(1.5e-7), "1.5e-7");
        assert_eq!(decimal_text(f64::INFINITY), "Infinity");
        assert_eq!(decimal_text(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(decimal_text(f64::NAN), "NaN");
    }

    #[test]
    fn serialization_keeps_insertion_order() {
        let value = Resolved::object([("zeta", 1), ("alpha", 2)]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"zeta":1,"alpha":2}"#
        );
    }

    #[test]
    fn from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"n": 1, "d": 0.5, "list": [true, null]}"#).unwrap();

        assert_eq!(
            Resolved::from(json),
            Resolved::object([
                ("n", Resolved::Integer(1)),
                ("d", Resolved::Decimal(0.5)),
                (
                    "list",
                    Resolved::Array(vec![Resolved::Boolean(true), Resolved::Null])
                ),
            ])
        );
    }

    #[test]
    fn plain_values_serialize() {
        let value = Value::object([("name", Value::from("web")), ("cpu", Value::from(1024))]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"name":"web","cpu":1024}"#
        );
    }

    #[test]
    fn undefined_members_are_not_serialized() {
        let value = Value::object([
            ("name", Value::from("web")),
            ("tags", Value::Undefined),
            ("ports", Value::from(vec![Value::from(80), Value::Undefined])),
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"name":"web","ports":[80,null]}"#
        );
    }

    #[test]
    fn callables_refuse_serialization() {
        let value = Value::Array(vec![Callable::new(|_| Value::Null).into()]);
        let err = serde_json::to_string(&value).expect_err("must not serialize");
        assert!(err.to_string().contains("cannot be serialized"));
    }
}
