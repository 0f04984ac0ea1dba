//! deferred values
//!
//! A [Deferred] stands for a value that is not known while the document is being put together. It either wraps a
//! literal or a function of the [Context] that is only called during resolution.
//!
//! Deferred values can be placed anywhere a [Value] is accepted. Where only text fits, format them: they turn into a
//! marker (see [crate::marker]) that survives being copied and concatenated, and is turned back into the deferred
//! value when the string gets resolved.
use crate::context::Context;
use crate::error::{ErrorKind, ResolveError};
use crate::marker::{self, MarkerKind};
use crate::registry::Registry;
use crate::resolve::Resolver;
use crate::value::{decimal_text, ProducerFn, Resolved, Value};
use serde::ser::Error as _;
use std::sync::{Arc, OnceLock};

/// What a [Deferred] evaluates to
#[derive(Clone)]
pub enum Producer {
    Value(Value),
    Function(Arc<ProducerFn>),
}

impl Producer {
    pub fn from_fn(f: impl Fn(&Context) -> Value + Send + Sync + 'static) -> Self {
        Producer::Function(Arc::new(f))
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Producer::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Producer::Function(_) => f.write_str("Function"),
        }
    }
}

/// Combines the parts of a string that had deferred values embedded into it
///
/// Parts arrive resolved, in order, without undefined values. The default ([StringJoiner]) produces the plain
/// concatenated string. A target that has its own concatenation primitive (an intrinsic join function) supplies a
/// joiner that builds that instead.
pub trait Joiner: Send + Sync {
    fn join(&self, parts: Vec<Resolved>) -> Value;
}

/// Joins the text form of all parts
#[derive(Debug, Default, Clone, Copy)]
pub struct StringJoiner;

impl Joiner for StringJoiner {
    fn join(&self, parts: Vec<Resolved>) -> Value {
        Value::String(parts.iter().map(ToString::to_string).collect())
    }
}

/// A lazily evaluated value
///
/// Clones share identity: equality is reference equality, two separately created deferred values are never equal.
#[derive(Clone)]
pub struct Deferred(Arc<Inner>);

struct Inner {
    producer: Producer,
    hint: Option<String>,
    joiner: Arc<dyn Joiner>,
    scalar_marker: OnceLock<String>,
    list_marker: OnceLock<String>,
}

impl Deferred {
    pub fn builder(producer: Producer) -> DeferredBuilder {
        DeferredBuilder {
            producer,
            hint: None,
            joiner: Arc::new(StringJoiner),
        }
    }

    /// Deferred value that evaluates to `value`
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::builder(Producer::Value(value.into())).build()
    }

    /// Deferred value computed by `f` at resolution time
    pub fn from_fn(f: impl Fn(&Context) -> Value + Send + Sync + 'static) -> Self {
        Self::builder(Producer::from_fn(f)).build()
    }

    /// Like [Deferred::from_fn] with a human readable hint that shows up in its marker
    pub fn hinted(
        hint: &str,
        f: impl Fn(&Context) -> Value + Send + Sync + 'static,
    ) -> Result<Self, ErrorKind> {
        Ok(Self::builder(Producer::from_fn(f)).hint(hint)?.build())
    }

    pub fn hint(&self) -> Option<&str> {
        self.0.hint.as_deref()
    }

    /// Evaluate the producer
    ///
    /// Functions are called on every resolution, the result is not cached. The returned value may contain further
    /// deferred values, use [crate::resolve::resolve] to get to the bottom of it.
    pub fn resolve(&self, context: &Context) -> Value {
        match &self.0.producer {
            Producer::Value(value) => value.clone(),
            Producer::Function(f) => f(context),
        }
    }

    /// The text this value is represented by inside a string
    ///
    /// A string, number or boolean literal is simply written out and nothing gets registered. Anything else is
    /// registered with `registry` the first time it is asked for, later calls return the same marker.
    ///
    /// The marker is cached per deferred value, not per registry: it is only meaningful to the registry that was
    /// used first.
    pub fn to_scalar_marker(&self, registry: &Registry) -> String {
        if let Producer::Value(value) = &self.0.producer {
            match value {
                Value::String(s) => return s.clone(),
                Value::Integer(i) => return i.to_string(),
                Value::Decimal(d) => return decimal_text(*d),
                Value::Boolean(b) => return b.to_string(),
                _ => {}
            }
        }

        self.0
            .scalar_marker
            .get_or_init(|| registry.register(self, MarkerKind::Scalar))
            .clone()
    }

    /// Represent this value as a list of strings
    ///
    /// For deferred values that intrinsically evaluate to a list. The result is a single element list holding a
    /// list marker. Nothing can be done with it but passing it on as a whole; adding elements or text fails at
    /// resolution time.
    pub fn to_list_marker(&self, registry: &Registry) -> Result<Vec<String>, ErrorKind> {
        if self.is_primitive_literal() {
            return Err(ErrorKind::InvalidTokenUse);
        }

        let marker = self
            .0
            .list_marker
            .get_or_init(|| registry.register(self, MarkerKind::List));
        Ok(vec![marker.clone()])
    }

    /// Combine with text (or other resolved parts) on either side
    ///
    /// Resolves `self` in the pass of `resolver`, then hands `left`, the result and `right` (skipping undefined)
    /// to this value's [Joiner]. The returned deferred value uses the same joiner.
    pub fn concat(
        &self,
        left: Option<Resolved>,
        right: Option<Resolved>,
        resolver: &Resolver<'_>,
    ) -> Result<Deferred, ResolveError> {
        let middle = resolver.resolve(&Value::Deferred(self.clone()))?;
        let parts: Vec<Resolved> = [left, middle, right].into_iter().flatten().collect();
        let joined = self.0.joiner.join(parts);

        Ok(Deferred(Arc::new(Inner::new(
            Producer::Value(joined),
            None,
            Arc::clone(&self.0.joiner),
        ))))
    }

    fn is_primitive_literal(&self) -> bool {
        matches!(&self.0.producer, Producer::Value(value) if value.is_primitive())
    }
}

impl Inner {
    fn new(producer: Producer, hint: Option<String>, joiner: Arc<dyn Joiner>) -> Self {
        Self {
            producer,
            hint,
            joiner,
            scalar_marker: OnceLock::new(),
            list_marker: OnceLock::new(),
        }
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("hint", &self.0.hint)
            .field("producer", &self.0.producer)
            .finish()
    }
}

/// Writes the scalar marker, registered with [Registry::global]
impl std::fmt::Display for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_scalar_marker(Registry::global()))
    }
}

/// Always fails
///
/// A generic serializer would write out the marker text instead of the value, run the resolver instead.
impl serde::Serialize for Deferred {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(ErrorKind::UnsupportedSerialization))
    }
}

pub struct DeferredBuilder {
    producer: Producer,
    hint: Option<String>,
    joiner: Arc<dyn Joiner>,
}

impl DeferredBuilder {
    /// Display hint, restricted to alphanumerics and `_.:-`
    pub fn hint(mut self, hint: &str) -> Result<Self, ErrorKind> {
        if !marker::is_valid_key(hint) {
            return Err(ErrorKind::InvalidTokenHint {
                hint: hint.to_string(),
            });
        }

        self.hint = Some(hint.to_string());
        Ok(self)
    }

    pub fn joiner(mut self, joiner: impl Joiner + 'static) -> Self {
        self.joiner = Arc::new(joiner);
        self
    }

    pub fn build(self) -> Deferred {
        Deferred(Arc::new(Inner::new(self.producer, self.hint, self.joiner)))
    }
}
