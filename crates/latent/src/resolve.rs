//! tree resolver
//!
//! Walks a [Value] and produces its [Resolved] form:
//!
//! | input                         | result                                                                    |
//! |-------------------------------|---------------------------------------------------------------------------|
//! | undefined                     | `None`                                                                    |
//! | null, boolean, number         | unchanged                                                                 |
//! | string                        | unchanged, unless it contains scalar markers: then split and joined       |
//! | deferred                      | evaluated, and the result resolved again                                  |
//! | array                         | elements resolved, undefined elements dropped                             |
//! | array with a list marker      | the value of the list marker's deferred value                             |
//! | object                        | keys and values resolved, entries with undefined values dropped           |
//! | function / construct          | error                                                                     |
use crate::context::Context;
use crate::error::{ErrorKind, ResolveError};
use crate::fragments::Fragment;
use crate::marker::{MarkerKind, TokenString};
use crate::registry::Registry;
use crate::value::{Resolved, Value};
use indexmap::IndexMap;

/// Paths longer than this are assumed to be circular
pub const MAX_DEPTH: usize = 200;

/// How often a string with markers may be entered again while resolving one of its own markers
///
/// Each level costs a lot more stack than a level of the path does, so this is much smaller than [MAX_DEPTH].
pub const MAX_MARKER_DEPTH: usize = 16;

/// Options for [resolve]
#[derive(Debug, Default)]
pub struct ResolveOptions<'a> {
    /// Handed to every producer
    pub context: Context,
    /// Path the resolved value lives at, used for error messages and the depth limit
    pub prefix: Vec<String>,
    /// Where markers are looked up, [Registry::global] when `None`
    pub registry: Option<&'a Registry>,
}

/// Resolve `value` and everything nested in it
///
/// Either everything resolves or the first error is returned, there is no partial result.
pub fn resolve(
    value: &Value,
    options: &ResolveOptions<'_>,
) -> Result<Option<Resolved>, ResolveError> {
    let registry = options.registry.unwrap_or(Registry::global());
    let resolver = Resolver::new(&options.context, registry).with_prefix(options.prefix.clone());

    tracing::debug!(path = %resolver.path(), "resolving");
    resolver.resolve(value)
}

/// Whether `value` needs resolving at all
///
/// True for deferred values, strings with scalar markers and single element lists that hold a
/// list marker.
pub fn unresolved(value: &Value) -> bool {
    match value {
        Value::Deferred(_) => true,
        Value::String(text) => TokenString::new(text, MarkerKind::Scalar).test(),
        Value::Array(items) if items.len() == 1 => is_list_token(&items[0]),
        _ => false,
    }
}

fn is_list_token(value: &Value) -> bool {
    matches!(value, Value::String(text) if TokenString::new(text, MarkerKind::List).test())
}

/// State of a resolution pass at one node of the tree
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    context: &'a Context,
    registry: &'a Registry,
    prefix: Vec<String>,
    /// deferred values resolved in a row at this node
    chain: usize,
    /// strings with markers currently being resolved further up
    markers: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(context: &'a Context, registry: &'a Registry) -> Self {
        Self {
            context,
            registry,
            prefix: vec![],
            chain: 0,
            markers: 0,
        }
    }

    pub fn with_prefix(mut self, prefix: Vec<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Current path, e.g. `/Resources/MyVpc/Properties`
    pub fn path(&self) -> String {
        format!("/{}", self.prefix.join("/"))
    }

    pub fn resolve(&self, value: &Value) -> Result<Option<Resolved>, ResolveError> {
        if self.prefix.len() > MAX_DEPTH || self.chain > MAX_DEPTH {
            return Err(self.error(ErrorKind::StructureTooDeep));
        }

        match value {
            Value::Undefined => Ok(None),
            Value::Null => Ok(Some(Resolved::Null)),
            Value::Boolean(b) => Ok(Some(Resolved::Boolean(*b))),
            Value::Integer(i) => Ok(Some(Resolved::Integer(*i))),
            Value::Decimal(d) => Ok(Some(Resolved::Decimal(*d))),
            Value::String(text) => self.resolve_string(text),
            Value::Function(_) => Err(self.error(ErrorKind::UnsupportedDeferred)),
            Value::Deferred(deferred) => {
                let value = deferred.resolve(self.context);
                self.chained().resolve(&value)
            }
            Value::Array(items) if items.iter().any(is_list_token) => {
                self.resolve_list_token(items)
            }
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    if let Some(item) = self.descend(index.to_string()).resolve(item)? {
                        resolved.push(item);
                    }
                }
                Ok(Some(Resolved::Array(resolved)))
            }
            Value::Object(entries) => {
                let mut resolved = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let resolved_key = self.resolve_key(key)?;
                    if let Some(value) = self.descend(key.clone()).resolve(value)? {
                        resolved.insert(resolved_key, value);
                    }
                }
                Ok(Some(Resolved::Object(resolved)))
            }
            Value::Construct(node) => Err(self.error(ErrorKind::CyclicStructure {
                node: node.node_path(),
            })),
        }
    }

    /// Replace scalar markers in `text` with the values they stand for
    fn resolve_string(&self, text: &str) -> Result<Option<Resolved>, ResolveError> {
        let token_string = TokenString::new(text, MarkerKind::Scalar);
        if !token_string.test() {
            return Ok(Some(Resolved::String(text.to_string())));
        }

        let nested = self.nested()?;
        let fragments = token_string
            .split(|key| self.registry.lookup(key))
            .map_err(|kind| self.error(kind))?;
        fragments.join(&nested)
    }

    fn resolve_key(&self, key: &str) -> Result<String, ResolveError> {
        match self.resolve_string(key)? {
            Some(Resolved::String(resolved)) => Ok(resolved),
            other => Err(self.error(ErrorKind::NonStringKey {
                key: key.to_string(),
                resolved: other.map_or_else(|| "undefined".to_string(), |r| r.to_string()),
            })),
        }
    }

    /// A list marker must be the only element of its list and the only content of that element
    fn resolve_list_token(&self, items: &[Value]) -> Result<Option<Resolved>, ResolveError> {
        let [Value::String(text)] = items else {
            return Err(self.error(ErrorKind::InvalidListConcatenation {
                text: describe(items),
            }));
        };

        let nested = self.nested()?;
        let fragments = TokenString::new(text, MarkerKind::List)
            .split(|key| self.registry.lookup(key))
            .map_err(|kind| self.error(kind))?;

        match fragments.as_slice() {
            [Fragment::Deferred(deferred)] => nested.resolve(&Value::Deferred(deferred.clone())),
            fragments
                if fragments
                    .iter()
                    .any(|fragment| matches!(fragment, Fragment::Literal(_))) =>
            {
                Err(self.error(ErrorKind::InvalidListConcatenation { text: text.clone() }))
            }
            _ => Err(self.error(ErrorKind::CannotConcatenateListToken { text: text.clone() })),
        }
    }

    fn descend(&self, segment: String) -> Resolver<'a> {
        let mut prefix = self.prefix.clone();
        prefix.push(segment);

        Resolver {
            context: self.context,
            registry: self.registry,
            prefix,
            chain: 0,
            markers: self.markers,
        }
    }

    /// Resolver for the contents of a string with markers
    fn nested(&self) -> Result<Resolver<'a>, ResolveError> {
        if self.markers >= MAX_MARKER_DEPTH {
            return Err(self.error(ErrorKind::StructureTooDeep));
        }

        Ok(Resolver {
            markers: self.markers + 1,
            ..self.clone()
        })
    }

    fn chained(&self) -> Resolver<'a> {
        Resolver {
            chain: self.chain + 1,
            ..self.clone()
        }
    }

    fn error(&self, kind: ErrorKind) -> ResolveError {
        kind.at(self.path())
    }
}

/// Short description of list elements for error messages
fn describe(items: &[Value]) -> String {
    let elements: Vec<&str> = items
        .iter()
        .map(|item| match item {
            Value::String(text) => text.as_str(),
            _ => "<non-string>",
        })
        .collect();
    elements.join(",")
}
