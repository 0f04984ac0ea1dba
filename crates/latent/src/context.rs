//! resolution context
use crate::value::Resolved;
use indexmap::IndexMap;

/// Caller supplied data that is handed to every producer during a resolution pass
///
/// The resolver never looks inside. It is built up front and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: IndexMap<String, Resolved>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Resolved> {
        self.values.get(key)
    }

    /// Convenience for the common "look up a string" case
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Resolved::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Resolved>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Resolved)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Resolved>> FromIterator<(K, V)> for Context {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<IndexMap<String, Resolved>> for Context {
    fn from(values: IndexMap<String, Resolved>) -> Self {
        Self { values }
    }
}
