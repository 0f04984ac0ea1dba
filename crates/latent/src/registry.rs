//! marker registry
//!
//! Maps generated marker keys back to the [Deferred] values they stand for.
//!
//! Entries are never removed. A registry grows with every deferred value that was ever turned into a marker,
//! which is what makes markers usable for as long as the registry lives. Use separate registries to isolate
//! independent documents (or tests) from each other.
use crate::deferred::Deferred;
use crate::error::ErrorKind;
use crate::marker::MarkerKind;
use indexmap::IndexMap;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Hint used for keys of deferred values that did not bring their own
pub const DEFAULT_HINT: &str = "TOKEN";

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<IndexMap<String, Deferred>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process wide registry
    ///
    /// Used when a [Deferred] is formatted via [std::fmt::Display] and when no registry is passed to
    /// [crate::resolve::resolve].
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Register `deferred` under a fresh key and return the encoded marker
    ///
    /// No attempt is made to deduplicate; [Deferred] caches its markers itself.
    pub(crate) fn register(&self, deferred: &Deferred, kind: MarkerKind) -> String {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let key = format!(
            "{}.{}",
            deferred.hint().unwrap_or(DEFAULT_HINT),
            entries.len()
        );
        entries.insert(key.clone(), deferred.clone());
        tracing::trace!(%key, ?kind, "token registered");

        kind.encode(&key)
    }

    /// Find a deferred value by key
    pub fn lookup(&self, key: &str) -> Result<Deferred, ErrorKind> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| ErrorKind::UnrecognizedTokenKey {
                key: key.to_string(),
            })
    }

    /// All keys in registration order
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
