//! fragments of a string that had markers in it
use crate::deferred::Deferred;
use crate::error::ResolveError;
use crate::resolve::Resolver;
use crate::value::{Resolved, Value};

/// Either a literal part of the string, or an unresolved deferred value
#[derive(Debug, Clone)]
pub enum Fragment {
    Literal(String),
    Deferred(Deferred),
}

/// Result of splitting a string on its markers
///
/// Two literals never follow each other: adjacent literal text is merged on insertion.
#[derive(Debug, Clone, Default)]
pub struct Fragments {
    fragments: Vec<Fragment>,
}

impl Fragments {
    pub fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        if let Some(Fragment::Literal(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(Fragment::Literal(text.to_string()));
        }
    }

    pub fn push_deferred(&mut self, deferred: Deferred) {
        self.fragments.push(Fragment::Deferred(deferred));
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    pub fn as_slice(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Resolve every fragment on its own
    pub fn values(&self, resolver: &Resolver<'_>) -> Result<Vec<Option<Resolved>>, ResolveError> {
        self.fragments
            .iter()
            .map(|fragment| resolve_fragment(fragment, resolver))
            .collect()
    }

    /// Combine all fragments into one resolved value
    ///
    /// - no fragments: empty string
    /// - a single fragment: its value, unchanged (no stringification)
    /// - otherwise the deferred values are folded left to right through [Deferred::concat], so the [Joiner] of the
    ///   first deferred fragment decides what the combination looks like. Leading text is handed to it as `left`.
    ///
    /// [Joiner]: crate::deferred::Joiner
    #[tracing::instrument(level = "trace", skip_all, fields(fragments = self.fragments.len()))]
    pub fn join(&self, resolver: &Resolver<'_>) -> Result<Option<Resolved>, ResolveError> {
        match self.fragments.as_slice() {
            [] => return Ok(Some(Resolved::String(String::new()))),
            [single] => return resolve_fragment(single, resolver),
            _ => {}
        }

        let mut accumulator: Option<Deferred> = None;
        let mut leading = String::new();

        for fragment in &self.fragments {
            accumulator = Some(match (accumulator.take(), fragment) {
                (Some(token), fragment) => {
                    let right = resolve_fragment(fragment, resolver)?;
                    token.concat(None, right, resolver)?
                }
                (None, Fragment::Deferred(deferred)) if leading.is_empty() => deferred.clone(),
                (None, Fragment::Deferred(deferred)) => {
                    let left = Resolved::String(std::mem::take(&mut leading));
                    deferred.concat(Some(left), None, resolver)?
                }
                (None, Fragment::Literal(text)) => {
                    leading.push_str(text);
                    continue;
                }
            });
        }

        match accumulator {
            Some(token) => resolver.resolve(&Value::Deferred(token)),
            None => Ok(Some(Resolved::String(leading))),
        }
    }
}

fn resolve_fragment(
    fragment: &Fragment,
    resolver: &Resolver<'_>,
) -> Result<Option<Resolved>, ResolveError> {
    match fragment {
        Fragment::Literal(text) => Ok(Some(Resolved::String(text.clone()))),
        Fragment::Deferred(deferred) => resolver.resolve(&Value::Deferred(deferred.clone())),
    }
}
