//! token marker codec
//!
//! A deferred value that has to travel through plain text is replaced by a marker that names its registry key.
//!
//! ```text
//! scalar-marker = "${Token[" key "]}"
//! list-marker   = "#{Token[" key "]}"      ; only valid as the single element of a list
//! key           = 1*( ALPHA / DIGIT / ":" / "." / "_" / "-" )
//! ```
//!
//! Keys are generated by the [crate::registry::Registry] as `<hint>.<counter>`, e.g. `${Token[VpcId.7]}`.
//! The exact format matters: anything that post-processes rendered text relies on it.
use crate::deferred::Deferred;
use crate::error::ErrorKind;
use crate::fragments::Fragments;
use regex::Regex;
use std::sync::LazyLock;

pub const BEGIN_STRING_TOKEN_MARKER: &str = "${Token[";
pub const BEGIN_LIST_TOKEN_MARKER: &str = "#{Token[";
pub const END_TOKEN_MARKER: &str = "]}";
pub const VALID_KEY_CHARS: &str = "a-zA-Z0-9:._-";

static SCALAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile(BEGIN_STRING_TOKEN_MARKER));
static LIST_PATTERN: LazyLock<Regex> = LazyLock::new(|| compile(BEGIN_LIST_TOKEN_MARKER));

fn compile(begin_marker: &str) -> Regex {
    let pattern = format!(
        "{}([{VALID_KEY_CHARS}]+){}",
        regex::escape(begin_marker),
        regex::escape(END_TOKEN_MARKER)
    );
    Regex::new(&pattern).expect("token marker pattern must compile")
}

/// Whether `text` may be used as (part of) a marker key
pub fn is_valid_key(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '-'))
}

/// The two marker shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// embedded in a string
    Scalar,
    /// single element of a list
    List,
}

impl MarkerKind {
    pub fn begin_marker(self) -> &'static str {
        match self {
            MarkerKind::Scalar => BEGIN_STRING_TOKEN_MARKER,
            MarkerKind::List => BEGIN_LIST_TOKEN_MARKER,
        }
    }

    pub fn encode(self, key: &str) -> String {
        format!("{}{key}{END_TOKEN_MARKER}", self.begin_marker())
    }

    fn pattern(self) -> &'static Regex {
        match self {
            MarkerKind::Scalar => &SCALAR_PATTERN,
            MarkerKind::List => &LIST_PATTERN,
        }
    }
}

/// A string that may contain markers of one [MarkerKind]
#[derive(derive_new::new, Debug, Clone, Copy)]
pub struct TokenString<'a> {
    text: &'a str,
    kind: MarkerKind,
}

impl<'a> TokenString<'a> {
    /// Indicates if this string contains any marker
    pub fn test(&self) -> bool {
        self.kind.pattern().is_match(self.text)
    }

    /// Split on markers, substituting each marker with the deferred value `lookup` returns for its key
    ///
    /// Text between markers (and before the first/after the last) becomes literal fragments. Order is kept.
    #[tracing::instrument(level = "trace", skip_all, fields(text = self.text))]
    pub fn split<F>(&self, mut lookup: F) -> Result<Fragments, ErrorKind>
    where
        F: FnMut(&str) -> Result<Deferred, ErrorKind>,
    {
        let mut fragments = Fragments::default();
        let mut rest = 0;

        for captures in self.kind.pattern().captures_iter(self.text) {
            let (Some(marker), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            if marker.start() > rest {
                fragments.push_literal(&self.text[rest..marker.start()]);
            }

            fragments.push_deferred(lookup(key.as_str())?);
            rest = marker.end();
        }

        if rest < self.text.len() {
            fragments.push_literal(&self.text[rest..]);
        }

        tracing::trace!(count = fragments.len(), "split into fragments");
        Ok(fragments)
    }
}
