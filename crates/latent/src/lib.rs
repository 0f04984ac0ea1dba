//! # latent - deferred values for declarative documents
//!
//! ## Introduction for developers
//!
//! Read this to understand how `latent` works internally.
//!
//! ### The problem
//!
//! A deployment document is assembled long before it is deployed. Some of its values only exist once the target
//! system has created the resources: identifiers, generated names, addresses. Authors still want to use them like
//! any other value: put them into properties, build strings out of them, pass them around.
//!
//! ### Deferred values
//!
//! A [deferred::Deferred] stands for such a value. It wraps either a literal or a function of the
//! [context::Context] that is called when the document is resolved.
//!
//! ```
//! use latent::{deferred::Deferred, value::Value};
//!
//! let vpc_id = Deferred::hinted("VpcId", |context| {
//!     context.get_str("vpc").map(Value::from).into()
//! })
//! .unwrap();
//! # let _ = vpc_id;
//! ```
//!
//! ### Markers
//!
//! Deferred values can be placed anywhere in a [value::Value] tree. When text is needed instead, formatting a
//! deferred value produces a marker such as `${Token[VpcId.7]}` ([marker]). The marker's key is registered in a
//! [registry::Registry] and maps back to the deferred value. Markers are plain text, so they survive `format!`,
//! `push_str` and friends.
//!
//! Values that intrinsically are lists can be represented as a single element list holding a list marker
//! (`#{Token[...]}`). Those cannot be combined with anything.
//!
//! ### Resolution
//!
//! see [resolve::resolve]
//!
//! The resolver walks the tree once. Deferred values are evaluated (and their results resolved again, since a
//! producer may return further deferred values). Strings are scanned for markers and split into
//! [fragments::Fragments]: literal text and deferred values, in order. A lone marker resolves to the value itself,
//! keeping its type. Markers mixed with text are folded together with [deferred::Deferred::concat], which hands the
//! parts to a [deferred::Joiner]: by default the parts are concatenated as text, a provider may build its own join
//! expression instead.
//!
//! Undefined values are dropped from arrays and objects, so optional properties simply disappear.
//!
//! ### Failure
//!
//! Resolution is all or nothing. The first problem aborts the pass with a [error::ResolveError] naming the path of
//! the node that failed. Cycles are caught by a depth limit ([resolve::MAX_DEPTH]).
//!
pub mod context;
pub mod deferred;
pub mod error;
pub mod fragments;
pub mod marker;
pub mod registry;
pub mod resolve;
pub mod value;
