//! Lazy, composable, memoizing sequences.
//!
//! A [`Seq`] is a handle to one node of a graph of materializers. Sources sit at the
//! leaves (vectors, ranges, one-pass iterators, deferred suppliers); every operator
//! adds a node on top of an existing one and returns a new handle, leaving the
//! original untouched. Nothing is computed when a graph is built: work happens only
//! when an element, a size or a cursor is requested, and only as much as that request
//! needs.
//!
//! # Core Concepts
//!
//! ## Materializers
//!
//! The [`Materializer`] trait is the contract every node implements: indexed access
//! through [`get`](Materializer::get) and
//! [`can_produce`](Materializer::can_produce), the total
//! [`size`](Materializer::size), and sequential traversal through a [`Cursor`].
//! Nodes declare a [`Flavor`]. Indexed nodes answer `get(i)` directly; sequential nodes
//! (filters, flat maps, iterator sources) produce their elements in order and buffer
//! them, and never pull further from their upstream than the deepest query so far.
//!
//! ## Memoization
//!
//! Every computed value is computed at most once per node and then reused. Failures
//! are memoized too: a node whose computation failed reports the very same
//! [`Error`] on every later access. A computation that re-enters itself, directly
//! or from another thread, fails with a concurrent-access error instead of
//! deadlocking or silently computing twice. See [`memo`].
//!
//! ## Structural edits
//!
//! Inserts, removals and replacements by position, range or predicate are splices
//! over the upstream. Positions counted from the start never force the upstream
//! size; positions counted from the end (negative `isize`) resolve it once.
//!
//! ## Aggregates
//!
//! Aggregates and searches (`fold`, `max`, `index_of_slice`, ...) are sequences of at
//! most one element, so they compose like any other node; [`Seq::value`] reads them.

pub mod config;
pub mod cursor;
mod edit;
mod growing;
pub mod materializer;
pub mod memo;
pub mod scalar;
mod search;
pub mod seq;
pub mod source;
mod transform;

pub use config::MaterializeConfig;
pub use cursor::{Cursor, OwnedCursor};
pub use lazyseq_common::{Error, ErrorKind, Offset, Result};
pub use materializer::{Element, Flavor, Materializer, SharedMaterializer};
pub use memo::{Memo, StateKind};
pub use scalar::Scalar;
pub use seq::Seq;
pub use source::{DeferredSource, IterSource, RangeSource, Repeat, VecSource};
