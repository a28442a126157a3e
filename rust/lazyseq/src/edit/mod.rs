//! Structural edits: insert, remove, replace and slice, by position, range or predicate.
//!
//! Every edit is a [`splice::SpliceNode`]: an anchor naming the affected upstream
//! elements plus a span that takes their place. Windows over the upstream are
//! [`slice::SliceNode`]s.

pub(crate) mod slice;
pub(crate) mod splice;
