//! Element-level transforms.
//!
//! Three families, by how much of the upstream a query needs:
//! - map-like nodes ([`map::MapNode`]) compute each index independently and memoize it
//!   per index;
//! - filter-like nodes ([`expand`]) drain the upstream in order into a growing buffer,
//!   only as far as the deepest query;
//! - collected nodes ([`collected`]) need the whole upstream before producing anything.
//!
//! Reverse and zip ([`derived`]) keep no state and answer every query from their
//! upstreams.

pub(crate) mod collected;
pub(crate) mod derived;
pub(crate) mod expand;
pub(crate) mod map;
