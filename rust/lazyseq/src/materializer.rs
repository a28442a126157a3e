//! The materializer contract implemented by every node of a lazy sequence graph.
//!
//! A materializer is a sequence that may not be fully computed yet. It answers
//! indexed queries ([`Materializer::get`], [`Materializer::can_produce`]) and
//! sequential traversal ([`Materializer::cursor`]) by doing only the work needed for
//! the query at hand, and memoizes that work so it is never repeated.
//!
//! Nodes are composed into a directed acyclic graph through [`SharedMaterializer`]
//! handles. An upstream node may be shared by any number of downstream nodes; the
//! observable sequence of every node is fixed at construction time.

use std::{ops::Deref, sync::Arc};

use lazyseq_common::{Error, Result};

use crate::cursor::Cursor;

/// Values that can flow through a materializer graph.
///
/// Elements are handed out by value, so they must be cheap enough to clone; wrap
/// large payloads in an `Arc`.
pub trait Element: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Element for T {}

/// The native access mode of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// List-like: any index can be computed directly, and the size is usually known
    /// up front.
    Indexed,
    /// Collection-like: elements only become known by draining a sequential source in
    /// order. Indexed access is served from a growing buffer, and no size hint is
    /// reported until the source is exhausted.
    Sequential,
}

/// A lazily computed, memoizing sequence of `E`.
///
/// Every operation may trigger computation and therefore returns a `Result`, except
/// [`known_size`](Materializer::known_size) and [`flavor`](Materializer::flavor), which
/// are always cheap.
///
/// Failures are classified by [`lazyseq_common::ErrorKind`]: `get` past the end yields
/// `OutOfRange`, failures captured from user functions or upstream nodes are replayed
/// verbatim on every later call.
pub trait Materializer<E: Element>: Send + Sync {
    /// Returns the native access mode of the node.
    fn flavor(&self) -> Flavor {
        Flavor::Indexed
    }

    /// Returns `true` iff an element exists at `index`.
    ///
    /// May compute (and memoize) the prefix of the sequence up to `index`.
    fn can_produce(&self, index: usize) -> Result<bool>;

    /// Returns the element at `index`, or an out-of-range error if there is none.
    fn get(&self, index: usize) -> Result<E>;

    /// Returns the number of elements, computing the whole sequence if required.
    fn size(&self) -> Result<usize>;

    /// Returns the number of elements if it is known without any computation.
    fn known_size(&self) -> Option<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(!self.can_produce(0)?)
    }

    /// Returns a sequential cursor over the elements.
    ///
    /// Every cursor has its own position; all cursors and indexed queries share the
    /// memoized state of the node.
    fn cursor(&self) -> Cursor<'_, E> {
        Cursor::indexed(self)
    }
}

/// A shared handle to a node of a materializer graph.
pub type SharedMaterializer<E> = Arc<dyn Materializer<E>>;

impl<E, M> Materializer<E> for Arc<M>
where
    E: Element,
    M: Materializer<E> + ?Sized,
{
    fn flavor(&self) -> Flavor {
        self.deref().flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        self.deref().can_produce(index)
    }

    fn get(&self, index: usize) -> Result<E> {
        self.deref().get(index)
    }

    fn size(&self) -> Result<usize> {
        self.deref().size()
    }

    fn known_size(&self) -> Option<usize> {
        self.deref().known_size()
    }

    fn is_empty(&self) -> Result<bool> {
        self.deref().is_empty()
    }

    fn cursor(&self) -> Cursor<'_, E> {
        self.deref().cursor()
    }
}

/// Collects all elements of a materializer into a vector.
pub fn to_vec<E, M>(source: &M) -> Result<Vec<E>>
where
    E: Element,
    M: Materializer<E> + ?Sized,
{
    let mut items = Vec::new();
    items
        .try_reserve_exact(source.known_size().unwrap_or(0))
        .map_err(|_| Error::size_overflow("to_vec"))?;
    for item in source.cursor() {
        items.push(item?);
    }
    Ok(items)
}

/// Returns the element at `index`, translating a missing element into an
/// out-of-range error that reports the size when it is known.
pub(crate) fn get_or_out_of_range<E: Clone>(items: &[E], index: usize) -> Result<E> {
    items
        .get(index)
        .cloned()
        .ok_or_else(|| Error::out_of_range(index, Some(items.len())))
}
