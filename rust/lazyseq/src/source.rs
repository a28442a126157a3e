//! Leaf nodes: adapters that expose a backing sequence through the materializer
//! contract.

use std::sync::Arc;

use lazyseq_common::{Error, Result};

use crate::{
    cursor::Cursor,
    growing::{GrowingNode, Identity, IterPull},
    materializer::{Element, Flavor, Materializer, get_or_out_of_range},
    memo::{Memo, StateKind},
};

/// A fully materialized sequence backed by a shared slice.
pub struct VecSource<E> {
    items: Arc<[E]>,
}

impl<E: Element> VecSource<E> {
    pub fn new(items: Vec<E>) -> VecSource<E> {
        VecSource {
            items: items.into(),
        }
    }

    pub fn from_slice(items: &[E]) -> VecSource<E> {
        VecSource {
            items: items.into(),
        }
    }

    pub fn from_shared(items: Arc<[E]>) -> VecSource<E> {
        VecSource { items }
    }

    pub fn empty() -> VecSource<E> {
        VecSource::new(Vec::new())
    }

    pub fn once(item: E) -> VecSource<E> {
        VecSource::new(vec![item])
    }
}

impl<E: Element> Materializer<E> for VecSource<E> {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.items.len())
    }

    fn get(&self, index: usize) -> Result<E> {
        get_or_out_of_range(&self.items, index)
    }

    fn size(&self) -> Result<usize> {
        Ok(self.items.len())
    }

    fn known_size(&self) -> Option<usize> {
        Some(self.items.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.items.is_empty())
    }

    fn cursor(&self) -> Cursor<'_, E> {
        Cursor::from_slice(&self.items)
    }
}

/// `count` copies of a single element.
pub struct Repeat<E> {
    item: E,
    count: usize,
}

impl<E: Element> Repeat<E> {
    pub fn new(item: E, count: usize) -> Repeat<E> {
        Repeat { item, count }
    }
}

impl<E: Element> Materializer<E> for Repeat<E> {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.count)
    }

    fn get(&self, index: usize) -> Result<E> {
        if index < self.count {
            Ok(self.item.clone())
        } else {
            Err(Error::out_of_range(index, Some(self.count)))
        }
    }

    fn size(&self) -> Result<usize> {
        Ok(self.count)
    }

    fn known_size(&self) -> Option<usize> {
        Some(self.count)
    }
}

/// The integers of a half-open range, in increasing order.
pub struct RangeSource {
    start: i64,
    len: usize,
}

impl RangeSource {
    /// Creates the range `start..end`; an empty range when `end <= start`.
    pub fn new(start: i64, end: i64) -> Result<RangeSource> {
        let len = if end > start {
            usize::try_from(end.abs_diff(start)).map_err(|_| Error::size_overflow("range"))?
        } else {
            0
        };
        Ok(RangeSource { start, len })
    }
}

impl Materializer<i64> for RangeSource {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.len)
    }

    fn get(&self, index: usize) -> Result<i64> {
        if index >= self.len {
            return Err(Error::out_of_range(index, Some(self.len)));
        }
        // In range by construction: start + len <= end.
        Ok(self.start.wrapping_add_unsigned(index as u64))
    }

    fn size(&self) -> Result<usize> {
        Ok(self.len)
    }

    fn known_size(&self) -> Option<usize> {
        Some(self.len)
    }
}

/// A one-pass iterator exposed as a materializer.
///
/// The iterator is consumed at most once and only as far as the deepest query
/// requires; consumed elements are buffered for indexed access and for any number of
/// cursors.
pub struct IterSource<E> {
    node: GrowingNode<E>,
}

impl<E: Element> IterSource<E> {
    pub fn new<I>(iter: I, reserve: usize) -> IterSource<E>
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: Send + 'static,
    {
        IterSource::try_new(iter.into_iter().map(Ok), reserve)
    }

    /// Creates a source over an iterator of fallible items. The first failure is
    /// terminal for the source.
    pub fn try_new<I>(iter: I, reserve: usize) -> IterSource<E>
    where
        I: IntoIterator<Item = Result<E>>,
        I::IntoIter: Send + 'static,
    {
        let pull = IterPull::new(iter.into_iter());
        IterSource {
            node: GrowingNode::new("from_iter", Box::new(pull), Identity, reserve),
        }
    }

    pub fn state(&self) -> StateKind {
        self.node.state()
    }

    /// Number of elements consumed from the iterator so far.
    pub fn consumed(&self) -> Result<usize> {
        self.node.buffered_len()
    }
}

impl<E: Element> Materializer<E> for IterSource<E> {
    fn flavor(&self) -> Flavor {
        self.node.flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        self.node.can_produce(index)
    }

    fn get(&self, index: usize) -> Result<E> {
        self.node.get(index)
    }

    fn size(&self) -> Result<usize> {
        self.node.size()
    }

    fn known_size(&self) -> Option<usize> {
        self.node.known_size()
    }
}

type Supplier<E> = Box<dyn Fn() -> Result<Vec<E>> + Send + Sync>;

/// A collection produced by a supplier on first access.
///
/// Nothing is computed or copied until a query needs data; the supplier then runs
/// once and its result is kept.
pub struct DeferredSource<E> {
    supplier: Supplier<E>,
    memo: Memo<Arc<[E]>>,
}

impl<E: Element> DeferredSource<E> {
    pub fn new<F>(supplier: F) -> DeferredSource<E>
    where
        F: Fn() -> Result<Vec<E>> + Send + Sync + 'static,
    {
        DeferredSource {
            supplier: Box::new(supplier),
            memo: Memo::new("deferred"),
        }
    }

    pub fn state(&self) -> StateKind {
        self.memo.state()
    }

    fn items(&self) -> Result<&Arc<[E]>> {
        self.memo.get_or_compute(|| (self.supplier)().map(Arc::from))
    }
}

impl<E: Element> Materializer<E> for DeferredSource<E> {
    fn flavor(&self) -> Flavor {
        Flavor::Sequential
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.items()?.len())
    }

    fn get(&self, index: usize) -> Result<E> {
        get_or_out_of_range(self.items()?, index)
    }

    fn size(&self) -> Result<usize> {
        Ok(self.items()?.len())
    }

    fn known_size(&self) -> Option<usize> {
        self.memo.computed_value().map(|items| items.len())
    }

    fn cursor(&self) -> Cursor<'_, E> {
        match self.items() {
            Ok(items) => Cursor::from_slice(items),
            Err(e) => Cursor::new(std::iter::once(Err(e))),
        }
    }
}
