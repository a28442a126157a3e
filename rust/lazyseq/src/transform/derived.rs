//! Nodes that are pure functions of their upstreams and keep no state of their own.

use lazyseq_common::{Error, Result};

use crate::materializer::{Element, Materializer, SharedMaterializer};

/// The upstream sequence in reverse order.
pub(crate) struct ReverseNode<E> {
    source: SharedMaterializer<E>,
}

impl<E: Element> ReverseNode<E> {
    pub fn new(source: SharedMaterializer<E>) -> Self {
        ReverseNode { source }
    }
}

impl<E: Element> Materializer<E> for ReverseNode<E> {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.source.size()?)
    }

    fn get(&self, index: usize) -> Result<E> {
        let size = self.source.size()?;
        if index >= size {
            return Err(Error::out_of_range(index, Some(size)));
        }
        self.source.get(size - 1 - index)
    }

    fn size(&self) -> Result<usize> {
        self.source.size()
    }

    fn known_size(&self) -> Option<usize> {
        self.source.known_size()
    }

    fn is_empty(&self) -> Result<bool> {
        self.source.is_empty()
    }
}

/// Pairs of elements at equal indices; as long as the shorter upstream.
pub(crate) struct ZipNode<A, B> {
    left: SharedMaterializer<A>,
    right: SharedMaterializer<B>,
}

impl<A: Element, B: Element> ZipNode<A, B> {
    pub fn new(left: SharedMaterializer<A>, right: SharedMaterializer<B>) -> Self {
        ZipNode { left, right }
    }
}

impl<A: Element, B: Element> Materializer<(A, B)> for ZipNode<A, B> {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(self.left.can_produce(index)? && self.right.can_produce(index)?)
    }

    fn get(&self, index: usize) -> Result<(A, B)> {
        if !self.can_produce(index)? {
            return Err(Error::out_of_range(index, self.known_size()));
        }
        Ok((self.left.get(index)?, self.right.get(index)?))
    }

    fn size(&self) -> Result<usize> {
        // Check the smaller known side first so an unbounded partner is not forced.
        match (self.left.known_size(), self.right.known_size()) {
            (Some(l), Some(r)) => Ok(l.min(r)),
            (Some(l), None) => bounded_size(&self.right, l),
            (None, Some(r)) => bounded_size(&self.left, r),
            (None, None) => Ok(self.left.size()?.min(self.right.size()?)),
        }
    }

    fn known_size(&self) -> Option<usize> {
        Some(self.left.known_size()?.min(self.right.known_size()?))
    }
}

/// Returns `min(source.size(), limit)` without computing past `limit`.
fn bounded_size<E: Element>(source: &SharedMaterializer<E>, limit: usize) -> Result<usize> {
    if limit == 0 || source.can_produce(limit - 1)? {
        Ok(limit)
    } else {
        source.size()
    }
}
