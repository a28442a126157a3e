//! Expanders for filter-like and flat_map-like transforms.
//!
//! Each expander runs inside a [`GrowingNode`](crate::growing::GrowingNode) and sees the
//! upstream elements in order, exactly once.

use std::{collections::HashSet, hash::Hash, marker::PhantomData};

use lazyseq_common::Result;

use crate::{
    growing::{Expand, Step},
    materializer::SharedMaterializer,
};

/// Keeps the elements for which the predicate holds. The predicate also receives the
/// upstream index.
pub(crate) struct Filter<F>(pub F);

impl<E, F> Expand<E, E> for Filter<F>
where
    F: Fn(usize, &E) -> Result<bool> + Send,
{
    fn expand(&mut self, index: usize, item: E, out: &mut Vec<E>) -> Result<Step<E>> {
        if (self.0)(index, &item)? {
            out.push(item);
        }
        Ok(Step::Continue)
    }
}

/// Maps and filters in one pass.
pub(crate) struct FilterMap<F>(pub F);

impl<S, E, F> Expand<S, E> for FilterMap<F>
where
    F: Fn(S) -> Result<Option<E>> + Send,
{
    fn expand(&mut self, _index: usize, item: S, out: &mut Vec<E>) -> Result<Step<E>> {
        out.extend((self.0)(item)?);
        Ok(Step::Continue)
    }
}

/// Yields the longest prefix whose elements satisfy the predicate.
pub(crate) struct TakeWhile<F>(pub F);

impl<E, F> Expand<E, E> for TakeWhile<F>
where
    F: Fn(&E) -> Result<bool> + Send,
{
    fn expand(&mut self, _index: usize, item: E, out: &mut Vec<E>) -> Result<Step<E>> {
        if !(self.0)(&item)? {
            return Ok(Step::Stop);
        }
        out.push(item);
        Ok(Step::Continue)
    }
}

/// Skips the longest prefix whose elements satisfy the predicate.
pub(crate) struct DropWhile<F> {
    pred: F,
    dropping: bool,
}

impl<F> DropWhile<F> {
    pub fn new(pred: F) -> Self {
        DropWhile {
            pred,
            dropping: true,
        }
    }
}

impl<E, F> Expand<E, E> for DropWhile<F>
where
    F: Fn(&E) -> Result<bool> + Send,
{
    fn expand(&mut self, _index: usize, item: E, out: &mut Vec<E>) -> Result<Step<E>> {
        if self.dropping && (self.pred)(&item)? {
            return Ok(Step::Continue);
        }
        self.dropping = false;
        out.push(item);
        Ok(Step::Continue)
    }
}

/// Keeps the first element for each distinct key.
pub(crate) struct DistinctBy<K, F> {
    key: F,
    seen: HashSet<K, ahash::RandomState>,
}

impl<K, F> DistinctBy<K, F> {
    pub fn new(key: F) -> Self {
        DistinctBy {
            key,
            seen: HashSet::default(),
        }
    }
}

impl<E, K, F> Expand<E, E> for DistinctBy<K, F>
where
    K: Eq + Hash + Send,
    F: Fn(&E) -> Result<K> + Send,
{
    fn expand(&mut self, _index: usize, item: E, out: &mut Vec<E>) -> Result<Step<E>> {
        if self.seen.insert((self.key)(&item)?) {
            out.push(item);
        }
        Ok(Step::Continue)
    }
}

/// Groups consecutive elements into chunks of a fixed size; the last chunk may be
/// shorter.
pub(crate) struct Chunked<E> {
    size: usize,
    current: Vec<E>,
}

impl<E> Chunked<E> {
    pub fn new(size: usize) -> Self {
        Chunked {
            size,
            current: Vec::with_capacity(size),
        }
    }
}

impl<E: Send> Expand<E, Vec<E>> for Chunked<E> {
    fn expand(&mut self, _index: usize, item: E, out: &mut Vec<Vec<E>>) -> Result<Step<Vec<E>>> {
        self.current.push(item);
        if self.current.len() == self.size {
            let next = Vec::with_capacity(self.size);
            out.push(std::mem::replace(&mut self.current, next));
        }
        Ok(Step::Continue)
    }

    fn finish(&mut self, out: &mut Vec<Vec<E>>) -> Result<()> {
        if !self.current.is_empty() {
            out.push(std::mem::take(&mut self.current));
        }
        Ok(())
    }
}

/// Running accumulation: emits the accumulator after each upstream element.
pub(crate) struct Scan<A, F> {
    acc: A,
    step: F,
}

impl<A, F> Scan<A, F> {
    pub fn new(initial: A, step: F) -> Self {
        Scan { acc: initial, step }
    }
}

impl<S, A, F> Expand<S, A> for Scan<A, F>
where
    A: Clone + Send,
    F: Fn(&A, S) -> Result<A> + Send,
{
    fn expand(&mut self, _index: usize, item: S, out: &mut Vec<A>) -> Result<Step<A>> {
        self.acc = (self.step)(&self.acc, item)?;
        out.push(self.acc.clone());
        Ok(Step::Continue)
    }
}

/// Replaces every upstream element with the elements of a derived materializer,
/// drained lazily.
pub(crate) struct FlatMap<E, F> {
    expand: F,
    _e: PhantomData<fn() -> E>,
}

impl<E, F> FlatMap<E, F> {
    pub fn new(expand: F) -> Self {
        FlatMap {
            expand,
            _e: PhantomData,
        }
    }
}

impl<S, E, F> Expand<S, E> for FlatMap<E, F>
where
    F: Fn(S) -> Result<SharedMaterializer<E>> + Send,
{
    fn expand(&mut self, _index: usize, item: S, _out: &mut Vec<E>) -> Result<Step<E>> {
        Ok(Step::Expand((self.expand)(item)?))
    }
}
