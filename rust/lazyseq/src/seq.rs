//! The fluent handle over materializer graphs.

use std::{cmp::Ordering, hash::Hash, sync::Arc};

use lazyseq_common::{Offset, Result, verify_arg};

use crate::{
    config::MaterializeConfig,
    cursor::{Cursor, OwnedCursor},
    edit::{
        slice::SliceNode,
        splice::{Anchor, Predicate, Span, SpliceNode},
    },
    growing::GrowingNode,
    materializer::{self, Element, Flavor, Materializer, SharedMaterializer},
    scalar, search,
    source::{DeferredSource, IterSource, RangeSource, Repeat, VecSource},
    transform::{
        collected::{self, CollectedNode},
        derived::{ReverseNode, ZipNode},
        expand::{Chunked, DistinctBy, DropWhile, Filter, FilterMap, FlatMap, Scan, TakeWhile},
        map::MapNode,
    },
};

/// A lazily materialized sequence.
///
/// A `Seq` is a cheap handle to one node of a materializer graph. Every operator returns
/// a new handle to a new node and leaves `self` untouched; no work happens until a
/// query (`get`, `size`, a cursor, ...) needs it, and work done for one query is never
/// repeated for another.
///
/// Positions taken as `isize` count from the end when negative: `-1` is the last
/// element.
///
/// # Examples
///
/// ```
/// use lazyseq::{Materializer, Seq};
///
/// let words = Seq::from_vec(vec!["a", "b", "c", "d"]);
/// let edited = words.insert(2, "X").remove_at(-1);
/// assert_eq!(edited.to_vec().unwrap(), vec!["a", "b", "X", "c"]);
/// assert_eq!(edited.get(2).unwrap(), "X");
///
/// let evens = Seq::from_iter(1..).filter(|x| x % 2 == 0).take(3);
/// assert_eq!(evens.to_vec().unwrap(), vec![2, 4, 6]);
/// ```
pub struct Seq<E> {
    inner: SharedMaterializer<E>,
    config: Arc<MaterializeConfig>,
}

impl<E> Clone for Seq<E> {
    fn clone(&self) -> Self {
        Seq {
            inner: self.inner.clone(),
            config: self.config.clone(),
        }
    }
}

impl<E: Element> Seq<E> {
    /// Wraps a shared node, using the default configuration.
    pub fn from_shared(inner: SharedMaterializer<E>) -> Seq<E> {
        Seq {
            inner,
            config: Arc::default(),
        }
    }

    pub fn from_materializer<M: Materializer<E> + 'static>(node: M) -> Seq<E> {
        Seq::from_shared(Arc::new(node))
    }

    pub fn from_vec(items: Vec<E>) -> Seq<E> {
        Seq::from_materializer(VecSource::new(items))
    }

    pub fn from_slice(items: &[E]) -> Seq<E> {
        Seq::from_materializer(VecSource::from_slice(items))
    }

    pub fn empty() -> Seq<E> {
        Seq::from_materializer(VecSource::empty())
    }

    pub fn once(item: E) -> Seq<E> {
        Seq::from_materializer(VecSource::once(item))
    }

    pub fn repeat(item: E, count: usize) -> Seq<E> {
        Seq::from_materializer(Repeat::new(item, count))
    }

    /// A sequence over a one-pass iterator, consumed only as far as queries require.
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(iter: I) -> Seq<E>
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: Send + 'static,
    {
        Seq::try_from_iter(iter.into_iter().map(Ok))
    }

    /// Like [`Seq::from_iter`], over fallible items. The first failure is terminal.
    pub fn try_from_iter<I>(iter: I) -> Seq<E>
    where
        I: IntoIterator<Item = Result<E>>,
        I::IntoIter: Send + 'static,
    {
        Seq::iter_source(iter, Arc::default())
    }

    /// Like [`Seq::from_iter`], under `config`. The source's own buffer is sized by
    /// `config.buffer_reserve`.
    pub fn from_iter_with_config<I>(iter: I, config: MaterializeConfig) -> Result<Seq<E>>
    where
        I: IntoIterator<Item = E>,
        I::IntoIter: Send + 'static,
    {
        Seq::try_from_iter_with_config(iter.into_iter().map(Ok), config)
    }

    pub fn try_from_iter_with_config<I>(iter: I, config: MaterializeConfig) -> Result<Seq<E>>
    where
        I: IntoIterator<Item = Result<E>>,
        I::IntoIter: Send + 'static,
    {
        config.validate()?;
        Ok(Seq::iter_source(iter, Arc::new(config)))
    }

    fn iter_source<I>(iter: I, config: Arc<MaterializeConfig>) -> Seq<E>
    where
        I: IntoIterator<Item = Result<E>>,
        I::IntoIter: Send + 'static,
    {
        Seq {
            inner: Arc::new(IterSource::try_new(iter, config.buffer_reserve)),
            config,
        }
    }

    /// A collection produced by `supplier` on first access.
    pub fn deferred<F>(supplier: F) -> Seq<E>
    where
        F: Fn() -> Result<Vec<E>> + Send + Sync + 'static,
    {
        Seq::from_materializer(DeferredSource::new(supplier))
    }

    /// Replaces the configuration used by the nodes derived from this handle.
    ///
    /// The node behind this handle keeps the settings it was built with; to size the
    /// buffer of an iterator source, pass the configuration to
    /// [`Seq::from_iter_with_config`].
    pub fn with_config(self, config: MaterializeConfig) -> Result<Seq<E>> {
        config.validate()?;
        Ok(Seq {
            inner: self.inner,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &MaterializeConfig {
        &self.config
    }

    pub fn as_shared(&self) -> &SharedMaterializer<E> {
        &self.inner
    }

    pub fn into_shared(self) -> SharedMaterializer<E> {
        self.inner
    }

    /// A cursor that owns a handle to the node, for drivers that outlive `self`.
    pub fn into_cursor(self) -> OwnedCursor<E> {
        Cursor::owned(self.inner)
    }

    pub fn to_vec(&self) -> Result<Vec<E>> {
        materializer::to_vec(&self.inner)
    }

    /// Returns the only element of a sequence of size 0 or 1, such as an aggregate.
    pub fn value(&self) -> Result<Option<E>> {
        if self.inner.can_produce(0)? {
            self.inner.get(0).map(Some)
        } else {
            Ok(None)
        }
    }

    fn derive<R: Element>(&self, node: impl Materializer<R> + 'static) -> Seq<R> {
        Seq {
            inner: Arc::new(node),
            config: self.config.clone(),
        }
    }

    fn grow<R, X>(&self, node: &'static str, expand: X) -> Seq<R>
    where
        R: Element,
        X: crate::growing::Expand<E, R> + 'static,
    {
        let reserve = self.config.buffer_reserve;
        self.derive(GrowingNode::over(node, self.inner.clone(), expand, reserve))
    }

    fn splice(&self, node: &'static str, anchor: Anchor<E>, span: Span<E>) -> Seq<E> {
        self.derive(SpliceNode::new(node, self.inner.clone(), anchor, span))
    }
}

impl Seq<i64> {
    /// The integers `start..end`.
    pub fn range(start: i64, end: i64) -> Result<Seq<i64>> {
        Ok(Seq::from_materializer(RangeSource::new(start, end)?))
    }
}

fn one<E: Element>(item: E) -> Span<E> {
    Span::Items(Arc::new(VecSource::once(item)))
}

fn predicate<E, F>(pred: F) -> Predicate<E>
where
    E: Element,
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    Arc::new(move |item: &E| Ok(pred(item)))
}

fn fallible<E, F>(pred: F) -> impl Fn(&E) -> Result<bool> + Send + Sync + 'static
where
    E: Element,
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    move |item: &E| Ok(pred(item))
}

/// Element-level transforms.
impl<E: Element> Seq<E> {
    pub fn map<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(E) -> R + Send + Sync + 'static,
    {
        self.try_map(move |item| Ok(f(item)))
    }

    /// Maps with a fallible function. A failure affects only the element it was
    /// raised for, and is replayed on every later access to that element.
    pub fn try_map<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(E) -> Result<R> + Send + Sync + 'static,
    {
        self.map_indexed_node(move |_, item| f(item))
    }

    pub fn map_indexed<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(usize, E) -> R + Send + Sync + 'static,
    {
        self.map_indexed_node(move |index, item| Ok(f(index, item)))
    }

    fn map_indexed_node<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(usize, E) -> Result<R> + Send + Sync + 'static,
    {
        let policy = self.config.cache_policy();
        self.derive(MapNode::new(self.inner.clone(), f, policy))
    }

    pub fn filter<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.try_filter(fallible(pred))
    }

    pub fn try_filter<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
    {
        self.grow("filter", Filter(move |_: usize, item: &E| pred(item)))
    }

    /// Filters with a predicate that also receives the upstream index.
    pub fn filter_indexed<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(usize, &E) -> bool + Send + Sync + 'static,
    {
        let pred = move |index: usize, item: &E| -> Result<bool> { Ok(pred(index, item)) };
        self.grow("filter", Filter(pred))
    }

    pub fn filter_map<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(E) -> Option<R> + Send + Sync + 'static,
    {
        let f = move |item: E| -> Result<Option<R>> { Ok(f(item)) };
        self.grow("filter_map", FilterMap(f))
    }

    pub fn flat_map<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(E) -> Seq<R> + Send + Sync + 'static,
    {
        self.try_flat_map(move |item| Ok(f(item)))
    }

    pub fn try_flat_map<R, F>(&self, f: F) -> Seq<R>
    where
        R: Element,
        F: Fn(E) -> Result<Seq<R>> + Send + Sync + 'static,
    {
        self.grow(
            "flat_map",
            FlatMap::new(move |item| f(item).map(Seq::into_shared)),
        )
    }

    pub fn take_while<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.grow("take_while", TakeWhile(fallible(pred)))
    }

    pub fn drop_while<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.grow("drop_while", DropWhile::new(fallible(pred)))
    }

    /// Keeps the first occurrence of each element.
    pub fn distinct(&self) -> Seq<E>
    where
        E: Eq + Hash,
    {
        self.distinct_by_key(E::clone)
    }

    /// Keeps the first element for each distinct key.
    pub fn distinct_by_key<K, F>(&self, key: F) -> Seq<E>
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        let key = move |item: &E| -> Result<K> { Ok(key(item)) };
        self.grow("distinct", DistinctBy::new(key))
    }

    /// Splits the sequence into chunks of `size` elements; the last one may be shorter.
    pub fn chunked(&self, size: usize) -> Result<Seq<Vec<E>>> {
        verify_arg!(size, size > 0);
        Ok(self.grow("chunked", Chunked::new(size)))
    }

    /// Running accumulation: the accumulator after each element.
    pub fn scan<A, F>(&self, initial: A, step: F) -> Seq<A>
    where
        A: Element,
        F: Fn(&A, E) -> A + Send + Sync + 'static,
    {
        let step = move |acc: &A, item: E| -> Result<A> { Ok(step(acc, item)) };
        self.grow("scan", Scan::new(initial, step))
    }

    pub fn reverse(&self) -> Seq<E> {
        self.derive(ReverseNode::new(self.inner.clone()))
    }

    pub fn sorted(&self) -> Seq<E>
    where
        E: Ord,
    {
        self.sorted_by(E::cmp)
    }

    /// Stable sort under `compare`.
    pub fn sorted_by<F>(&self, compare: F) -> Seq<E>
    where
        F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    {
        self.derive(collected::sorted_by(self.inner.clone(), compare))
    }

    pub fn sorted_by_key<K, F>(&self, key: F) -> Seq<E>
    where
        K: Ord,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        self.sorted_by(move |a, b| key(a).cmp(&key(b)))
    }

    /// Groups elements by key, in order of first occurrence of each key.
    pub fn group_by_key<K, F>(&self, key: F) -> Seq<(K, Vec<E>)>
    where
        K: Element + Eq + Hash,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        let node: CollectedNode<E, (K, Vec<E>)> =
            collected::group_by_key(self.inner.clone(), move |item: &E| Ok(key(item)));
        self.derive(node)
    }

    pub fn zip<B: Element>(&self, other: &Seq<B>) -> Seq<(E, B)> {
        self.derive(ZipNode::new(self.inner.clone(), other.inner.clone()))
    }

    pub fn concat(&self, other: &Seq<E>) -> Seq<E> {
        self.append_all(other)
    }
}

/// Structural edits.
impl<E: Element> Seq<E> {
    /// Inserts `item` before position `pos`; `pos` may equal the size.
    pub fn insert(&self, pos: isize, item: E) -> Seq<E> {
        self.splice("insert", Anchor::Position(Offset::from(pos)), one(item))
    }

    pub fn insert_all(&self, pos: isize, items: &Seq<E>) -> Seq<E> {
        let span = Span::Items(items.inner.clone());
        self.splice("insert_all", Anchor::Position(Offset::from(pos)), span)
    }

    pub fn append(&self, item: E) -> Seq<E> {
        self.splice("append", Anchor::End, one(item))
    }

    pub fn append_all(&self, items: &Seq<E>) -> Seq<E> {
        self.splice("append_all", Anchor::End, Span::Items(items.inner.clone()))
    }

    pub fn prepend(&self, item: E) -> Seq<E> {
        self.splice("prepend", Anchor::Position(Offset::FromStart(0)), one(item))
    }

    pub fn prepend_all(&self, items: &Seq<E>) -> Seq<E> {
        let span = Span::Items(items.inner.clone());
        self.splice("prepend_all", Anchor::Position(Offset::FromStart(0)), span)
    }

    /// Removes the element at `pos`, which must exist.
    pub fn remove_at(&self, pos: isize) -> Seq<E> {
        self.splice("remove_at", Anchor::Element(Offset::from(pos)), Span::Empty)
    }

    /// Removes the elements in `[start, end)`. Bounds are clamped to the sequence; an
    /// open end removes everything from `start` on.
    pub fn remove_range(&self, start: isize, end: Option<isize>) -> Seq<E> {
        self.splice("remove_range", range(start, end), Span::Empty)
    }

    pub fn remove_first_where<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let anchor = Anchor::FirstWhere(predicate(pred));
        self.splice("remove_first_where", anchor, Span::Empty)
    }

    pub fn remove_last_where<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let anchor = Anchor::LastWhere(predicate(pred));
        self.splice("remove_last_where", anchor, Span::Empty)
    }

    pub fn replace_at(&self, pos: isize, item: E) -> Seq<E> {
        self.splice("replace_at", Anchor::Element(Offset::from(pos)), one(item))
    }

    pub fn replace_range(&self, start: isize, end: Option<isize>, items: &Seq<E>) -> Seq<E> {
        let span = Span::Items(items.inner.clone());
        self.splice("replace_range", range(start, end), span)
    }

    pub fn replace_first_where<F>(&self, pred: F, item: E) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let anchor = Anchor::FirstWhere(predicate(pred));
        self.splice("replace_first_where", anchor, one(item))
    }

    pub fn replace_last_where<F>(&self, pred: F, item: E) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let anchor = Anchor::LastWhere(predicate(pred));
        self.splice("replace_last_where", anchor, one(item))
    }

    pub fn map_first_where<P, F>(&self, pred: P, f: F) -> Seq<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(E) -> E + Send + Sync + 'static,
    {
        let anchor = Anchor::FirstWhere(predicate(pred));
        self.splice("map_first_where", anchor, derived_one(f))
    }

    pub fn map_last_where<P, F>(&self, pred: P, f: F) -> Seq<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(E) -> E + Send + Sync + 'static,
    {
        let anchor = Anchor::LastWhere(predicate(pred));
        self.splice("map_last_where", anchor, derived_one(f))
    }

    pub fn flat_map_first_where<P, F>(&self, pred: P, f: F) -> Seq<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(E) -> Seq<E> + Send + Sync + 'static,
    {
        let anchor = Anchor::FirstWhere(predicate(pred));
        self.splice("flat_map_first_where", anchor, derived_many(f))
    }

    pub fn flat_map_last_where<P, F>(&self, pred: P, f: F) -> Seq<E>
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(E) -> Seq<E> + Send + Sync + 'static,
    {
        let anchor = Anchor::LastWhere(predicate(pred));
        self.splice("flat_map_last_where", anchor, derived_many(f))
    }

    /// The window `[start, end)`, clamped to the sequence. An open end extends to the
    /// end of the sequence.
    pub fn slice(&self, start: isize, end: Option<isize>) -> Seq<E> {
        self.window(Offset::from(start), end.map(Offset::from))
    }

    pub fn take(&self, n: usize) -> Seq<E> {
        self.window(Offset::FromStart(0), Some(Offset::FromStart(n)))
    }

    pub fn skip(&self, n: usize) -> Seq<E> {
        self.window(Offset::FromStart(n), None)
    }

    pub fn take_last(&self, n: usize) -> Seq<E> {
        self.window(Offset::FromEnd(n), None)
    }

    pub fn skip_last(&self, n: usize) -> Seq<E> {
        self.window(Offset::FromStart(0), Some(Offset::FromEnd(n)))
    }

    fn window(&self, start: Offset, end: Option<Offset>) -> Seq<E> {
        self.derive(SliceNode::new(self.inner.clone(), start, end))
    }
}

fn range<E>(start: isize, end: Option<isize>) -> Anchor<E> {
    Anchor::Range {
        start: Offset::from(start),
        end: end.map(Offset::from),
    }
}

fn derived_one<E, F>(f: F) -> Span<E>
where
    E: Element,
    F: Fn(E) -> E + Send + Sync + 'static,
{
    Span::Derived(Arc::new(move |item: E| -> Result<SharedMaterializer<E>> {
        let mapped: SharedMaterializer<E> = Arc::new(VecSource::once(f(item)));
        Ok(mapped)
    }))
}

fn derived_many<E, F>(f: F) -> Span<E>
where
    E: Element,
    F: Fn(E) -> Seq<E> + Send + Sync + 'static,
{
    Span::Derived(Arc::new(move |item: E| -> Result<SharedMaterializer<E>> {
        Ok(f(item).into_shared())
    }))
}

/// Sub-sequence search. The results are sequences of at most one element; see
/// [`Seq::value`].
impl<E: Element> Seq<E> {
    /// Start of the first occurrence of `pattern`.
    pub fn index_of_slice(&self, pattern: &Seq<E>) -> Seq<usize>
    where
        E: PartialEq,
    {
        self.index_of_slice_by(pattern, E::eq)
    }

    pub fn index_of_slice_by<F>(&self, pattern: &Seq<E>, eq: F) -> Seq<usize>
    where
        F: Fn(&E, &E) -> bool + Send + Sync + 'static,
    {
        let pattern = pattern.inner.clone();
        self.derive(search::index_of_slice_by(self.inner.clone(), pattern, eq))
    }

    /// Start of the last occurrence of `pattern`.
    pub fn last_index_of_slice(&self, pattern: &Seq<E>) -> Seq<usize>
    where
        E: PartialEq,
    {
        self.last_index_of_slice_by(pattern, E::eq)
    }

    pub fn last_index_of_slice_by<F>(&self, pattern: &Seq<E>, eq: F) -> Seq<usize>
    where
        F: Fn(&E, &E) -> bool + Send + Sync + 'static,
    {
        let pattern = pattern.inner.clone();
        self.derive(search::last_index_of_slice_by(self.inner.clone(), pattern, eq))
    }

    pub fn includes_slice(&self, pattern: &Seq<E>) -> Seq<bool>
    where
        E: PartialEq,
    {
        self.includes_slice_by(pattern, E::eq)
    }

    pub fn includes_slice_by<F>(&self, pattern: &Seq<E>, eq: F) -> Seq<bool>
    where
        F: Fn(&E, &E) -> bool + Send + Sync + 'static,
    {
        let pattern = pattern.inner.clone();
        self.derive(search::includes_slice_by(self.inner.clone(), pattern, eq))
    }

    pub fn starts_with(&self, prefix: &Seq<E>) -> Seq<bool>
    where
        E: PartialEq,
    {
        self.starts_with_by(prefix, E::eq)
    }

    pub fn starts_with_by<F>(&self, prefix: &Seq<E>, eq: F) -> Seq<bool>
    where
        F: Fn(&E, &E) -> bool + Send + Sync + 'static,
    {
        let prefix = prefix.inner.clone();
        self.derive(search::starts_with_by(self.inner.clone(), prefix, eq))
    }

    pub fn ends_with(&self, suffix: &Seq<E>) -> Seq<bool>
    where
        E: PartialEq,
    {
        self.ends_with_by(suffix, E::eq)
    }

    pub fn ends_with_by<F>(&self, suffix: &Seq<E>, eq: F) -> Seq<bool>
    where
        F: Fn(&E, &E) -> bool + Send + Sync + 'static,
    {
        let suffix = suffix.inner.clone();
        self.derive(search::ends_with_by(self.inner.clone(), suffix, eq))
    }
}

/// Aggregates. Each result is a sequence of at most one element, computed once on
/// first access; see [`Seq::value`].
impl<E: Element> Seq<E> {
    pub fn fold<A, F>(&self, initial: A, step: F) -> Seq<A>
    where
        A: Element,
        F: Fn(A, E) -> A + Send + Sync + 'static,
    {
        self.try_fold(initial, move |acc, item| Ok(step(acc, item)))
    }

    pub fn try_fold<A, F>(&self, initial: A, step: F) -> Seq<A>
    where
        A: Element,
        F: Fn(A, E) -> Result<A> + Send + Sync + 'static,
    {
        self.derive(scalar::fold(self.inner.clone(), initial, step))
    }

    /// Folds the elements pairwise; empty for an empty sequence.
    pub fn reduce<F>(&self, step: F) -> Seq<E>
    where
        F: Fn(E, E) -> E + Send + Sync + 'static,
    {
        let combine = move |acc: E, item: E| -> Result<E> { Ok(step(acc, item)) };
        self.derive(scalar::reduce(self.inner.clone(), combine))
    }

    /// The greatest element; the last one among equals.
    pub fn max(&self) -> Seq<E>
    where
        E: Ord,
    {
        self.max_by(E::cmp)
    }

    /// The least element; the first one among equals.
    pub fn min(&self) -> Seq<E>
    where
        E: Ord,
    {
        self.min_by(E::cmp)
    }

    pub fn max_by<F>(&self, compare: F) -> Seq<E>
    where
        F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    {
        self.derive(scalar::max_by(self.inner.clone(), compare))
    }

    pub fn min_by<F>(&self, compare: F) -> Seq<E>
    where
        F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    {
        self.derive(scalar::min_by(self.inner.clone(), compare))
    }

    pub fn max_by_key<K, F>(&self, key: F) -> Seq<E>
    where
        K: Ord,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        self.max_by(move |a, b| key(a).cmp(&key(b)))
    }

    pub fn min_by_key<K, F>(&self, key: F) -> Seq<E>
    where
        K: Ord,
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        self.min_by(move |a, b| key(a).cmp(&key(b)))
    }

    pub fn count(&self) -> Seq<usize> {
        self.derive(scalar::count(self.inner.clone()))
    }

    pub fn count_where<F>(&self, pred: F) -> Seq<usize>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::count_where(self.inner.clone(), fallible(pred)))
    }

    pub fn first(&self) -> Seq<E> {
        self.derive(scalar::first(self.inner.clone()))
    }

    pub fn last(&self) -> Seq<E> {
        self.derive(scalar::last(self.inner.clone()))
    }

    pub fn find_first<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::find_first(self.inner.clone(), fallible(pred)))
    }

    pub fn find_last<F>(&self, pred: F) -> Seq<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::find_last(self.inner.clone(), fallible(pred)))
    }

    pub fn all<F>(&self, pred: F) -> Seq<bool>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::all(self.inner.clone(), fallible(pred)))
    }

    pub fn any<F>(&self, pred: F) -> Seq<bool>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::any(self.inner.clone(), fallible(pred)))
    }

    pub fn none<F>(&self, pred: F) -> Seq<bool>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::none(self.inner.clone(), fallible(pred)))
    }

    pub fn contains(&self, item: E) -> Seq<bool>
    where
        E: PartialEq,
    {
        self.any(move |candidate| *candidate == item)
    }

    pub fn index_of(&self, item: E) -> Seq<usize>
    where
        E: PartialEq,
    {
        self.index_where(move |candidate| *candidate == item)
    }

    pub fn last_index_of(&self, item: E) -> Seq<usize>
    where
        E: PartialEq,
    {
        self.last_index_where(move |candidate| *candidate == item)
    }

    pub fn index_where<F>(&self, pred: F) -> Seq<usize>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::index_where(self.inner.clone(), fallible(pred)))
    }

    pub fn last_index_where<F>(&self, pred: F) -> Seq<usize>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.derive(scalar::last_index_where(self.inner.clone(), fallible(pred)))
    }
}

impl<E: Element> Materializer<E> for Seq<E> {
    fn flavor(&self) -> Flavor {
        self.inner.flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        self.inner.can_produce(index)
    }

    fn get(&self, index: usize) -> Result<E> {
        self.inner.get(index)
    }

    fn size(&self) -> Result<usize> {
        self.inner.size()
    }

    fn known_size(&self) -> Option<usize> {
        self.inner.known_size()
    }

    fn is_empty(&self) -> Result<bool> {
        self.inner.is_empty()
    }

    fn cursor(&self) -> Cursor<'_, E> {
        self.inner.cursor()
    }
}

impl<E: Element> std::fmt::Debug for Seq<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seq")
            .field("flavor", &self.inner.flavor())
            .field("known_size", &self.inner.known_size())
            .finish_non_exhaustive()
    }
}

impl<E: Element> From<Vec<E>> for Seq<E> {
    fn from(items: Vec<E>) -> Self {
        Seq::from_vec(items)
    }
}
