//! Aggregates over a sequence, each exposed as a sequence of at most one element.
//!
//! A [`Scalar`] runs its reduction once, on first access, and memoizes the outcome. An
//! aggregate that has no value (the first element of an empty sequence, a search that
//! finds nothing) is the empty sequence.

use std::{cmp::Ordering, sync::Arc};

use lazyseq_common::{Error, Result};

use crate::{
    materializer::{Element, Flavor, Materializer, SharedMaterializer},
    memo::{Memo, StateKind},
};

type Compute<R> = Box<dyn Fn() -> Result<Option<R>> + Send + Sync>;

/// A lazily computed value, viewed as a sequence of size 0 or 1.
pub struct Scalar<R> {
    compute: Compute<R>,
    memo: Memo<Option<R>>,
}

impl<R: Element> Scalar<R> {
    pub fn new<F>(node: &'static str, compute: F) -> Scalar<R>
    where
        F: Fn() -> Result<Option<R>> + Send + Sync + 'static,
    {
        Scalar {
            compute: Box::new(compute),
            memo: Memo::new(node),
        }
    }

    /// Returns the value, computing it on first call.
    pub fn value(&self) -> Result<Option<R>> {
        self.get_value().map(|value| value.cloned())
    }

    pub fn state(&self) -> StateKind {
        self.memo.state()
    }

    fn get_value(&self) -> Result<Option<&R>> {
        self.memo.get_or_compute(|| (self.compute)()).map(Option::as_ref)
    }
}

impl<R: Element> Materializer<R> for Scalar<R> {
    fn flavor(&self) -> Flavor {
        Flavor::Sequential
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index == 0 && self.get_value()?.is_some())
    }

    fn get(&self, index: usize) -> Result<R> {
        match self.get_value()? {
            Some(value) if index == 0 => Ok(value.clone()),
            value => Err(Error::out_of_range(index, Some(value.is_some() as usize))),
        }
    }

    fn size(&self) -> Result<usize> {
        Ok(self.get_value()?.is_some() as usize)
    }

    fn known_size(&self) -> Option<usize> {
        self.memo.computed_value().map(|value| value.is_some() as usize)
    }
}

/// Negation of a boolean scalar. Keeps no state: every query reads the operand.
pub(crate) struct Negated {
    operand: SharedMaterializer<bool>,
}

impl Negated {
    pub fn new(operand: SharedMaterializer<bool>) -> Negated {
        Negated { operand }
    }
}

impl Materializer<bool> for Negated {
    fn flavor(&self) -> Flavor {
        self.operand.flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        self.operand.can_produce(index)
    }

    fn get(&self, index: usize) -> Result<bool> {
        self.operand.get(index).map(|value| !value)
    }

    fn size(&self) -> Result<usize> {
        self.operand.size()
    }

    fn known_size(&self) -> Option<usize> {
        self.operand.known_size()
    }
}

pub(crate) fn fold<E, A, F>(source: SharedMaterializer<E>, initial: A, step: F) -> Scalar<A>
where
    E: Element,
    A: Element,
    F: Fn(A, E) -> Result<A> + Send + Sync + 'static,
{
    Scalar::new("fold", move || {
        let mut acc = initial.clone();
        for item in source.cursor() {
            acc = step(acc, item?)?;
        }
        Ok(Some(acc))
    })
}

pub(crate) fn reduce<E, F>(source: SharedMaterializer<E>, step: F) -> Scalar<E>
where
    E: Element,
    F: Fn(E, E) -> Result<E> + Send + Sync + 'static,
{
    Scalar::new("reduce", move || {
        let mut acc = None;
        for item in source.cursor() {
            let item = item?;
            acc = Some(match acc {
                Some(acc) => step(acc, item)?,
                None => item,
            });
        }
        Ok(acc)
    })
}

/// The greatest element under `compare`; the last one among equals.
pub(crate) fn max_by<E, F>(source: SharedMaterializer<E>, compare: F) -> Scalar<E>
where
    E: Element,
    F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
{
    Scalar::new("max", move || {
        let mut best: Option<E> = None;
        for item in source.cursor() {
            let item = item?;
            let replace = match &best {
                Some(current) => compare(&item, current) != Ordering::Less,
                None => true,
            };
            if replace {
                best = Some(item);
            }
        }
        Ok(best)
    })
}

/// The least element under `compare`; the first one among equals.
pub(crate) fn min_by<E, F>(source: SharedMaterializer<E>, compare: F) -> Scalar<E>
where
    E: Element,
    F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
{
    Scalar::new("min", move || {
        let mut best: Option<E> = None;
        for item in source.cursor() {
            let item = item?;
            let replace = match &best {
                Some(current) => compare(&item, current) == Ordering::Less,
                None => true,
            };
            if replace {
                best = Some(item);
            }
        }
        Ok(best)
    })
}

pub(crate) fn count<E: Element>(source: SharedMaterializer<E>) -> Scalar<usize> {
    Scalar::new("count", move || source.size().map(Some))
}

pub(crate) fn count_where<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<usize>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("count_where", move || {
        let mut count = 0usize;
        for item in source.cursor() {
            if pred(&item?)? {
                count += 1;
            }
        }
        Ok(Some(count))
    })
}

pub(crate) fn first<E: Element>(source: SharedMaterializer<E>) -> Scalar<E> {
    Scalar::new("first", move || {
        if source.can_produce(0)? {
            source.get(0).map(Some)
        } else {
            Ok(None)
        }
    })
}

pub(crate) fn last<E: Element>(source: SharedMaterializer<E>) -> Scalar<E> {
    Scalar::new("last", move || match source.size()? {
        0 => Ok(None),
        size => source.get(size - 1).map(Some),
    })
}

/// Index and value of the first element satisfying `pred`.
fn position_first<E: Element>(
    source: &SharedMaterializer<E>,
    pred: impl Fn(&E) -> Result<bool>,
) -> Result<Option<(usize, E)>> {
    for (index, item) in source.cursor().enumerate() {
        let item = item?;
        if pred(&item)? {
            return Ok(Some((index, item)));
        }
    }
    Ok(None)
}

/// Index and value of the last element satisfying `pred`, scanning backwards.
fn position_last<E: Element>(
    source: &SharedMaterializer<E>,
    pred: impl Fn(&E) -> Result<bool>,
) -> Result<Option<(usize, E)>> {
    for index in (0..source.size()?).rev() {
        let item = source.get(index)?;
        if pred(&item)? {
            return Ok(Some((index, item)));
        }
    }
    Ok(None)
}

pub(crate) fn find_first<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<E>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("find_first", move || {
        Ok(position_first(&source, &pred)?.map(|(_, item)| item))
    })
}

pub(crate) fn find_last<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<E>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("find_last", move || {
        Ok(position_last(&source, &pred)?.map(|(_, item)| item))
    })
}

pub(crate) fn index_where<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<usize>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("index_where", move || {
        Ok(position_first(&source, &pred)?.map(|(index, _)| index))
    })
}

pub(crate) fn last_index_where<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<usize>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("last_index_where", move || {
        Ok(position_last(&source, &pred)?.map(|(index, _)| index))
    })
}

pub(crate) fn any<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<bool>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("any", move || Ok(Some(position_first(&source, &pred)?.is_some())))
}

pub(crate) fn all<E, F>(source: SharedMaterializer<E>, pred: F) -> Scalar<bool>
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Scalar::new("all", move || {
        let counterexample = position_first(&source, |item| Ok(!pred(item)?))?;
        Ok(Some(counterexample.is_none()))
    })
}

pub(crate) fn none<E, F>(source: SharedMaterializer<E>, pred: F) -> Negated
where
    E: Element,
    F: Fn(&E) -> Result<bool> + Send + Sync + 'static,
{
    Negated::new(Arc::new(any(source, pred)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use super::*;
    use crate::{materializer::to_vec, source::VecSource};

    fn source<E: Element>(items: Vec<E>) -> SharedMaterializer<E> {
        Arc::new(VecSource::new(items))
    }

    #[test]
    fn test_scalar_is_sequence() {
        let found = first(source(vec![7, 8]));
        assert_eq!(found.known_size(), None);
        assert_eq!(to_vec(&found).unwrap(), vec![7]);
        assert_eq!(found.known_size(), Some(1));
        assert!(found.get(1).unwrap_err().is_out_of_range());

        let missing = first(source(Vec::<u8>::new()));
        assert_eq!(missing.value().unwrap(), None);
        assert!(missing.is_empty().unwrap());
        assert_eq!(missing.size().unwrap(), 0);
    }

    #[test]
    fn test_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let total = fold(source(vec![1, 2, 3]), 0, move |acc, x| {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(acc + x)
        });
        assert_eq!(total.value().unwrap(), Some(6));
        assert_eq!(total.get(0).unwrap(), 6);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
        assert_eq!(total.state(), StateKind::Computed);
    }

    #[test]
    fn test_reduce_and_extremes() {
        let items = vec![(3, 'a'), (1, 'b'), (3, 'c'), (1, 'd')];
        let by_num = |x: &(i32, char), y: &(i32, char)| x.0.cmp(&y.0);
        assert_eq!(max_by(source(items.clone()), by_num).value().unwrap(), Some((3, 'c')));
        assert_eq!(min_by(source(items.clone()), by_num).value().unwrap(), Some((1, 'b')));
        let sum = reduce(source(vec![1, 2, 3, 4]), |a, b| Ok(a + b));
        assert_eq!(sum.value().unwrap(), Some(10));
        assert_eq!(reduce(source(Vec::<i32>::new()), |a, b| Ok(a + b)).size().unwrap(), 0);
    }

    #[test]
    fn test_counts_and_positions() {
        let items = vec![1, 4, 2, 4, 3];
        assert_eq!(count(source(items.clone())).value().unwrap(), Some(5));
        let even = |x: &i32| Ok(x % 2 == 0);
        assert_eq!(count_where(source(items.clone()), even).value().unwrap(), Some(3));
        assert_eq!(index_where(source(items.clone()), even).value().unwrap(), Some(1));
        assert_eq!(last_index_where(source(items.clone()), even).value().unwrap(), Some(3));
        assert_eq!(find_last(source(items.clone()), even).value().unwrap(), Some(4));
        assert_eq!(last(source(items.clone())).value().unwrap(), Some(3));
        let big = |x: &i32| Ok(*x > 10);
        assert_eq!(find_first(source(items.clone()), big).value().unwrap(), None);
        assert_eq!(index_where(source(items), big).value().unwrap(), None);
    }

    #[test]
    fn test_boolean_aggregates() {
        let items = vec![2, 4, 6];
        let even = |x: &i32| Ok(x % 2 == 0);
        let odd = |x: &i32| Ok(x % 2 == 1);
        assert!(all(source(items.clone()), even).get(0).unwrap());
        assert!(!any(source(items.clone()), odd).get(0).unwrap());
        assert!(none(source(items.clone()), odd).get(0).unwrap());
        assert!(all(source(Vec::<i32>::new()), odd).get(0).unwrap());
        assert_eq!(none(source(items), even).size().unwrap(), 1);
    }

    #[test]
    fn test_failure_replays() {
        let failing = count_where(source(vec![1, 2]), |x: &i32| {
            if *x == 2 {
                Err(Error::message("count_where", "bad element"))
            } else {
                Ok(true)
            }
        });
        let first = failing.value().unwrap_err();
        assert!(failing.size().unwrap_err().same_as(&first));
        assert_eq!(failing.state(), StateKind::Faulted);
        assert_eq!(failing.known_size(), None);
    }
}
