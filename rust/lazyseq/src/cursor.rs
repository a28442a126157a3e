//! Sequential traversal over materializers.
//!
//! [`Cursor`] is the sequential face of the materializer contract. Nodes whose
//! native mode is indexed get a cursor for free through the indexed bridge
//! ([`Cursor::indexed`]), which walks `can_produce`/`get` one index at a time; the
//! reverse bridge (sequential source served by index) lives in
//! [`crate::growing`].

use std::{marker::PhantomData, ops::Deref};

use lazyseq_common::{Result, try_or_ret_some_err};

use crate::materializer::{Element, Materializer, SharedMaterializer};

/// A sequential iterator over the elements of a materializer.
///
/// Items are `Result<E>`; a failure is yielded once, after which the cursor is
/// exhausted. Exhaustion is reported as `None`, like any other iterator.
pub struct Cursor<'a, E> {
    inner: Box<dyn Iterator<Item = Result<E>> + Send + 'a>,
    peeked: Option<Option<Result<E>>>,
}

/// A cursor that keeps its materializer alive on its own.
pub type OwnedCursor<E> = Cursor<'static, E>;

impl<'a, E: Element> Cursor<'a, E> {
    pub fn new(iter: impl Iterator<Item = Result<E>> + Send + 'a) -> Cursor<'a, E> {
        Cursor {
            inner: Box::new(iter),
            peeked: None,
        }
    }

    /// Creates a cursor over a borrowed materializer that walks it index by index.
    pub fn indexed<M>(source: &'a M) -> Cursor<'a, E>
    where
        M: Materializer<E> + ?Sized,
    {
        Cursor::new(IndexedSteps::new(source))
    }

    /// Creates a cursor over a borrowed slice.
    pub fn from_slice(items: &'a [E]) -> Cursor<'a, E> {
        Cursor::new(items.iter().cloned().map(Ok))
    }

    /// Returns `true` if another element is available.
    ///
    /// Advancing the underlying source may fail; the failure is returned here and is
    /// also yielded by the following call to `next`.
    pub fn has_next(&mut self) -> Result<bool> {
        let inner = &mut self.inner;
        match self.peeked.get_or_insert_with(|| inner.next()) {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(false),
        }
    }
}

impl<E: Element> Cursor<'static, E> {
    /// Creates a cursor that owns a handle to `source`.
    pub fn owned(source: SharedMaterializer<E>) -> OwnedCursor<E> {
        Cursor::new(IndexedSteps::new(source))
    }
}

impl<E> Iterator for Cursor<'_, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.peeked.take() {
            Some(peeked) => peeked,
            None => self.inner.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.peeked {
            Some(None) => (0, Some(0)),
            Some(Some(_)) => {
                let (lower, upper) = self.inner.size_hint();
                (
                    lower.saturating_add(1),
                    upper.and_then(|n| n.checked_add(1)),
                )
            }
            None => self.inner.size_hint(),
        }
    }
}

/// Indexed-to-sequential bridge: yields `source[0]`, `source[1]`, ... until
/// `can_produce` turns false or a query fails.
struct IndexedSteps<S, E> {
    source: S,
    index: usize,
    done: bool,
    _e: PhantomData<fn() -> E>,
}

impl<S, E> IndexedSteps<S, E> {
    fn new(source: S) -> Self {
        IndexedSteps {
            source,
            index: 0,
            done: false,
            _e: PhantomData,
        }
    }
}

impl<S, E> Iterator for IndexedSteps<S, E>
where
    E: Element,
    S: Deref,
    S::Target: Materializer<E>,
{
    type Item = Result<E>;

    fn next(&mut self) -> Option<Result<E>> {
        if self.done {
            return None;
        }
        // Fuse on failure: a failed step is reported once.
        self.done = true;
        if !try_or_ret_some_err!(self.source.can_produce(self.index)) {
            return None;
        }
        let item = try_or_ret_some_err!(self.source.get(self.index));
        self.index += 1;
        self.done = false;
        Some(Ok(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match self.source.known_size() {
            // A failing step may end the walk early.
            Some(size) => (0, Some(size.saturating_sub(self.index))),
            None => (0, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lazyseq_common::Error;

    use super::*;
    use crate::source::VecSource;

    struct BrokenAt(usize);

    impl Materializer<u32> for BrokenAt {
        fn can_produce(&self, index: usize) -> Result<bool> {
            Ok(index < 10)
        }

        fn get(&self, index: usize) -> Result<u32> {
            if index == self.0 {
                Err(Error::message("broken", format!("element {index}")))
            } else {
                Ok(index as u32)
            }
        }

        fn size(&self) -> Result<usize> {
            Ok(10)
        }

        fn known_size(&self) -> Option<usize> {
            Some(10)
        }
    }

    #[test]
    fn test_indexed_cursor() {
        let source = VecSource::new(vec![1, 2, 3]);
        let mut cursor = Cursor::indexed(&source);
        assert_eq!(cursor.size_hint(), (0, Some(3)));
        assert!(cursor.has_next().unwrap());
        assert!(cursor.has_next().unwrap());
        assert_eq!(cursor.next().unwrap().unwrap(), 1);
        let rest: Vec<_> = cursor.map(Result::unwrap).collect();
        assert_eq!(rest, vec![2, 3]);
    }

    #[test]
    fn test_has_next_on_empty() {
        let source = VecSource::<u8>::new(vec![]);
        let mut cursor = Cursor::indexed(&source);
        assert!(!cursor.has_next().unwrap());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_failure_is_yielded_once() {
        let source = BrokenAt(2);
        let mut cursor = Cursor::indexed(&source);
        assert_eq!(cursor.next().unwrap().unwrap(), 0);
        assert_eq!(cursor.next().unwrap().unwrap(), 1);
        assert!(cursor.has_next().is_err());
        assert!(cursor.next().unwrap().is_err());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_owned_cursor_outlives_handle() {
        let cursor = {
            let source: SharedMaterializer<&str> = Arc::new(VecSource::new(vec!["a", "b"]));
            Cursor::owned(source)
        };
        let items: Vec<_> = cursor.map(Result::unwrap).collect();
        assert_eq!(items, vec!["a", "b"]);
    }
}
