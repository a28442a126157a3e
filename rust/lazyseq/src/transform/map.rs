use std::{marker::PhantomData, sync::OnceLock};

use lazyseq_common::{Error, Result};
use lazyseq_index_cache::{CachePolicy, IndexCache};

use crate::{
    materializer::{Element, Flavor, Materializer, SharedMaterializer},
    memo::Exclusive,
};

/// Element-wise transformation with a per-index memo.
///
/// Each output element is computed from the upstream element at the same index, on
/// first access to that index, and cached together with its outcome: a failing index
/// keeps failing with the same error while its neighbors are unaffected. Size queries
/// are answered by the upstream.
///
/// Cached slots are read without entering the node's guard; only the computation of
/// a missing slot is exclusive.
pub(crate) struct MapNode<S, E, F> {
    source: SharedMaterializer<S>,
    map: F,
    policy: CachePolicy,
    /// Created on first computation, sized by the upstream size known at that point.
    cache: OnceLock<IndexCache<Result<E>>>,
    compute: Exclusive<()>,
    _s: PhantomData<fn(S)>,
}

impl<S, E, F> MapNode<S, E, F>
where
    S: Element,
    E: Element,
    F: Fn(usize, S) -> Result<E> + Send + Sync,
{
    pub fn new(source: SharedMaterializer<S>, map: F, policy: CachePolicy) -> Self {
        MapNode {
            source,
            map,
            policy,
            cache: OnceLock::new(),
            compute: Exclusive::new("map", ()),
            _s: PhantomData,
        }
    }

    fn cached(&self, index: usize) -> Option<Result<E>> {
        self.cache.get()?.get(index)
    }

    #[cfg(test)]
    /// Number of indices computed so far.
    pub fn cached_len(&self) -> usize {
        self.cache.get().map_or(0, IndexCache::len)
    }
}

impl<S, E, F> Materializer<E> for MapNode<S, E, F>
where
    S: Element,
    E: Element,
    F: Fn(usize, S) -> Result<E> + Send + Sync,
{
    fn flavor(&self) -> Flavor {
        self.source.flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        self.source.can_produce(index)
    }

    fn get(&self, index: usize) -> Result<E> {
        if let Some(outcome) = self.cached(index) {
            return outcome;
        }
        let _guard = match self.compute.enter() {
            Ok(guard) => guard,
            // The slot may have been filled by the caller holding the guard.
            Err(e) => return self.cached(index).unwrap_or(Err(e)),
        };
        if let Some(outcome) = self.cached(index) {
            return outcome;
        }
        if !self.source.can_produce(index)? {
            return Err(Error::out_of_range(index, self.source.known_size()));
        }
        let outcome = self
            .source
            .get(index)
            .and_then(|item| (self.map)(index, item));
        // A busy dependency is not a property of this element; leave the slot empty.
        if outcome.as_ref().is_err_and(|e| e.is_concurrent_access()) {
            return outcome;
        }
        if let Err(e) = &outcome {
            log::debug!("map: element {index} faulted: {e}");
        }
        self.cache
            .get_or_init(|| IndexCache::new(self.source.known_size(), self.policy))
            .insert(index, outcome)
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

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{materializer::to_vec, source::VecSource};

    fn source(items: Vec<i32>) -> SharedMaterializer<i32> {
        Arc::new(VecSource::new(items))
    }

    #[test]
    fn test_each_index_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let node = MapNode::new(
            source(vec![1, 2, 3]),
            move |_, x| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(x * 10)
            },
            CachePolicy::default(),
        );
        assert_eq!(node.known_size(), Some(3));
        assert_eq!(node.get(1).unwrap(), 20);
        assert_eq!(node.get(1).unwrap(), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(node.cached_len(), 1);
        assert_eq!(to_vec(&node).unwrap(), vec![10, 20, 30]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(node.get(3).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_failure_is_per_index() {
        let node = MapNode::new(
            source(vec![4, 0, 2]),
            |_, x| {
                if x == 0 {
                    Err(Error::message("map", "division by zero"))
                } else {
                    Ok(8 / x)
                }
            },
            CachePolicy::default(),
        );
        let first = node.get(1).unwrap_err();
        assert!(node.get(1).unwrap_err().same_as(&first));
        assert_eq!(node.get(0).unwrap(), 2);
        assert_eq!(node.get(2).unwrap(), 4);
    }

    #[test]
    fn test_index_is_passed() {
        let node = MapNode::new(
            source(vec![5, 5, 5]),
            |i, x| Ok(x + i as i32),
            CachePolicy::default(),
        );
        assert_eq!(to_vec(&node).unwrap(), vec![5, 6, 7]);
    }

    #[test]
    fn test_sparse_access_on_large_source() {
        let large: SharedMaterializer<i32> = Arc::new(crate::source::Repeat::new(1, 1 << 40));
        let node = MapNode::new(large, |i, x| Ok(x + (i % 7) as i32), CachePolicy::default());
        let last = (1usize << 40) - 1;
        assert_eq!(node.get(last).unwrap(), 1 + (last % 7) as i32);
        assert_eq!(node.cached_len(), 1);
        assert_eq!(node.size().unwrap(), 1 << 40);
    }

    #[test]
    fn test_computed_slots_read_concurrently() {
        let node = MapNode::new(
            source((0..64).collect()),
            |_, x| Ok(x * 2),
            CachePolicy::default(),
        );
        assert_eq!(to_vec(&node).unwrap().len(), 64);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        for i in 0..64 {
                            assert_eq!(node.get(i).unwrap(), i as i32 * 2);
                        }
                    }
                });
            }
        });
    }

    #[test]
    fn test_busy_upstream_is_not_cached() {
        let busy = AtomicBool::new(true);
        let node = MapNode::new(
            source(vec![1, 2]),
            move |_, x| {
                if busy.swap(false, Ordering::SeqCst) {
                    Err(Error::concurrent_access("upstream"))
                } else {
                    Ok(x + 100)
                }
            },
            CachePolicy::default(),
        );
        assert!(node.get(0).unwrap_err().is_concurrent_access());
        assert_eq!(node.cached_len(), 0);
        assert_eq!(node.get(0).unwrap(), 101);
        assert_eq!(node.cached_len(), 1);
    }
}
