//! Transforms that need the whole upstream before producing their first element.

use std::{cmp::Ordering, collections::HashMap, hash::Hash, sync::Arc};

use lazyseq_common::Result;

use crate::{
    materializer::{Element, Flavor, Materializer, SharedMaterializer, get_or_out_of_range, to_vec},
    memo::Memo,
};

type Collect<S, E> = Box<dyn Fn(Vec<S>) -> Result<Vec<E>> + Send + Sync>;

/// Collects the upstream once and derives the whole output from it.
pub(crate) struct CollectedNode<S, E> {
    source: SharedMaterializer<S>,
    collect: Collect<S, E>,
    /// The output has as many elements as the upstream, so size queries do not need
    /// the output.
    size_preserving: bool,
    memo: Memo<Arc<[E]>>,
}

impl<S: Element, E: Element> CollectedNode<S, E> {
    pub fn new<F>(
        node: &'static str,
        source: SharedMaterializer<S>,
        size_preserving: bool,
        collect: F,
    ) -> Self
    where
        F: Fn(Vec<S>) -> Result<Vec<E>> + Send + Sync + 'static,
    {
        CollectedNode {
            source,
            collect: Box::new(collect),
            size_preserving,
            memo: Memo::new(node),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> crate::memo::StateKind {
        self.memo.state()
    }

    fn items(&self) -> Result<&Arc<[E]>> {
        self.memo.get_or_compute(|| {
            let input = to_vec(&self.source)?;
            (self.collect)(input).map(Arc::from)
        })
    }
}

impl<S: Element, E: Element> Materializer<E> for CollectedNode<S, E> {
    fn flavor(&self) -> Flavor {
        if self.size_preserving {
            self.source.flavor()
        } else {
            Flavor::Sequential
        }
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        if self.size_preserving {
            self.source.can_produce(index)
        } else {
            Ok(index < self.items()?.len())
        }
    }

    fn get(&self, index: usize) -> Result<E> {
        get_or_out_of_range(self.items()?, index)
    }

    fn size(&self) -> Result<usize> {
        if self.size_preserving {
            self.source.size()
        } else {
            Ok(self.items()?.len())
        }
    }

    fn known_size(&self) -> Option<usize> {
        match self.memo.computed_value() {
            Some(items) => Some(items.len()),
            None if self.size_preserving => self.source.known_size(),
            None => None,
        }
    }
}

/// Stable sort under `compare`.
pub(crate) fn sorted_by<E, F>(source: SharedMaterializer<E>, compare: F) -> CollectedNode<E, E>
where
    E: Element,
    F: Fn(&E, &E) -> Ordering + Send + Sync + 'static,
{
    CollectedNode::new("sorted", source, true, move |mut items| {
        items.sort_by(&compare);
        Ok(items)
    })
}

/// Groups elements by key. Groups are ordered by the first occurrence of their key,
/// and elements keep their relative order within a group.
pub(crate) fn group_by_key<E, K, F>(
    source: SharedMaterializer<E>,
    key: F,
) -> CollectedNode<E, (K, Vec<E>)>
where
    E: Element,
    K: Element + Eq + Hash,
    F: Fn(&E) -> Result<K> + Send + Sync + 'static,
{
    CollectedNode::new("group_by_key", source, false, move |items| {
        let mut slots = HashMap::<K, usize, ahash::RandomState>::default();
        let mut groups: Vec<(K, Vec<E>)> = Vec::new();
        for item in items {
            let k = key(&item)?;
            match slots.get(&k) {
                Some(&slot) => groups[slot].1.push(item),
                None => {
                    slots.insert(k.clone(), groups.len());
                    groups.push((k, vec![item]));
                }
            }
        }
        Ok(groups)
    })
}
