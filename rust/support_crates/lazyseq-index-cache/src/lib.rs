//! A per-index memo table that starts sparse and becomes dense once it fills up.
//!
//! Map-like materializers compute each element independently, and callers may touch
//! only a handful of indices out of a large sequence. Pre-allocating a slot per index
//! is wasteful in that case, while a hash map is wasteful once most indices have been
//! visited. [`IndexCache`] picks the representation up front from the known sequence
//! length and switches from sparse to dense when enough entries have accumulated.
//!
//! The cache is shared between threads. Dense slots are write-once cells read without
//! any lock; sparse entries live behind a reader-writer lock that writers hold only
//! for the insertion itself.

use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{
        OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::RwLock;

/// Thresholds controlling the cache representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    /// A cache whose sequence length is known and at most this many entries is
    /// allocated densely right away.
    pub dense_limit: usize,
    /// A sparse cache is promoted to a dense one once it holds at least
    /// `promotion_ratio * expected_len` entries.
    pub promotion_ratio: f64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            dense_limit: 4096,
            promotion_ratio: 0.5,
        }
    }
}

type SparseMap<V> = HashMap<usize, V, ahash::RandomState>;

/// A sparse-or-dense table of values keyed by sequence index.
///
/// Values are write-once: [`IndexCache::insert`] keeps an already present value and
/// returns it, so two racing computations of the same index always observe a single
/// winner.
///
/// # Examples
///
/// ```
/// use lazyseq_index_cache::{CachePolicy, IndexCache};
///
/// let cache = IndexCache::<u64>::new(Some(10), CachePolicy::default());
/// assert!(cache.is_dense());
/// assert_eq!(cache.insert(3, 30), 30);
/// assert_eq!(cache.insert(3, 31), 30);
/// assert_eq!(cache.get(3), Some(30));
/// assert_eq!(cache.get(4), None);
/// ```
pub struct IndexCache<V> {
    /// Set once, either up front or on promotion; authoritative for its indices
    /// from then on.
    dense: OnceLock<Box<[OnceLock<V>]>>,
    /// Entries not covered by the dense table.
    sparse: RwLock<SparseMap<V>>,
    /// Number of populated indices.
    len: AtomicUsize,
    /// Length of the underlying sequence, when known.
    expected_len: Option<usize>,
    policy: CachePolicy,
}

impl<V: Clone> IndexCache<V> {
    /// Creates an empty cache for a sequence of `expected_len` elements (if known).
    pub fn new(expected_len: Option<usize>, policy: CachePolicy) -> IndexCache<V> {
        let dense = OnceLock::new();
        if let Some(len) = expected_len.filter(|&len| len <= policy.dense_limit) {
            let _ = dense.set(empty_slots(len));
        }
        IndexCache {
            dense,
            sparse: RwLock::new(SparseMap::default()),
            len: AtomicUsize::new(0),
            expected_len,
            policy,
        }
    }

    /// Returns the number of populated indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if no index has been populated yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_dense(&self) -> bool {
        self.dense.get().is_some()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn get(&self, index: usize) -> Option<V> {
        if let Some(value) = self.dense_slot(index).and_then(OnceLock::get) {
            return Some(value.clone());
        }
        let sparse = self.sparse.read();
        // A promotion may have moved the entry while this reader waited for the lock.
        if let Some(slot) = self.dense_slot(index) {
            return slot.get().cloned();
        }
        sparse.get(&index).cloned()
    }

    /// Stores `value` at `index` unless a value is already present there.
    ///
    /// Returns the value that ends up stored at `index`.
    pub fn insert(&self, index: usize, value: V) -> V {
        if let Some(slot) = self.dense_slot(index) {
            return self.insert_dense(slot, value);
        }
        let mut sparse = self.sparse.write();
        if let Some(slot) = self.dense_slot(index) {
            drop(sparse);
            return self.insert_dense(slot, value);
        }
        let stored = match sparse.entry(index) {
            Entry::Occupied(entry) => return entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(value).clone(),
        };
        self.len.fetch_add(1, Ordering::AcqRel);
        self.maybe_promote(&mut sparse);
        stored
    }

    fn dense_slot(&self, index: usize) -> Option<&OnceLock<V>> {
        self.dense.get().and_then(|slots| slots.get(index))
    }

    fn insert_dense(&self, slot: &OnceLock<V>, value: V) -> V {
        let mut inserted = false;
        let stored = slot.get_or_init(|| {
            inserted = true;
            value
        });
        if inserted {
            self.len.fetch_add(1, Ordering::AcqRel);
        }
        stored.clone()
    }

    /// Moves the sparse entries into a dense table once enough of them exist. Runs
    /// with the sparse write lock held.
    fn maybe_promote(&self, sparse: &mut SparseMap<V>) {
        if self.is_dense() {
            return;
        }
        let Some(expected_len) = self.expected_len else {
            return;
        };
        if (self.len() as f64) < self.policy.promotion_ratio * expected_len as f64 {
            return;
        }
        let slots = empty_slots(expected_len);
        let mut rest = SparseMap::default();
        for (index, value) in sparse.drain() {
            match slots.get(index) {
                Some(slot) => {
                    let _ = slot.set(value);
                }
                None => {
                    rest.insert(index, value);
                }
            }
        }
        let _ = self.dense.set(slots);
        *sparse = rest;
    }
}

impl<V> std::fmt::Debug for IndexCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("dense", &self.dense.get().is_some())
            .field("len", &self.len.load(Ordering::Acquire))
            .field("expected_len", &self.expected_len)
            .finish_non_exhaustive()
    }
}

fn empty_slots<V>(len: usize) -> Box<[OnceLock<V>]> {
    (0..len).map(|_| OnceLock::new()).collect()
}
