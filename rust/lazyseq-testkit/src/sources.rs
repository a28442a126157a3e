//! Instrumented materializers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use lazyseq::{Error, Materializer, Result};

/// An indexed source over a vector that records every element access.
///
/// Clones share their counters, so a test can keep a clone while a graph owns the
/// source.
#[derive(Clone)]
pub struct CountingSource<E> {
    items: Arc<[E]>,
    gets: Arc<[AtomicUsize]>,
    sizes: Arc<AtomicUsize>,
}

impl<E: lazyseq::Element> CountingSource<E> {
    pub fn new(items: Vec<E>) -> CountingSource<E> {
        let gets = (0..items.len()).map(|_| AtomicUsize::new(0)).collect();
        CountingSource {
            items: items.into(),
            gets,
            sizes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `get` calls for `index`.
    pub fn gets_of(&self, index: usize) -> usize {
        self.gets
            .get(index)
            .map_or(0, |count| count.load(Ordering::SeqCst))
    }

    /// Number of `get` calls across all indices.
    pub fn total_gets(&self) -> usize {
        self.gets.iter().map(|count| count.load(Ordering::SeqCst)).sum()
    }

    /// Number of `size` calls.
    pub fn size_calls(&self) -> usize {
        self.sizes.load(Ordering::SeqCst)
    }
}

impl<E: lazyseq::Element> Materializer<E> for CountingSource<E> {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.items.len())
    }

    fn get(&self, index: usize) -> Result<E> {
        let item = self
            .items
            .get(index)
            .cloned()
            .ok_or_else(|| Error::out_of_range(index, Some(self.items.len())))?;
        self.gets[index].fetch_add(1, Ordering::SeqCst);
        Ok(item)
    }

    fn size(&self) -> Result<usize> {
        self.sizes.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.len())
    }

    fn known_size(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// A source of `0, 1, 2, ...` that fails for every index at or past `fail_at`.
///
/// Its size is unknown: `size` fails, as does `can_produce` for a failing index.
#[derive(Debug, Clone)]
pub struct FailingSource {
    fail_at: usize,
    hits: Arc<AtomicUsize>,
}

impl FailingSource {
    pub fn new(fail_at: usize) -> FailingSource {
        FailingSource {
            fail_at,
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of accesses (`get` or `can_produce`) that reached a failing index.
    pub fn failures(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.fail_at {
            return Ok(());
        }
        self.hits.fetch_add(1, Ordering::SeqCst);
        log::debug!("failing source reached index {index}");
        Err(Error::message(
            "failing_source",
            format!("index {index} is past the failure point {}", self.fail_at),
        ))
    }
}

impl Materializer<usize> for FailingSource {
    fn can_produce(&self, index: usize) -> Result<bool> {
        self.check(index)?;
        Ok(true)
    }

    fn get(&self, index: usize) -> Result<usize> {
        self.check(index)?;
        Ok(index)
    }

    fn size(&self) -> Result<usize> {
        self.check(self.fail_at)?;
        Ok(self.fail_at)
    }

    fn known_size(&self) -> Option<usize> {
        None
    }
}

/// A source that sleeps before answering every `get` and `size`.
#[derive(Debug, Clone)]
pub struct SlowSource {
    len: usize,
    delay: Duration,
}

impl SlowSource {
    pub fn new(len: usize, delay: Duration) -> SlowSource {
        SlowSource { len, delay }
    }
}

impl Materializer<usize> for SlowSource {
    fn can_produce(&self, index: usize) -> Result<bool> {
        Ok(index < self.len)
    }

    fn get(&self, index: usize) -> Result<usize> {
        std::thread::sleep(self.delay);
        if index < self.len {
            Ok(index)
        } else {
            Err(Error::out_of_range(index, Some(self.len)))
        }
    }

    fn size(&self) -> Result<usize> {
        std::thread::sleep(self.delay);
        Ok(self.len)
    }

    fn known_size(&self) -> Option<usize> {
        Some(self.len)
    }
}

/// A source of `usize::MAX` elements, each equal to its index.
#[derive(Debug, Clone, Copy, Default)]
pub struct HugeSource;

impl Materializer<usize> for HugeSource {
    fn can_produce(&self, _index: usize) -> Result<bool> {
        Ok(true)
    }

    fn get(&self, index: usize) -> Result<usize> {
        if index < usize::MAX {
            Ok(index)
        } else {
            Err(Error::out_of_range(index, Some(usize::MAX)))
        }
    }

    fn size(&self) -> Result<usize> {
        Ok(usize::MAX)
    }

    fn known_size(&self) -> Option<usize> {
        Some(usize::MAX)
    }
}
