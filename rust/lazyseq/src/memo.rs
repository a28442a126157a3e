//! Memoized, write-once computation state shared by transformation nodes.
//!
//! A node that cannot answer queries purely by delegating to its upstreams owns a
//! [`Memo`]. The memo starts out pending; the first query that needs the result runs
//! the computation and stores its outcome as a [`Terminal`] state, either `Computed`
//! or `Faulted`. Terminal states never change again: later queries read them without
//! taking any lock, and a stored failure is handed out as the same [`Error`] value
//! every time, without re-running the computation.
//!
//! ## Exclusion
//!
//! Computations are driven by the calling thread. To keep two callers from driving
//! the same computation at once, each memo has an [`Exclusive`] guard that is entered
//! with a non-blocking attempt. A caller that finds the guard taken gets a
//! concurrent-access error instead of waiting. The guard only protects against
//! overlapping computations; it does not queue or coordinate callers. Re-entering a
//! node from its own computation is rejected the same way.
//!
//! A concurrent-access error is never memoized. It describes the timing of one call,
//! not the sequence, so a computation that fails with it (typically because a shared
//! upstream was busy) leaves the memo pending for the next caller.
//!
//! State transitions:
//! - `Pending` -> `Computed(value)` when the computation succeeds
//! - `Pending` -> `Faulted(error)` when the computation fails, or when an earlier
//!   computation panicked and left the guard poisoned

use std::sync::{Mutex, MutexGuard, OnceLock, TryLockError};

use lazyseq_common::{Error, Result};

/// Coarse view of a memoized state, mostly useful for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Pending,
    Computed,
    Faulted,
}

/// Final outcome of a memoized computation.
#[derive(Debug, Clone)]
pub enum Terminal<T> {
    Computed(T),
    Faulted(Error),
}

impl<T> Terminal<T> {
    pub fn from_result(result: Result<T>) -> Terminal<T> {
        match result {
            Ok(value) => Terminal::Computed(value),
            Err(e) => Terminal::Faulted(e),
        }
    }

    /// Returns the computed value, or a replay of the stored failure.
    pub fn as_result(&self) -> Result<&T> {
        match self {
            Terminal::Computed(value) => Ok(value),
            Terminal::Faulted(e) => Err(e.clone()),
        }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            Terminal::Computed(_) => StateKind::Computed,
            Terminal::Faulted(_) => StateKind::Faulted,
        }
    }
}

/// Non-blocking mutual exclusion for node computations.
///
/// Wraps the mutable part of a node's state. [`Exclusive::enter`] never waits:
/// if another caller is inside, it fails with a concurrent-access error naming the
/// node.
pub struct Exclusive<T> {
    node: &'static str,
    inner: Mutex<T>,
}

impl<T> Exclusive<T> {
    pub fn new(node: &'static str, value: T) -> Exclusive<T> {
        Exclusive {
            node,
            inner: Mutex::new(value),
        }
    }

    pub fn node(&self) -> &'static str {
        self.node
    }

    /// Enters the guarded section, or fails if another caller is inside.
    ///
    /// A panic inside an earlier section may have left the protected state half
    /// updated, so a poisoned guard is never entered again: every later attempt fails
    /// with a poisoned error.
    pub fn enter(&self) -> Result<MutexGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(_)) => Err(Error::poisoned(self.node)),
            Err(TryLockError::WouldBlock) => {
                log::warn!("{}: rejected overlapping computation", self.node);
                Err(Error::concurrent_access(self.node))
            }
        }
    }
}

/// A write-once memo cell: `Pending` until the first computation completes, then
/// `Computed` or `Faulted` forever.
pub struct Memo<T> {
    terminal: OnceLock<Terminal<T>>,
    guard: Exclusive<()>,
}

impl<T> Memo<T> {
    /// Creates a pending memo for the node named `node`.
    pub fn new(node: &'static str) -> Memo<T> {
        Memo {
            terminal: OnceLock::new(),
            guard: Exclusive::new(node, ()),
        }
    }

    /// Creates a memo that is already computed.
    pub fn computed(node: &'static str, value: T) -> Memo<T> {
        let memo = Memo::new(node);
        let _ = memo.terminal.set(Terminal::Computed(value));
        memo
    }

    pub fn state(&self) -> StateKind {
        self.terminal
            .get()
            .map_or(StateKind::Pending, Terminal::kind)
    }

    /// Returns the terminal outcome if there is one, without computing anything.
    pub fn peek(&self) -> Option<Result<&T>> {
        self.terminal.get().map(Terminal::as_result)
    }

    /// Returns the computed value if the memo is in the `Computed` state.
    pub fn computed_value(&self) -> Option<&T> {
        match self.terminal.get() {
            Some(Terminal::Computed(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the memoized outcome, running `compute` if the memo is still pending.
    ///
    /// Fails with a concurrent-access error if another caller is running the
    /// computation at the same time and has not finished yet. Such a failure, whether
    /// raised here or returned by `compute`, leaves the memo pending.
    pub fn get_or_compute<F>(&self, compute: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(terminal) = self.terminal.get() {
            return terminal.as_result();
        }

        let _guard = match self.guard.enter() {
            Ok(guard) => guard,
            // The other caller may have finished in the meantime.
            Err(e) if e.is_concurrent_access() => {
                return match self.terminal.get() {
                    Some(terminal) => terminal.as_result(),
                    None => Err(e),
                };
            }
            Err(e) => {
                log::debug!("{}: guard poisoned", self.guard.node());
                return self.terminal.get_or_init(|| Terminal::Faulted(e)).as_result();
            }
        };

        let result = compute();
        match &result {
            Ok(_) => log::trace!("{}: computed", self.guard.node()),
            Err(e) if e.is_concurrent_access() => {
                log::debug!("{}: computation deferred: {e}", self.guard.node());
                return Err(e.clone());
            }
            Err(e) => log::debug!("{}: computation faulted: {e}", self.guard.node()),
        }
        // Only the guard holder initializes the terminal.
        self.terminal
            .get_or_init(|| Terminal::from_result(result))
            .as_result()
    }
}

impl<T> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("node", &self.guard.node())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Barrier,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_memo_send_sync() {
        fn is_send_sync<T: Send + Sync>() {}
        is_send_sync::<Memo<Vec<u8>>>();
        is_send_sync::<Exclusive<Vec<u8>>>();
    }

    #[test]
    fn test_computes_once() {
        let calls = AtomicUsize::new(0);
        let memo = Memo::<u64>::new("test");
        assert_eq!(memo.state(), StateKind::Pending);
        assert!(memo.peek().is_none());

        for _ in 0..3 {
            let value = memo
                .get_or_compute(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.state(), StateKind::Computed);
        assert_eq!(memo.computed_value(), Some(&42));
    }

    #[test]
    fn test_fault_is_replayed() {
        let calls = AtomicUsize::new(0);
        let memo = Memo::<u64>::new("test");
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::message("test", "boom"))
        };
        let first = memo.get_or_compute(compute).unwrap_err();
        let second = memo.get_or_compute(|| Ok(1)).unwrap_err();
        assert!(first.same_as(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.state(), StateKind::Faulted);
        assert!(memo.computed_value().is_none());
    }

    #[test]
    fn test_reentrant_compute_is_rejected() {
        let memo = Memo::<u64>::new("reentrant");
        let err = memo
            .get_or_compute(|| memo.get_or_compute(|| Ok(1)).map(|v| *v + 1))
            .unwrap_err();
        assert!(err.is_concurrent_access());
        // The rejection is not memoized.
        assert_eq!(memo.state(), StateKind::Pending);
        assert_eq!(*memo.get_or_compute(|| Ok(5)).unwrap(), 5);
    }

    #[test]
    fn test_busy_dependency_is_retried() {
        let memo = Memo::<u64>::new("downstream");
        let busy = memo
            .get_or_compute(|| Err(Error::concurrent_access("upstream")))
            .unwrap_err();
        assert!(busy.is_concurrent_access());
        assert_eq!(memo.state(), StateKind::Pending);
        assert_eq!(*memo.get_or_compute(|| Ok(9)).unwrap(), 9);
        assert_eq!(memo.state(), StateKind::Computed);
    }

    #[test]
    fn test_panic_faults_memo() {
        let memo = Memo::<u64>::new("panicky");
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            memo.get_or_compute(|| panic!("compute panicked"))
                .map(|v| *v)
        }));
        assert!(outcome.is_err());
        let first = memo.get_or_compute(|| Ok(1)).unwrap_err();
        assert!(first.is_poisoned());
        assert_eq!(memo.state(), StateKind::Faulted);
        assert!(memo.get_or_compute(|| Ok(2)).unwrap_err().same_as(&first));
    }

    #[test]
    fn test_concurrent_compute() {
        let memo = Arc::new(Memo::<u64>::new("slow"));
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let memo = memo.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    memo.get_or_compute(|| {
                        std::thread::sleep(Duration::from_millis(200));
                        Ok(7)
                    })
                    .map(|v| *v)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert!(ok >= 1);
        for result in results {
            match result {
                Ok(v) => assert_eq!(v, 7),
                Err(e) => assert!(e.is_concurrent_access()),
            }
        }
        assert_eq!(memo.computed_value(), Some(&7));
    }

    #[test]
    fn test_already_computed() {
        let memo = Memo::computed("ready", "x");
        assert_eq!(memo.state(), StateKind::Computed);
        assert_eq!(*memo.get_or_compute(|| Ok("y")).unwrap(), "x");
    }

    #[test]
    fn test_exclusive_rejects_overlap() {
        let guarded = Exclusive::new("buffer", vec![1]);
        let mut first = guarded.enter().unwrap();
        first.push(2);
        assert!(guarded.enter().unwrap_err().is_concurrent_access());
        drop(first);
        assert_eq!(*guarded.enter().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_exclusive_poisoned_by_panic() {
        let guarded = Exclusive::new("buffer", vec![1]);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut inside = guarded.enter().unwrap();
            inside.push(2);
            panic!("half-way update");
        }));
        assert!(outcome.is_err());
        assert!(guarded.enter().unwrap_err().is_poisoned());
    }
}
