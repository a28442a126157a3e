//! Sequential-to-indexed bridge: a buffer that grows on demand.
//!
//! Nodes whose output cannot be computed per index (filter-like transforms, one-pass
//! iterator sources, flat_map) pull from a sequential [`Feed`] and append to a
//! buffer. A query for index `i` pulls only until the buffer holds `i + 1` elements
//! or the feed is exhausted, so an upstream is never consumed further than the
//! deepest query so far. Once the feed is exhausted, the buffer is frozen into the
//! node's terminal state and every later query is served without locking.
//!
//! A failure of the feed is terminal for the whole node: it is stored once and
//! replayed for every later query, including indices that had been buffered before.
//! The exception is a concurrent-access failure (a shared upstream was busy): it is
//! returned to the caller and the buffer stays as it was, so a later query resumes
//! where this one stopped. An element whose expansion was rejected that way is held
//! back and expanded again on the next step.

use std::sync::{Arc, MutexGuard, OnceLock};

use lazyseq_common::{Error, Result};

use crate::{
    materializer::{Element, Flavor, Materializer, SharedMaterializer},
    memo::{Exclusive, StateKind, Terminal},
};

/// Produces the elements of a sequential source one at a time.
pub(crate) trait Pull<S>: Send {
    /// Returns the next element, or `None` once the source is exhausted.
    fn pull(&mut self) -> Result<Option<S>>;
}

/// Pulls the elements of an upstream materializer in index order.
pub(crate) struct UpstreamPull<S> {
    source: SharedMaterializer<S>,
    index: usize,
}

impl<S: Element> UpstreamPull<S> {
    pub fn new(source: SharedMaterializer<S>) -> UpstreamPull<S> {
        UpstreamPull { source, index: 0 }
    }
}

impl<S: Element> Pull<S> for UpstreamPull<S> {
    fn pull(&mut self) -> Result<Option<S>> {
        if !self.source.can_produce(self.index)? {
            return Ok(None);
        }
        let item = self.source.get(self.index)?;
        self.index += 1;
        Ok(Some(item))
    }
}

/// Pulls from a one-pass iterator of fallible items.
pub(crate) struct IterPull<I> {
    iter: I,
}

impl<I> IterPull<I> {
    pub fn new(iter: I) -> IterPull<I> {
        IterPull { iter }
    }
}

impl<S, I> Pull<S> for IterPull<I>
where
    I: Iterator<Item = Result<S>> + Send,
{
    fn pull(&mut self) -> Result<Option<S>> {
        self.iter.next().transpose()
    }
}

/// Outcome of expanding one upstream element.
pub(crate) enum Step<E> {
    /// Keep pulling.
    Continue,
    /// The output ends here; the upstream is not pulled any further.
    Stop,
    /// Drain this materializer into the output before pulling the next element.
    Expand(SharedMaterializer<E>),
}

/// Turns upstream elements of type `S` into output elements of type `E`.
pub(crate) trait Expand<S, E>: Send {
    /// Handles the upstream element at `index`, appending any output to `out`.
    fn expand(&mut self, index: usize, item: S, out: &mut Vec<E>) -> Result<Step<E>>;

    /// Called once the upstream is exhausted or a [`Step::Stop`] was returned.
    fn finish(&mut self, _out: &mut Vec<E>) -> Result<()> {
        Ok(())
    }
}

/// Passes upstream elements through unchanged.
pub(crate) struct Identity;

impl<E> Expand<E, E> for Identity {
    fn expand(&mut self, _index: usize, item: E, out: &mut Vec<E>) -> Result<Step<E>> {
        out.push(item);
        Ok(Step::Continue)
    }
}

/// Type-erased pairing of a [`Pull`] with an [`Expand`].
trait Feed<E>: Send {
    /// Feeds one upstream element. Returns [`Step::Stop`] once nothing more will come.
    fn feed(&mut self, out: &mut Vec<E>) -> Result<Step<E>>;
}

struct Stage<S, X> {
    pull: Box<dyn Pull<S>>,
    expand: X,
    pulled: usize,
    /// Pulled element whose expansion lost a race with another caller.
    held: Option<S>,
}

impl<S, E, X> Feed<E> for Stage<S, X>
where
    S: Element,
    X: Expand<S, E>,
{
    fn feed(&mut self, out: &mut Vec<E>) -> Result<Step<E>> {
        let item = match self.held.take() {
            Some(item) => Some(item),
            None => self.pull.pull()?,
        };
        let step = match item {
            Some(item) => match self.expand.expand(self.pulled, item.clone(), out) {
                Err(e) if e.is_concurrent_access() => {
                    self.held = Some(item);
                    return Err(e);
                }
                step => {
                    self.pulled += 1;
                    step?
                }
            },
            None => Step::Stop,
        };
        if let Step::Stop = step {
            self.expand.finish(out)?;
        }
        Ok(step)
    }
}

/// Mutable part of a growing node; dropped once the node reaches a terminal state.
struct Growth<E> {
    feed: Box<dyn Feed<E>>,
    buffer: Vec<E>,
    /// Inner materializer being drained (flat_map) and the next position in it.
    inner: Option<(SharedMaterializer<E>, usize)>,
}

impl<E: Element> Growth<E> {
    /// Makes one step of progress. Returns `false` once the feed is exhausted.
    fn advance(&mut self) -> Result<bool> {
        if let Some((inner, pos)) = &mut self.inner {
            if inner.can_produce(*pos)? {
                self.buffer.push(inner.get(*pos)?);
                *pos += 1;
            } else {
                self.inner = None;
            }
            return Ok(true);
        }
        match self.feed.feed(&mut self.buffer)? {
            Step::Continue => Ok(true),
            Step::Expand(inner) => {
                self.inner = Some((inner, 0));
                Ok(true)
            }
            Step::Stop => Ok(false),
        }
    }
}

/// A materializer backed by a buffer that is filled from a sequential feed on demand.
pub(crate) struct GrowingNode<E> {
    node: &'static str,
    growth: Exclusive<Option<Growth<E>>>,
    terminal: OnceLock<Terminal<Arc<[E]>>>,
}

impl<E: Element> GrowingNode<E> {
    pub fn new<S, X>(
        node: &'static str,
        pull: Box<dyn Pull<S>>,
        expand: X,
        reserve: usize,
    ) -> Self
    where
        S: Element,
        X: Expand<S, E> + 'static,
    {
        let mut growth = Growth {
            feed: Box::new(Stage {
                pull,
                expand,
                pulled: 0,
                held: None,
            }),
            buffer: Vec::new(),
            inner: None,
        };
        // Best effort: an oversized reserve is ignored rather than aborting.
        let _ = growth.buffer.try_reserve(reserve);
        GrowingNode {
            node,
            growth: Exclusive::new(node, Some(growth)),
            terminal: OnceLock::new(),
        }
    }

    /// Creates a node that expands the elements of an upstream materializer.
    pub fn over<S, X>(
        node: &'static str,
        source: SharedMaterializer<S>,
        expand: X,
        reserve: usize,
    ) -> Self
    where
        S: Element,
        X: Expand<S, E> + 'static,
    {
        GrowingNode::new(node, Box::new(UpstreamPull::new(source)), expand, reserve)
    }

    pub fn state(&self) -> StateKind {
        self.terminal
            .get()
            .map_or(StateKind::Pending, Terminal::kind)
    }

    /// Number of elements buffered so far, without pulling anything.
    pub fn buffered_len(&self) -> Result<usize> {
        match self.terminal.get() {
            Some(terminal) => terminal.as_result().map(|items| items.len()),
            None => {
                let growth = self.enter()?;
                Ok(growth.as_ref().map_or(0, |g| g.buffer.len()))
            }
        }
    }

    /// Enters the growth state. A poisoned guard faults the node for good.
    fn enter(&self) -> Result<MutexGuard<'_, Option<Growth<E>>>> {
        let e = match self.growth.enter() {
            Ok(slot) => return Ok(slot),
            Err(e) => e,
        };
        if e.is_poisoned() {
            log::debug!("{}: growth abandoned after a panic", self.node);
            let _ = self.terminal.set(Terminal::Faulted(e.clone()));
        }
        Err(e)
    }

    /// Fills the buffer until it holds more than `want` elements (or until the feed is
    /// exhausted, when `want` is `None`) and passes the buffered prefix to `read`.
    fn with_buffer<R>(&self, want: Option<usize>, read: impl FnOnce(&[E]) -> R) -> Result<R> {
        if let Some(terminal) = self.terminal.get() {
            return terminal.as_result().map(|items| read(items));
        }

        let mut slot = match self.enter() {
            Ok(slot) => slot,
            Err(e) => {
                return match self.terminal.get() {
                    Some(terminal) => terminal.as_result().map(|items| read(items)),
                    None => Err(e),
                };
            }
        };
        let Some(growth) = slot.as_mut() else {
            // Terminal state was published by the caller that cleared the slot.
            return match self.terminal.get() {
                Some(terminal) => terminal.as_result().map(|items| read(items)),
                None => Err(Error::invalid_operation(self.node)),
            };
        };

        loop {
            if want.is_some_and(|w| w < growth.buffer.len()) {
                return Ok(read(&growth.buffer));
            }
            match growth.advance() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.is_concurrent_access() => {
                    log::debug!(
                        "{}: paused after {} elements: {e}",
                        self.node,
                        growth.buffer.len()
                    );
                    return Err(e);
                }
                Err(e) => {
                    log::debug!(
                        "{}: faulted after {} elements: {e}",
                        self.node,
                        growth.buffer.len()
                    );
                    *slot = None;
                    return self
                        .terminal
                        .get_or_init(|| Terminal::Faulted(e))
                        .as_result()
                        .map(|items| read(items));
                }
            }
        }

        let buffer = std::mem::take(&mut growth.buffer);
        log::trace!("{}: drained, {} elements", self.node, buffer.len());
        *slot = None;
        self.terminal
            .get_or_init(|| Terminal::Computed(buffer.into()))
            .as_result()
            .map(|items| read(items))
    }
}

impl<E: Element> Materializer<E> for GrowingNode<E> {
    fn flavor(&self) -> Flavor {
        Flavor::Sequential
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        self.with_buffer(Some(index), |items| index < items.len())
    }

    fn get(&self, index: usize) -> Result<E> {
        self.with_buffer(Some(index), |items| items.get(index).cloned())?
            .ok_or_else(|| Error::out_of_range(index, self.known_size()))
    }

    fn size(&self) -> Result<usize> {
        self.with_buffer(None, |items| items.len())
    }

    fn known_size(&self) -> Option<usize> {
        match self.terminal.get() {
            Some(Terminal::Computed(items)) => Some(items.len()),
            _ => None,
        }
    }
}
