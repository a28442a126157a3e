use std::sync::Arc;

use lazyseq_common::{Error, Offset, Result, size::spliced_size};

use crate::{
    materializer::{Element, Flavor, Materializer, SharedMaterializer},
    memo::Memo,
};

pub(crate) type Predicate<E> = Arc<dyn Fn(&E) -> Result<bool> + Send + Sync>;

pub(crate) type Derive<E> = Arc<dyn Fn(E) -> Result<SharedMaterializer<E>> + Send + Sync>;

/// Where a splice applies.
pub(crate) enum Anchor<E> {
    /// Before the element at the position. A position equal to the size appends.
    Position(Offset),
    /// The element at the position, which must exist.
    Element(Offset),
    /// The elements in `[start, end)`, with both bounds clamped to the sequence.
    /// An open end extends to the end of the sequence.
    Range { start: Offset, end: Option<Offset> },
    /// After the last element.
    End,
    /// The first element satisfying the predicate, if any.
    FirstWhere(Predicate<E>),
    /// The last element satisfying the predicate, if any.
    LastWhere(Predicate<E>),
}

/// What replaces the anchored elements.
pub(crate) enum Span<E> {
    Empty,
    Items(SharedMaterializer<E>),
    /// Derived from the anchored element. Only meaningful for single-element anchors.
    Derived(Derive<E>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removed {
    Count(usize),
    /// Everything from the anchor start on.
    ToEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    start: usize,
    removed: Removed,
}

struct Resolved<E> {
    placement: Placement,
    span: Option<SharedMaterializer<E>>,
}

enum Located<'a, E> {
    Upstream(usize),
    Span(&'a SharedMaterializer<E>, usize),
    Beyond,
}

/// Removes the anchored elements of the upstream and inserts the span in their place.
///
/// For a virtual index `i`, with the anchor resolved to `start` and `removed` upstream
/// elements:
/// - `i < start` reads upstream `i`;
/// - `start <= i < start + span_len` reads the span at `i - start`;
/// - otherwise reads upstream `i - span_len + removed`.
///
/// The anchor is resolved once, on first need. Positive positions are validated by
/// probing the upstream, so the upstream size is only computed for anchors relative to
/// the end, for positions beyond the upstream, and for predicates searching backwards.
/// A predicate that matches nothing leaves the upstream unchanged.
pub(crate) struct SpliceNode<E> {
    node: &'static str,
    source: SharedMaterializer<E>,
    anchor: Anchor<E>,
    span: Span<E>,
    /// `None` when the anchor did not match anything.
    resolution: Memo<Option<Resolved<E>>>,
}

impl<E: Element> SpliceNode<E> {
    pub fn new(
        node: &'static str,
        source: SharedMaterializer<E>,
        anchor: Anchor<E>,
        span: Span<E>,
    ) -> Self {
        SpliceNode {
            node,
            source,
            anchor,
            span,
            resolution: Memo::new(node),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> crate::memo::StateKind {
        self.resolution.state()
    }

    fn resolve(&self) -> Result<Option<&Resolved<E>>> {
        self.resolution
            .get_or_compute(|| self.compute_resolution())
            .map(Option::as_ref)
    }

    fn compute_resolution(&self) -> Result<Option<Resolved<E>>> {
        let Some(placement) = self.place()? else {
            return Ok(None);
        };
        let span = match &self.span {
            Span::Empty => None,
            Span::Items(items) => Some(items.clone()),
            Span::Derived(derive) => Some(derive(self.source.get(placement.start)?)?),
        };
        Ok(Some(Resolved { placement, span }))
    }

    fn place(&self) -> Result<Option<Placement>> {
        let placement = match &self.anchor {
            Anchor::Position(offset) => Placement {
                start: self.position(*offset)?,
                removed: Removed::Count(0),
            },
            Anchor::Element(offset) => Placement {
                start: self.element(*offset)?,
                removed: Removed::Count(1),
            },
            Anchor::Range { start, end } => {
                let start = self.clamp_bound(*start)?;
                let removed = match end {
                    Some(end) => Removed::Count(self.clamp_bound(*end)?.saturating_sub(start)),
                    None => Removed::ToEnd,
                };
                Placement { start, removed }
            }
            Anchor::End => Placement {
                start: self.source.size()?,
                removed: Removed::Count(0),
            },
            Anchor::FirstWhere(pred) => {
                let found = self.first_where(pred)?;
                log::debug!("{}: first match at {found:?}", self.node);
                return Ok(found.map(single));
            }
            Anchor::LastWhere(pred) => {
                let found = self.last_where(pred)?;
                log::debug!("{}: last match at {found:?}", self.node);
                return Ok(found.map(single));
            }
        };
        Ok(Some(placement))
    }

    /// Resolves an insertion position, which may be anywhere in `[0, size]`.
    fn position(&self, offset: Offset) -> Result<usize> {
        match offset {
            Offset::FromStart(pos) if pos == 0 || self.source.can_produce(pos - 1)? => Ok(pos),
            Offset::FromStart(pos) => Err(Error::out_of_range(pos, Some(self.source.size()?))),
            Offset::FromEnd(back) => {
                let size = self.source.size()?;
                offset
                    .resolve(size)
                    .ok_or_else(|| Error::out_of_range(back, Some(size)))
            }
        }
    }

    /// Resolves the position of an existing element.
    fn element(&self, offset: Offset) -> Result<usize> {
        match offset {
            Offset::FromStart(pos) if self.source.can_produce(pos)? => Ok(pos),
            Offset::FromStart(pos) => Err(Error::out_of_range(pos, Some(self.source.size()?))),
            Offset::FromEnd(back) => {
                let size = self.source.size()?;
                match offset.resolve(size) {
                    Some(pos) if back > 0 => Ok(pos),
                    _ => Err(Error::out_of_range(back, Some(size))),
                }
            }
        }
    }

    fn clamp_bound(&self, offset: Offset) -> Result<usize> {
        match offset {
            Offset::FromStart(pos) if pos == 0 || self.source.can_produce(pos - 1)? => Ok(pos),
            _ => Ok(offset.clamp(self.source.size()?)),
        }
    }

    fn first_where(&self, pred: &Predicate<E>) -> Result<Option<usize>> {
        for (index, item) in self.source.cursor().enumerate() {
            if pred(&item?)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn last_where(&self, pred: &Predicate<E>) -> Result<Option<usize>> {
        for index in (0..self.source.size()?).rev() {
            if pred(&self.source.get(index)?)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Maps a virtual index onto the upstream or the span.
    fn locate(&self, index: usize) -> Result<Located<'_, E>> {
        // Appending never needs the upstream size for indices the upstream has.
        if matches!(self.anchor, Anchor::End) && self.source.can_produce(index)? {
            return Ok(Located::Upstream(index));
        }
        let Some(resolved) = self.resolve()? else {
            return Ok(Located::Upstream(index));
        };
        let Placement { start, removed } = resolved.placement;
        if index < start {
            return Ok(Located::Upstream(index));
        }
        let offset = index - start;
        let span_len = match &resolved.span {
            Some(span) if span.can_produce(offset)? => return Ok(Located::Span(span, offset)),
            Some(span) => span.size()?,
            None => 0,
        };
        let Removed::Count(removed) = removed else {
            return Ok(Located::Beyond);
        };
        // `start + removed` never exceeds the upstream size.
        Ok((offset - span_len)
            .checked_add(start + removed)
            .map_or(Located::Beyond, Located::Upstream))
    }

    fn placement_for_size(&self, size: usize) -> Option<Placement> {
        let placement = match &self.anchor {
            Anchor::Position(offset) => Placement {
                start: offset.resolve(size).filter(|&pos| pos <= size)?,
                removed: Removed::Count(0),
            },
            Anchor::Element(offset) => Placement {
                start: offset.resolve(size).filter(|&pos| pos < size)?,
                removed: Removed::Count(1),
            },
            Anchor::Range { start, end } => {
                let start = start.clamp(size);
                let removed = match end {
                    Some(end) => Removed::Count(end.clamp(size).saturating_sub(start)),
                    None => Removed::ToEnd,
                };
                Placement { start, removed }
            }
            Anchor::End => Placement {
                start: size,
                removed: Removed::Count(0),
            },
            Anchor::FirstWhere(_) | Anchor::LastWhere(_) => return None,
        };
        Some(placement)
    }
}

fn single(start: usize) -> Placement {
    Placement {
        start,
        removed: Removed::Count(1),
    }
}

fn removed_count(placement: Placement, size: usize) -> usize {
    match placement.removed {
        Removed::Count(removed) => removed,
        Removed::ToEnd => size - placement.start,
    }
}

impl<E: Element> Materializer<E> for SpliceNode<E> {
    fn flavor(&self) -> Flavor {
        self.source.flavor()
    }

    fn can_produce(&self, index: usize) -> Result<bool> {
        match self.locate(index)? {
            Located::Upstream(pos) => self.source.can_produce(pos),
            Located::Span(..) => Ok(true),
            Located::Beyond => Ok(false),
        }
    }

    fn get(&self, index: usize) -> Result<E> {
        match self.locate(index)? {
            Located::Upstream(pos) if self.source.can_produce(pos)? => self.source.get(pos),
            Located::Span(span, offset) => span.get(offset),
            _ => Err(Error::out_of_range(index, self.known_size())),
        }
    }

    fn size(&self) -> Result<usize> {
        let size = self.source.size()?;
        let Some(resolved) = self.resolve()? else {
            return Ok(size);
        };
        let inserted = match &resolved.span {
            Some(span) => span.size()?,
            None => 0,
        };
        spliced_size(
            size,
            removed_count(resolved.placement, size),
            inserted,
            self.node,
        )
    }

    fn known_size(&self) -> Option<usize> {
        let size = self.source.known_size()?;
        let (placement, span) = match self.resolution.computed_value() {
            Some(None) => return Some(size),
            Some(Some(resolved)) => (resolved.placement, resolved.span.as_ref()),
            None => {
                let span = match &self.span {
                    Span::Empty => None,
                    Span::Items(items) => Some(items),
                    Span::Derived(_) => return None,
                };
                (self.placement_for_size(size)?, span)
            }
        };
        let inserted = match span {
            Some(span) => span.known_size()?,
            None => 0,
        };
        spliced_size(size, removed_count(placement, size), inserted, self.node).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        growing::{GrowingNode, Identity, IterPull},
        materializer::to_vec,
        memo::StateKind,
        source::VecSource,
    };

    fn items(values: &[&'static str]) -> SharedMaterializer<&'static str> {
        Arc::new(VecSource::from_slice(values))
    }

    fn one(value: &'static str) -> Span<&'static str> {
        Span::Items(Arc::new(VecSource::once(value)))
    }

    fn splice(
        source: &[&'static str],
        anchor: Anchor<&'static str>,
        span: Span<&'static str>,
    ) -> SpliceNode<&'static str> {
        SpliceNode::new("test", items(source), anchor, span)
    }

    /// A source that does not report its size up front.
    fn unsized_source(values: Vec<u32>) -> SharedMaterializer<u32> {
        let pull = IterPull::new(values.into_iter().map(Ok::<u32, Error>));
        Arc::new(GrowingNode::new("iter", Box::new(pull), Identity, 0))
    }

    #[test]
    fn test_insert_at_position() {
        let node = splice(
            &["a", "b", "c", "d"],
            Anchor::Position(Offset::FromStart(2)),
            one("X"),
        );
        assert_eq!(node.known_size(), Some(5));
        assert_eq!(node.get(2).unwrap(), "X");
        assert_eq!(node.get(3).unwrap(), "c");
        assert_eq!(node.size().unwrap(), 5);
        assert_eq!(to_vec(&node).unwrap(), vec!["a", "b", "X", "c", "d"]);
        assert!(node.get(5).unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_insert_relative_to_end() {
        let node = splice(&["a", "b", "c"], Anchor::Position(Offset::FromEnd(1)), one("X"));
        assert_eq!(to_vec(&node).unwrap(), vec!["a", "b", "X", "c"]);
    }

    #[test]
    fn test_insert_past_end_fails() {
        let node = splice(&["a"], Anchor::Position(Offset::FromStart(2)), one("X"));
        assert_eq!(node.known_size(), None);
        let err = node.get(0).unwrap_err();
        assert!(err.is_out_of_range());
        assert!(node.size().unwrap_err().same_as(&err));
        assert_eq!(node.state(), StateKind::Faulted);

        let at_end = splice(&["a"], Anchor::Position(Offset::FromStart(1)), one("X"));
        assert_eq!(to_vec(&at_end).unwrap(), vec!["a", "X"]);
    }

    #[test]
    fn test_remove_negative_range() {
        let node = splice(
            &["a", "b", "c", "d", "e"],
            Anchor::Range {
                start: Offset::FromEnd(2),
                end: Some(Offset::FromEnd(1)),
            },
            Span::Empty,
        );
        assert_eq!(node.known_size(), Some(4));
        assert_eq!(to_vec(&node).unwrap(), vec!["a", "b", "c", "e"]);
    }

    #[test]
    fn test_range_bounds_are_clamped() {
        let node = splice(
            &["a", "b", "c"],
            Anchor::Range {
                start: Offset::FromStart(1),
                end: Some(Offset::FromStart(10)),
            },
            one("Z"),
        );
        assert_eq!(to_vec(&node).unwrap(), vec!["a", "Z"]);
        let inverted = splice(
            &["a", "b", "c"],
            Anchor::Range {
                start: Offset::FromStart(2),
                end: Some(Offset::FromStart(1)),
            },
            Span::Empty,
        );
        assert_eq!(inverted.size().unwrap(), 3);
    }

    #[test]
    fn test_open_range_does_not_need_size() {
        let node = SpliceNode::new(
            "remove_range",
            unsized_source((0..10).collect()),
            Anchor::Range {
                start: Offset::FromStart(2),
                end: Some(Offset::FromStart(4)),
            },
            Span::Empty,
        );
        assert_eq!(node.get(2).unwrap(), 4);
        assert_eq!(node.known_size(), None);
        assert_eq!(node.size().unwrap(), 8);

        let tail = SpliceNode::new(
            "remove_range",
            unsized_source((0..10).collect()),
            Anchor::Range {
                start: Offset::FromStart(3),
                end: None,
            },
            Span::Empty,
        );
        assert_eq!(to_vec(&tail).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_and_replace_element() {
        let removed = splice(&["a", "b", "c"], Anchor::Element(Offset::FromEnd(1)), Span::Empty);
        assert_eq!(to_vec(&removed).unwrap(), vec!["a", "b"]);
        let replaced = splice(&["a", "b", "c"], Anchor::Element(Offset::FromStart(0)), one("Z"));
        assert_eq!(to_vec(&replaced).unwrap(), vec!["Z", "b", "c"]);
        let missing = splice(&["a"], Anchor::Element(Offset::FromStart(1)), Span::Empty);
        assert!(missing.size().unwrap_err().is_out_of_range());
        let too_far_back = splice(&["a"], Anchor::Element(Offset::FromEnd(2)), Span::Empty);
        assert!(too_far_back.size().unwrap_err().is_out_of_range());
    }

    #[test]
    fn test_append_does_not_force_size() {
        let node = SpliceNode::new(
            "append",
            unsized_source(vec![1, 2, 3]),
            Anchor::End,
            Span::Items(Arc::new(VecSource::new(vec![4, 5]))),
        );
        assert_eq!(node.get(1).unwrap(), 2);
        assert_eq!(node.state(), StateKind::Pending);
        assert_eq!(node.get(4).unwrap(), 5);
        assert_eq!(node.size().unwrap(), 5);
        assert_eq!(node.known_size(), Some(5));
    }

    #[test]
    fn test_predicate_anchors() {
        let source = &["a", "bb", "c", "dd"];
        let long: Predicate<&str> = Arc::new(|s: &&str| Ok(s.len() > 1));
        let first = splice(source, Anchor::FirstWhere(long.clone()), Span::Empty);
        assert_eq!(to_vec(&first).unwrap(), vec!["a", "c", "dd"]);
        let last = splice(source, Anchor::LastWhere(long.clone()), one("Z"));
        assert_eq!(to_vec(&last).unwrap(), vec!["a", "bb", "c", "Z"]);

        let none: Predicate<&str> = Arc::new(|s: &&str| Ok(s.is_empty()));
        let unchanged = splice(source, Anchor::FirstWhere(none), Span::Empty);
        assert_eq!(unchanged.size().unwrap(), 4);
        assert_eq!(unchanged.known_size(), Some(4));
    }

    #[test]
    fn test_derived_span() {
        let node = SpliceNode::new(
            "flat_map_first_where",
            Arc::new(VecSource::new(vec![1, 2, 3])),
            Anchor::FirstWhere(Arc::new(|x: &i32| Ok(*x >= 2))),
            Span::Derived(Arc::new(|x: i32| {
                let expanded: SharedMaterializer<i32> = Arc::new(VecSource::new(vec![x; 3]));
                Ok(expanded)
            })),
        );
        assert_eq!(node.known_size(), None);
        assert_eq!(to_vec(&node).unwrap(), vec![1, 2, 2, 2, 3]);
        assert_eq!(node.known_size(), Some(5));
    }

    #[test]
    fn test_predicate_runs_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let node = SpliceNode::new(
            "remove_first_where",
            Arc::new(VecSource::new(vec![5, 6, 7])),
            Anchor::FirstWhere(Arc::new(move |x: &i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(*x == 6)
            })),
            Span::Empty,
        );
        assert_eq!(to_vec(&node).unwrap(), vec![5, 7]);
        assert_eq!(to_vec(&node).unwrap(), vec![5, 7]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_size_overflow() {
        let huge: SharedMaterializer<u8> = Arc::new(crate::source::Repeat::new(0, usize::MAX));
        let node = SpliceNode::new(
            "insert",
            huge,
            Anchor::Position(Offset::FromStart(1)),
            Span::Items(Arc::new(VecSource::once(1))),
        );
        assert!(node.size().unwrap_err().is_size_overflow());
        assert_eq!(node.known_size(), None);
        assert_eq!(node.get(1).unwrap(), 1);
        assert_eq!(node.get(2).unwrap(), 0);
    }
}
