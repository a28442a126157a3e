//! Sub-sequence search over element streams.
//!
//! - [`SliceMatcher`]: single-pass forward search. Elements are pushed one at a time,
//!   which suits sources that can only be consumed sequentially.
//! - [`rfind_by`]: backward search over a sequence of known length with random access.
//!
//! Equality is always supplied by the caller, so a search can use structural equality,
//! a projection, or any other element comparison.

use std::collections::VecDeque;

/// Single-pass search for a pattern within a stream of elements.
///
/// The matcher keeps a window of the most recent stream elements that match a prefix of
/// the pattern (at most `pattern.len()` of them). When a new element breaks the match,
/// the window is not discarded: its oldest elements are dropped one by one until the
/// remainder is a prefix of the pattern again, so a partial match whose suffix starts a
/// new occurrence is not lost. Each realignment costs at most `O(pattern.len()²)`
/// comparisons, and no prefix table is precomputed, which keeps the matcher usable
/// with comparators that are not transitive.
///
/// # Examples
///
/// ```
/// use lazyseq_slice_search::SliceMatcher;
///
/// let pattern = ['a', 'b', 'c'];
/// let mut matcher = SliceMatcher::new(&pattern, |x: &char, y: &char| x == y);
/// let found = "ababc".chars().find_map(|ch| matcher.push(ch));
/// assert_eq!(found, Some(2));
/// ```
pub struct SliceMatcher<'p, T, F> {
    pattern: &'p [T],
    eq: F,
    /// Most recent stream elements, equal to `pattern[..window.len()]`.
    window: VecDeque<T>,
    /// Number of elements pushed so far.
    consumed: usize,
}

impl<'p, T, F> SliceMatcher<'p, T, F>
where
    F: FnMut(&T, &T) -> bool,
{
    pub fn new(pattern: &'p [T], eq: F) -> Self {
        SliceMatcher {
            pattern,
            eq,
            window: VecDeque::with_capacity(pattern.len()),
            consumed: 0,
        }
    }

    /// Number of stream elements pushed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Length of the pattern prefix matched by the tail of the stream.
    pub fn matched_len(&self) -> usize {
        self.window.len()
    }

    /// Feeds the next stream element.
    ///
    /// Returns the stream position where an occurrence of the pattern starts if this
    /// element completes one. After a reported match the search continues, so
    /// overlapping occurrences are reported as well.
    ///
    /// An empty pattern never reports through `push`; it matches at position 0 of any
    /// stream and callers are expected to handle it up front.
    pub fn push(&mut self, item: T) -> Option<usize> {
        self.consumed += 1;
        if self.pattern.is_empty() {
            return None;
        }

        self.window.push_back(item);
        while !self.window.is_empty() && !self.window_is_prefix() {
            self.window.pop_front();
        }

        if self.window.len() == self.pattern.len() {
            let start = self.consumed - self.pattern.len();
            // Keep searching for an overlapping occurrence.
            self.window.pop_front();
            while !self.window.is_empty() && !self.window_is_prefix() {
                self.window.pop_front();
            }
            Some(start)
        } else {
            None
        }
    }

    /// Discards the current partial match and the element count.
    pub fn reset(&mut self) {
        self.window.clear();
        self.consumed = 0;
    }

    fn window_is_prefix(&mut self) -> bool {
        let eq = &mut self.eq;
        self.window
            .iter()
            .zip(self.pattern)
            .all(|(item, expected)| eq(item, expected))
    }
}

/// Finds the first occurrence of `pattern` in `items`.
pub fn find_by<T, F>(items: &[T], pattern: &[T], eq: F) -> Option<usize>
where
    T: Clone,
    F: FnMut(&T, &T) -> bool,
{
    if pattern.is_empty() {
        return Some(0);
    }
    let mut matcher = SliceMatcher::new(pattern, eq);
    items.iter().find_map(|item| matcher.push(item.clone()))
}

/// Finds the start of the last occurrence of a pattern in a random-access sequence.
///
/// `matches(hay_pos, pattern_pos)` compares the sequence element at `hay_pos` with the
/// pattern element at `pattern_pos`; it may fail, in which case the search stops and
/// the error is returned. Candidate positions are tried from the end backwards, and each
/// candidate is compared from its last element, so a sequence that ends with the
/// pattern is confirmed with `pattern_len` comparisons. The worst case is
/// `O(hay_len * pattern_len)`.
///
/// An empty pattern matches at `hay_len`.
pub fn rfind_by<E, M>(
    hay_len: usize,
    pattern_len: usize,
    mut matches: M,
) -> Result<Option<usize>, E>
where
    M: FnMut(usize, usize) -> Result<bool, E>,
{
    if pattern_len > hay_len {
        return Ok(None);
    }
    for start in (0..=hay_len - pattern_len).rev() {
        let mut all = true;
        for offset in (0..pattern_len).rev() {
            if !matches(start + offset, offset)? {
                all = false;
                break;
            }
        }
        if all {
            return Ok(Some(start));
        }
    }
    Ok(None)
}
