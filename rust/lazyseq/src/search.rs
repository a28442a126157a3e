//! Sub-sequence search.
//!
//! Forward searches (`index_of_slice`, `includes_slice`, `starts_with`) consume the
//! haystack in a single pass and stop at the first match, so they work on one-pass
//! sources and never look further than needed. Backward searches (`last_index_of_slice`,
//! `ends_with`) need both sizes and read the haystack by index from its end.
//!
//! The pattern is itself a sequence; it is collected once, when the search runs.

use lazyseq_common::Result;
use lazyseq_slice_search::{SliceMatcher, rfind_by};

use crate::{
    materializer::{Element, Materializer, SharedMaterializer, to_vec},
    scalar::Scalar,
};

/// Start of the first occurrence of `pattern`.
fn first_occurrence<E, F>(
    source: &SharedMaterializer<E>,
    pattern: &[E],
    eq: F,
) -> Result<Option<usize>>
where
    E: Element,
    F: FnMut(&E, &E) -> bool,
{
    if pattern.is_empty() {
        return Ok(Some(0));
    }
    let mut matcher = SliceMatcher::new(pattern, eq);
    for item in source.cursor() {
        if let Some(start) = matcher.push(item?) {
            return Ok(Some(start));
        }
    }
    Ok(None)
}

pub(crate) fn index_of_slice_by<E, F>(
    source: SharedMaterializer<E>,
    pattern: SharedMaterializer<E>,
    eq: F,
) -> Scalar<usize>
where
    E: Element,
    F: Fn(&E, &E) -> bool + Send + Sync + 'static,
{
    Scalar::new("index_of_slice", move || {
        let pattern = to_vec(&pattern)?;
        first_occurrence(&source, &pattern, &eq)
    })
}

pub(crate) fn includes_slice_by<E, F>(
    source: SharedMaterializer<E>,
    pattern: SharedMaterializer<E>,
    eq: F,
) -> Scalar<bool>
where
    E: Element,
    F: Fn(&E, &E) -> bool + Send + Sync + 'static,
{
    Scalar::new("includes_slice", move || {
        let pattern = to_vec(&pattern)?;
        Ok(Some(first_occurrence(&source, &pattern, &eq)?.is_some()))
    })
}

pub(crate) fn last_index_of_slice_by<E, F>(
    source: SharedMaterializer<E>,
    pattern: SharedMaterializer<E>,
    eq: F,
) -> Scalar<usize>
where
    E: Element,
    F: Fn(&E, &E) -> bool + Send + Sync + 'static,
{
    Scalar::new("last_index_of_slice", move || {
        let pattern = to_vec(&pattern)?;
        rfind_by(source.size()?, pattern.len(), |hay, pos| {
            Ok(eq(&source.get(hay)?, &pattern[pos]))
        })
    })
}

pub(crate) fn starts_with_by<E, F>(
    source: SharedMaterializer<E>,
    prefix: SharedMaterializer<E>,
    eq: F,
) -> Scalar<bool>
where
    E: Element,
    F: Fn(&E, &E) -> bool + Send + Sync + 'static,
{
    Scalar::new("starts_with", move || {
        for (index, expected) in prefix.cursor().enumerate() {
            let expected = expected?;
            if !source.can_produce(index)? || !eq(&source.get(index)?, &expected) {
                return Ok(Some(false));
            }
        }
        Ok(Some(true))
    })
}

pub(crate) fn ends_with_by<E, F>(
    source: SharedMaterializer<E>,
    suffix: SharedMaterializer<E>,
    eq: F,
) -> Scalar<bool>
where
    E: Element,
    F: Fn(&E, &E) -> bool + Send + Sync + 'static,
{
    Scalar::new("ends_with", move || {
        let size = source.size()?;
        let suffix_len = suffix.size()?;
        let Some(offset) = size.checked_sub(suffix_len) else {
            return Ok(Some(false));
        };
        for pos in (0..suffix_len).rev() {
            if !eq(&source.get(offset + pos)?, &suffix.get(pos)?) {
                return Ok(Some(false));
            }
        }
        Ok(Some(true))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lazyseq_common::Error;

    use super::*;
    use crate::source::{IterSource, VecSource};

    fn chars(s: &str) -> SharedMaterializer<char> {
        Arc::new(VecSource::new(s.chars().collect()))
    }

    fn eq(a: &char, b: &char) -> bool {
        a == b
    }

    #[test]
    fn test_index_of_slice_backtracks() {
        let found = index_of_slice_by(chars("ababc"), chars("abc"), eq);
        assert_eq!(found.value().unwrap(), Some(2));
        let missing = index_of_slice_by(chars("abab"), chars("abc"), eq);
        assert_eq!(missing.value().unwrap(), None);
        assert!(missing.is_empty().unwrap());
        let empty = index_of_slice_by(chars("xyz"), chars(""), eq);
        assert_eq!(empty.value().unwrap(), Some(0));
    }

    #[test]
    fn test_last_index_of_slice() {
        let found = last_index_of_slice_by(chars("abcabcab"), chars("abc"), eq);
        assert_eq!(found.value().unwrap(), Some(3));
        let empty = last_index_of_slice_by(chars("abc"), chars(""), eq);
        assert_eq!(empty.value().unwrap(), Some(3));
        let longer = last_index_of_slice_by(chars("ab"), chars("abc"), eq);
        assert_eq!(longer.value().unwrap(), None);
    }

    #[test]
    fn test_prefix_and_suffix() {
        assert_eq!(starts_with_by(chars("abc"), chars("ab"), eq).value().unwrap(), Some(true));
        assert_eq!(starts_with_by(chars("abc"), chars("b"), eq).value().unwrap(), Some(false));
        assert_eq!(starts_with_by(chars("a"), chars("ab"), eq).value().unwrap(), Some(false));
        assert_eq!(ends_with_by(chars("abc"), chars("bc"), eq).value().unwrap(), Some(true));
        assert_eq!(ends_with_by(chars("abc"), chars("ab"), eq).value().unwrap(), Some(false));
        assert_eq!(ends_with_by(chars("c"), chars("bc"), eq).value().unwrap(), Some(false));
        assert_eq!(ends_with_by(chars("abc"), chars(""), eq).value().unwrap(), Some(true));
    }

    #[test]
    fn test_custom_equality() {
        let found = includes_slice_by(chars("Hello World"), chars("WORLD"), |a, b| {
            a.eq_ignore_ascii_case(b)
        });
        assert_eq!(found.value().unwrap(), Some(true));
    }

    #[test]
    fn test_forward_search_stops_at_match() {
        let items = vec![Ok(1), Ok(2), Ok(3), Err(Error::message("iter", "read too far"))];
        let source: SharedMaterializer<i32> = Arc::new(IterSource::try_new(items, 0));
        let pattern: SharedMaterializer<i32> = Arc::new(VecSource::new(vec![2, 3]));
        let found = index_of_slice_by(source, pattern, |a, b| a == b);
        assert_eq!(found.value().unwrap(), Some(1));
    }
}
