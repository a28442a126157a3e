//! Checked arithmetic over sizes and relative offsets.
//!
//! Virtual sizes of composed nodes are derived from upstream sizes by addition
//! and subtraction. None of these helpers wrap or saturate silently: a result
//! that does not fit in `usize` is reported as [`ErrorKind::SizeOverflow`].
//!
//! Positions relative to the end of a sequence are expressed with [`Offset`] and
//! resolved only once the sequence size is known.
//!
//! [`ErrorKind::SizeOverflow`]: crate::ErrorKind::SizeOverflow

use crate::{Error, Result};

/// Adds two sizes, failing with a size-overflow error attributed to `operation`.
#[inline]
pub fn checked_add(a: usize, b: usize, operation: &str) -> Result<usize> {
    a.checked_add(b).ok_or_else(|| Error::size_overflow(operation))
}

/// Subtracts `b` from `a`, failing with a size-overflow error on underflow.
#[inline]
pub fn checked_sub(a: usize, b: usize, operation: &str) -> Result<usize> {
    a.checked_sub(b).ok_or_else(|| Error::size_overflow(operation))
}

/// Computes `size - removed + inserted` without an intermediate overflow.
pub fn spliced_size(
    size: usize,
    removed: usize,
    inserted: usize,
    operation: &str,
) -> Result<usize> {
    let kept = checked_sub(size, removed, operation)?;
    checked_add(kept, inserted, operation)
}

/// A position relative to either end of a sequence.
///
/// Converting from `isize` follows the usual convention: non-negative values count
/// from the start, negative values count back from the end (`-1` is the last element).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    FromStart(usize),
    FromEnd(usize),
}

impl Offset {
    /// Resolves the offset against `size`, clamping into `[0, size]`.
    ///
    /// Used for range bounds, where a bound past either end selects nothing beyond
    /// that end.
    pub fn clamp(self, size: usize) -> usize {
        match self {
            Offset::FromStart(pos) => pos.min(size),
            Offset::FromEnd(back) => size.saturating_sub(back),
        }
    }

    /// Resolves the offset against `size` without clamping.
    ///
    /// Returns `None` when the offset reaches before the start. A `FromStart` offset is
    /// returned as is, even when it exceeds `size`.
    pub fn resolve(self, size: usize) -> Option<usize> {
        match self {
            Offset::FromStart(pos) => Some(pos),
            Offset::FromEnd(back) => size.checked_sub(back),
        }
    }
}

impl From<isize> for Offset {
    fn from(value: isize) -> Self {
        if value < 0 {
            Offset::FromEnd(value.unsigned_abs())
        } else {
            Offset::FromStart(value.unsigned_abs())
        }
    }
}

impl From<usize> for Offset {
    fn from(value: usize) -> Self {
        Offset::FromStart(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add() {
        assert_eq!(checked_add(2, 3, "concat").unwrap(), 5);
        let err = checked_add(usize::MAX, 1, "concat").unwrap_err();
        assert!(err.is_size_overflow());
        assert_eq!(err.to_string(), "size overflow in concat");
    }

    #[test]
    fn test_spliced_size() {
        assert_eq!(spliced_size(5, 2, 3, "replace").unwrap(), 6);
        assert_eq!(spliced_size(usize::MAX, 1, 1, "replace").unwrap(), usize::MAX);
        assert!(
            spliced_size(usize::MAX, 0, 1, "insert")
                .unwrap_err()
                .is_size_overflow()
        );
        assert!(spliced_size(1, 2, 0, "remove").unwrap_err().is_size_overflow());
    }

    #[test]
    fn test_offset_from_isize() {
        assert_eq!(Offset::from(3isize), Offset::FromStart(3));
        assert_eq!(Offset::from(0isize), Offset::FromStart(0));
        assert_eq!(Offset::from(-2isize), Offset::FromEnd(2));
        assert_eq!(
            Offset::from(isize::MIN),
            Offset::FromEnd(isize::MIN.unsigned_abs())
        );
    }

    #[test]
    fn test_clamp() {
        assert_eq!(Offset::FromStart(0).clamp(5), 0);
        assert_eq!(Offset::FromStart(3).clamp(5), 3);
        assert_eq!(Offset::FromStart(9).clamp(5), 5);
        assert_eq!(Offset::FromEnd(1).clamp(5), 4);
        assert_eq!(Offset::FromEnd(5).clamp(5), 0);
        assert_eq!(Offset::FromEnd(9).clamp(5), 0);
        assert_eq!(Offset::FromEnd(0).clamp(5), 5);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(Offset::FromEnd(2).resolve(5), Some(3));
        assert_eq!(Offset::FromEnd(6).resolve(5), None);
        assert_eq!(Offset::FromStart(7).resolve(5), Some(7));
    }
}
