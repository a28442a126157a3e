//! Random data generation for model-based tests, plus the reference arithmetic the
//! structural operators are checked against.

/// Generates `len` random values in `0..max`.
pub fn random_items(rng: &mut fastrand::Rng, len: usize, max: i32) -> Vec<i32> {
    assert!(max > 0);
    (0..len).map(|_| rng.i32(0..max)).collect()
}

/// Generates a random position for a sequence of `len` elements, in the form the
/// structural operators accept. Positions one step past either end are included.
pub fn random_position(rng: &mut fastrand::Rng, len: usize) -> isize {
    let bound = len as isize + 1;
    rng.isize(-bound..=bound)
}

/// Insertion point for `pos` in a sequence of `len` elements, if it is valid.
pub fn insert_position(pos: isize, len: usize) -> Option<usize> {
    if pos >= 0 {
        Some(pos as usize).filter(|&pos| pos <= len)
    } else {
        len.checked_sub(pos.unsigned_abs())
    }
}

/// Index of the existing element addressed by `pos`, if any.
pub fn element_position(pos: isize, len: usize) -> Option<usize> {
    insert_position(pos, len).filter(|&index| index < len)
}

/// A range bound for `pos`, clamped to `[0, len]`.
pub fn clamp_bound(pos: isize, len: usize) -> usize {
    if pos >= 0 {
        (pos as usize).min(len)
    } else {
        len.saturating_sub(pos.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_position_range() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let pos = random_position(&mut rng, 4);
            assert!((-5..=5).contains(&pos));
        }
    }

    #[test]
    fn test_positions() {
        assert_eq!(insert_position(4, 4), Some(4));
        assert_eq!(insert_position(5, 4), None);
        assert_eq!(insert_position(-4, 4), Some(0));
        assert_eq!(insert_position(-5, 4), None);
        assert_eq!(element_position(4, 4), None);
        assert_eq!(element_position(-1, 4), Some(3));
        assert_eq!(clamp_bound(9, 4), 4);
        assert_eq!(clamp_bound(-1, 4), 3);
        assert_eq!(clamp_bound(-9, 4), 0);
    }
}
