//! This file contains the helper functions shared by the growable
//! structures of the allocator.

/// Integer form of the `used / capacity > 0.75` fill test.
///
/// The naive integer division truncates the ratio to zero for every
/// capacity greater than `used`, so the test would never fire. Comparing
/// `used * 4` against `capacity * 3` gives the exact same threshold
/// without leaving integer arithmetic.
pub(crate) fn above_fill_factor(used: usize, capacity: usize) -> bool {
    used * 4 > capacity * 3
}
