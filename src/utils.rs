//! Utility functions and types used across the library
use crate::Scalar;

/// Sort three items by the key in ascending order (insertion sort)
///
/// Payload stays attached to its key, which is what the 2D distributor needs
/// to carry second-axis coordinates along with the first-axis ones.
#[inline]
pub(crate) fn sort3_by<T: Copy>(mut items: [T; 3], key: impl Fn(&T) -> Scalar) -> [T; 3] {
    for j in 1..3 {
        let item = items[j];
        let mut i = j;
        while i > 0 && key(&items[i - 1]) > key(&item) {
            items[i] = items[i - 1];
            i -= 1;
        }
        items[i] = item;
    }
    items
}

/// Index of the bin containing `value`, may be negative or past the end
#[inline]
pub(crate) fn bin_of(value: Scalar) -> i64 {
    value.floor() as i64
}
