/*!
 * Capability Traits
 *
 * Ordering capability supplied by callers of ordered containers.
 *
 * Keyed lock tables take their equality/hash capability through the standard
 * `Hash + Eq` bounds plus a caller-supplied `BuildHasher`; a custom notion of
 * key equality is expressed by wrapping keys in a newtype.
 */

use std::cmp::Ordering;

/// Three-way comparison over keys of type `K`
///
/// Implemented for [`NaturalOrder`] (delegates to `Ord`) and for every
/// closure `Fn(&K, &K) -> Ordering`.
pub trait Comparator<K: ?Sized> {
    fn compare(&self, left: &K, right: &K) -> Ordering;
}

/// Comparator that uses the key's own `Ord` implementation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        self(left, right)
    }
}
