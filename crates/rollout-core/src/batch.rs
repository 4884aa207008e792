//! Order-preserving grouping of adjacent elements.
//!
//! Unlike a group-by, equal keys separated by a different key start a new
//! group. Plans depend on this: group order is execution order.

use std::iter::Peekable;

/// Iterator over runs of adjacent elements that share a key.
///
/// Created by [`ContiguousBatchExt::batch_contiguous`] or [`batch_contiguous`].
/// Single pass over the source; only the group being built is held in memory.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct ContiguousBatches<I: Iterator, F> {
    source: Peekable<I>,
    key_of: F,
}

impl<I, F, K> Iterator for ContiguousBatches<I, F>
where
    I: Iterator,
    F: FnMut(&I::Item) -> K,
    K: PartialEq,
{
    type Item = (K, Vec<I::Item>);

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.source.next()?;
        let key = (self.key_of)(&first);
        let mut group = vec![first];

        let key_of = &mut self.key_of;
        while let Some(item) = self.source.next_if(|item| key_of(item) == key) {
            group.push(item);
        }

        Some((key, group))
    }
}

/// Extension trait adding [`batch_contiguous`](ContiguousBatchExt::batch_contiguous)
/// to every iterator.
pub trait ContiguousBatchExt: Iterator + Sized {
    /// Group adjacent elements whose projected keys are equal.
    fn batch_contiguous<K, F>(self, key_of: F) -> ContiguousBatches<Self, F>
    where
        F: FnMut(&Self::Item) -> K,
        K: PartialEq,
    {
        ContiguousBatches {
            source: self.peekable(),
            key_of,
        }
    }
}

impl<I: Iterator> ContiguousBatchExt for I {}

/// Free-function form of [`ContiguousBatchExt::batch_contiguous`].
pub fn batch_contiguous<S, K, F>(source: S, key_of: F) -> ContiguousBatches<S::IntoIter, F>
where
    S: IntoIterator,
    F: FnMut(&S::Item) -> K,
    K: PartialEq,
{
    source.into_iter().batch_contiguous(key_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_keys_split_by_other_key_stay_separate() {
        let input = vec![("A", 1), ("A", 1), ("B", 2), ("A", 1)];

        let groups: Vec<_> = batch_contiguous(input, |(_, build)| *build).collect();

        assert_eq!(
            groups,
            vec![
                (1, vec![("A", 1), ("A", 1)]),
                (2, vec![("B", 2)]),
                (1, vec![("A", 1)]),
            ]
        );
    }

    #[test]
    fn test_empty_source() {
        let groups: Vec<(u8, Vec<u8>)> = Vec::new().into_iter().batch_contiguous(|x| *x).collect();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_all_equal_keys_form_one_group() {
        let groups: Vec<_> = [3, 3, 3].into_iter().batch_contiguous(|_| "same").collect();
        assert_eq!(groups, vec![("same", vec![3, 3, 3])]);
    }

    #[test]
    fn test_is_lazy() {
        let mut pulled = 0;
        let source = (0..100).inspect(|_| pulled += 1);

        let first = source.batch_contiguous(|x| x / 10).next();

        assert_eq!(first, Some((0, (0..10).collect())));
        // The group ends once the eleventh element is peeked.
        assert_eq!(pulled, 11);
    }

    #[test]
    fn test_owned_keys() {
        let words = ["ab", "ac", "bd", "ae"];
        let groups: Vec<_> = words
            .iter()
            .batch_contiguous(|w| w[..1].to_string())
            .map(|(k, g)| (k, g.len()))
            .collect();
        assert_eq!(
            groups,
            vec![("a".to_string(), 2), ("b".to_string(), 1), ("a".to_string(), 1)]
        );
    }
}
