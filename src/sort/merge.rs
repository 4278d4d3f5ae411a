use super::DEFAULT_SORT_CUTOFF;

/// Stable concurrent merge sort.
///
/// Splits at the midpoint, sorts both halves concurrently and merges them
/// with a two-pointer walk. On a tie the item from the left half is emitted
/// first. Halves at or below [`DEFAULT_SORT_CUTOFF`] are insertion-sorted
/// on the current thread.
pub fn merge_sort<T, F>(items: Vec<T>, less: &F) -> Vec<T>
where
    T: Send,
    F: Fn(&T, &T) -> bool + Sync + ?Sized,
{
    merge_sort_with_cutoff(items, less, DEFAULT_SORT_CUTOFF)
}

/// [`merge_sort`] with an explicit sequential cutoff.
///
/// A cutoff of 1 splits all the way down to single elements.
pub fn merge_sort_with_cutoff<T, F>(mut items: Vec<T>, less: &F, cutoff: usize) -> Vec<T>
where
    T: Send,
    F: Fn(&T, &T) -> bool + Sync + ?Sized,
{
    let length = items.len();
    if length < 2 {
        return items;
    }
    if length <= cutoff.max(1) {
        insertion_sort(&mut items, less);
        return items;
    }

    let right = items.split_off(length / 2);
    let (left, right) = rayon::join(
        || merge_sort_with_cutoff(items, less, cutoff),
        || merge_sort_with_cutoff(right, less, cutoff),
    );
    merge(left, right, less)
}

fn merge<T, F>(left: Vec<T>, right: Vec<T>, less: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> bool + ?Sized,
{
    let mut result = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => less(b, a),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        result.extend(next);
    }
    result
}

/// Stable in-place insertion sort; only moves an item past strictly greater ones.
fn insertion_sort<T, F>(items: &mut [T], less: &F)
where
    F: Fn(&T, &T) -> bool + ?Sized,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && less(&items[j], &items[j - 1]) {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sorts_ascending() {
        let sorted = merge_sort(vec![5, 3, 9, 1, 4, 1], &|a: &i32, b: &i32| a < b);
        assert_eq!(sorted, vec![1, 1, 3, 4, 5, 9]);
    }

    #[test]
    fn test_empty_and_single() {
        let less = |a: &i32, b: &i32| a < b;
        assert!(merge_sort(Vec::new(), &less).is_empty());
        assert_eq!(merge_sort(vec![7], &less), vec![7]);
    }

    #[test]
    fn test_stable_on_ties_with_full_split() {
        // Sort by key only; the tag records input order.
        let items: Vec<(u8, char)> = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd'), (2, 'e')];
        let sorted = merge_sort_with_cutoff(items, &|a: &(u8, char), b: &(u8, char)| a.0 < b.0, 1);
        assert_eq!(
            sorted,
            vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c'), (2, 'e')]
        );
    }

    #[test]
    fn test_descending_comparator() {
        let items: Vec<i32> = (0..100).collect();
        let sorted = merge_sort_with_cutoff(items, &|a: &i32, b: &i32| a > b, 4);
        let expected: Vec<i32> = (0..100).rev().collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_inconsistent_comparator_keeps_all_items() {
        let items: Vec<i32> = (0..50).collect();
        let sorted = merge_sort_with_cutoff(items, &|_: &i32, _: &i32| true, 3);
        let mut restored = sorted.clone();
        restored.sort();
        assert_eq!(restored, (0..50).collect::<Vec<_>>());
    }
}
