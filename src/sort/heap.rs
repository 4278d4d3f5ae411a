/// In-place heap sort in ascending order under `less`.
///
/// Builds a binary max-heap, then repeatedly swaps the root to the end of
/// the unsorted region. Not stable.
pub fn heap_sort<T, F>(items: &mut [T], less: &F)
where
    F: Fn(&T, &T) -> bool + ?Sized,
{
    let length = items.len();
    for root in (0..length / 2).rev() {
        sift_down(items, root, length, less);
    }
    for end in (1..length).rev() {
        items.swap(0, end);
        sift_down(items, 0, end, less);
    }
}

fn sift_down<T, F>(items: &mut [T], mut root: usize, end: usize, less: &F)
where
    F: Fn(&T, &T) -> bool + ?Sized,
{
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            break;
        }
        if child + 1 < end && less(&items[child], &items[child + 1]) {
            child += 1;
        }
        if !less(&items[root], &items[child]) {
            break;
        }
        items.swap(root, child);
        root = child;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_heap_sort_basic() {
        let mut items = vec![4, 1, 3, 9, 7, 2];
        heap_sort(&mut items, &|a: &i32, b: &i32| a < b);
        assert_eq!(items, vec![1, 2, 3, 4, 7, 9]);
    }

    #[test]
    fn test_heap_sort_already_sorted() {
        let mut items = vec![1, 2, 3, 4, 5];
        heap_sort(&mut items, &|a: &i32, b: &i32| a < b);
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_heap_sort_trivial() {
        let mut empty: Vec<i32> = Vec::new();
        heap_sort(&mut empty, &|a: &i32, b: &i32| a < b);
        assert!(empty.is_empty());

        let mut single = vec![42];
        heap_sort(&mut single, &|a: &i32, b: &i32| a < b);
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_heap_sort_strings_by_length() {
        let mut words = vec!["ccc", "a", "bb", "dddd"];
        heap_sort(&mut words, &|a: &&str, b: &&str| a.len() < b.len());
        assert_eq!(words, vec!["a", "bb", "ccc", "dddd"]);
    }

    proptest! {
        #[test]
        fn prop_heap_sort_matches_std(mut items in prop::collection::vec(any::<i64>(), 0..200)) {
            let mut expected = items.clone();
            expected.sort();
            heap_sort(&mut items, &|a: &i64, b: &i64| a < b);
            prop_assert_eq!(items, expected);
        }
    }
}
