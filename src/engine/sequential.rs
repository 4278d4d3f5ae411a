use super::Executor;
use crate::pipeline::{Comparator, Consumer, Element, FlatMapper, KeyFn, Mapper, Order, Predicate};
use crate::sort::heap_sort;
use std::collections::HashSet;
use std::hash::Hash;

/// Runs every stage on the calling thread in input order.
///
/// There is nothing to reorder here, so ordered and unordered entry points
/// behave identically.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn all_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        !items.is_empty() && items.iter().all(|item| predicate(item))
    }

    fn any_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        items.iter().any(|item| predicate(item))
    }

    fn filter<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>, _order: Order) -> Vec<T> {
        items.into_iter().filter(|item| predicate(item)).collect()
    }

    fn map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &Mapper<T, U>,
        _order: Order,
    ) -> Vec<U> {
        items.into_iter().map(|item| mapper(item)).collect()
    }

    fn flat_map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &FlatMapper<T, U>,
        _order: Order,
    ) -> Vec<U> {
        items.into_iter().flat_map(|item| mapper(item)).collect()
    }

    fn peek<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) -> Vec<T> {
        items.iter().for_each(|item| consumer(item));
        items
    }

    fn for_each<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) {
        items.iter().for_each(|item| consumer(item));
    }

    /// First occurrence per key wins; survivors keep input order.
    fn distinct<T, K>(&self, items: Vec<T>, key: &KeyFn<T, K>) -> Vec<T>
    where
        T: Element,
        K: Hash + Eq + Send + 'static,
    {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|item| seen.insert(key(item)))
            .collect()
    }

    fn reverse<T: Element>(&self, mut items: Vec<T>) -> Vec<T> {
        items.reverse();
        items
    }

    fn sort<T: Element>(&self, mut items: Vec<T>, less: &Comparator<T>) -> Vec<T> {
        heap_sort(&mut items, &**less);
        items
    }
}
