//! Intermediate operations.
//!
//! Each call returns a new pipeline with one more stage and one more
//! descriptor; `self` is left untouched. The `*_with` forms take callbacks
//! already wrapped in `Arc` and are what descriptor replay calls back into.

use super::builder::Pipeline;
use super::descriptor::Operation;
use super::stage::{Comparator, Consumer, Element, FlatMapper, KeyFn, Mapper, Order, Predicate};
use crate::engine::{Engine, Executor};
use std::hash::Hash;
use std::sync::Arc;

/// Deduplication with its key type erased, so it can sit in the descriptor log.
pub(crate) trait DistinctBy<T>: Send + Sync {
    fn apply(&self, engine: &Engine, items: Vec<T>) -> Vec<T>;
}

struct KeyedDistinct<T, K> {
    key: KeyFn<T, K>,
}

impl<T, K> DistinctBy<T> for KeyedDistinct<T, K>
where
    T: Element,
    K: Hash + Eq + Send + 'static,
{
    fn apply(&self, engine: &Engine, items: Vec<T>) -> Vec<T> {
        engine.distinct(items, &self.key)
    }
}

impl<T: Element> Pipeline<T> {
    /// Keep one item per key.
    ///
    /// The sequential engine keeps the first occurrence and preserves input
    /// order. The parallel engine keeps an arbitrary occurrence and returns
    /// survivors in unspecified order.
    pub fn distinct<K, F>(&self, key: F) -> Self
    where
        K: Hash + Eq + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.distinct_with(Arc::new(KeyedDistinct {
            key: Arc::new(key) as KeyFn<T, K>,
        }))
    }

    pub(crate) fn distinct_with(&self, dedup: Arc<dyn DistinctBy<T>>) -> Self {
        let stage = Arc::clone(&dedup);
        self.then(Operation::Distinct(dedup), move |engine, items| {
            stage.apply(engine, items)
        })
    }

    /// Keep items matching `predicate`; parallel output order is unspecified.
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter_with(Arc::new(predicate), Order::Unordered)
    }

    /// Keep items matching `predicate`, preserving input order.
    pub fn filter_ordered<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter_with(Arc::new(predicate), Order::Ordered)
    }

    pub(crate) fn filter_with(&self, predicate: Predicate<T>, order: Order) -> Self {
        let operation = match order {
            Order::Unordered => Operation::Filter(Arc::clone(&predicate)),
            Order::Ordered => Operation::FilterOrdered(Arc::clone(&predicate)),
        };
        self.then(operation, move |engine, items| {
            engine.filter(items, &predicate, order)
        })
    }

    /// Expand each item into zero or more items; parallel output order is unspecified.
    pub fn flat_map<U, I, F>(&self, mapper: F) -> Pipeline<U>
    where
        U: Element,
        I: IntoIterator<Item = U> + 'static,
        F: Fn(T) -> I + Send + Sync + 'static,
    {
        self.flat_map_with(into_vec_mapper(mapper), Order::Unordered)
    }

    /// Expand each item, keeping the expansions in input order.
    pub fn flat_map_ordered<U, I, F>(&self, mapper: F) -> Pipeline<U>
    where
        U: Element,
        I: IntoIterator<Item = U> + 'static,
        F: Fn(T) -> I + Send + Sync + 'static,
    {
        self.flat_map_with(into_vec_mapper(mapper), Order::Ordered)
    }

    pub(crate) fn flat_map_with<U: Element>(
        &self,
        mapper: FlatMapper<T, U>,
        order: Order,
    ) -> Pipeline<U> {
        let operation = match order {
            Order::Unordered => Operation::FlatMap(Arc::clone(&mapper)),
            Order::Ordered => Operation::FlatMapOrdered(Arc::clone(&mapper)),
        };
        self.then(operation, move |engine, items| {
            engine.flat_map(items, &mapper, order)
        })
    }

    /// Keep at most the first `count` items.
    pub fn limit(&self, count: usize) -> Self {
        self.then(Operation::Limit(count), move |_, mut items| {
            items.truncate(count);
            items
        })
    }

    /// Transform each item; parallel output order is unspecified.
    pub fn map<U, F>(&self, mapper: F) -> Pipeline<U>
    where
        U: Element,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_with(Arc::new(mapper), Order::Unordered)
    }

    /// Transform each item, preserving input order.
    pub fn map_ordered<U, F>(&self, mapper: F) -> Pipeline<U>
    where
        U: Element,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.map_with(Arc::new(mapper), Order::Ordered)
    }

    pub(crate) fn map_with<U: Element>(&self, mapper: Mapper<T, U>, order: Order) -> Pipeline<U> {
        let operation = match order {
            Order::Unordered => Operation::Map(Arc::clone(&mapper)),
            Order::Ordered => Operation::MapOrdered(Arc::clone(&mapper)),
        };
        self.then(operation, move |engine, items| {
            engine.map(items, &mapper, order)
        })
    }

    /// Run `consumer` on every item as it passes through.
    ///
    /// The side effect happens on every evaluation of the pipeline.
    pub fn peek<C>(&self, consumer: C) -> Self
    where
        C: Fn(&T) + Send + Sync + 'static,
    {
        self.peek_with(Arc::new(consumer))
    }

    pub(crate) fn peek_with(&self, consumer: Consumer<T>) -> Self {
        let stage = Arc::clone(&consumer);
        self.then(Operation::Peek(consumer), move |engine, items| {
            engine.peek(items, &stage)
        })
    }

    pub fn reverse(&self) -> Self {
        self.then(Operation::Reverse, |engine, items| engine.reverse(items))
    }

    /// Drop the first `count` items; empty if `count` reaches the length.
    pub fn skip(&self, count: usize) -> Self {
        self.then(Operation::Skip(count), move |_, mut items| {
            let count = count.min(items.len());
            items.drain(..count);
            items
        })
    }

    /// Sort ascending under the strict "less-than" `less`.
    ///
    /// Stable on the parallel engine (merge sort), unstable on the
    /// sequential engine (heap sort).
    pub fn sorted<C>(&self, less: C) -> Self
    where
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.sorted_with(Arc::new(less))
    }

    pub(crate) fn sorted_with(&self, less: Comparator<T>) -> Self {
        let stage = Arc::clone(&less);
        self.then(Operation::Sorted(less), move |engine, items| {
            engine.sort(items, &stage)
        })
    }
}

fn into_vec_mapper<T, U, I, F>(mapper: F) -> FlatMapper<T, U>
where
    I: IntoIterator<Item = U> + 'static,
    F: Fn(T) -> I + Send + Sync + 'static,
    T: 'static,
    U: 'static,
{
    Arc::new(move |item: T| -> Vec<U> { mapper(item).into_iter().collect() })
}
