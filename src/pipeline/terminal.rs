//! Terminal operations.
//!
//! Each call evaluates the whole chain once and returns a plain value.
//! Nothing is cached, so calling two terminals runs every stage twice.

use super::builder::Pipeline;
use super::stage::{Consumer, Element, Predicate};
use crate::engine::Executor;
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

impl<T: Element> Pipeline<T> {
    /// Materialize the chain.
    pub fn to_vec(&self) -> Vec<T> {
        (self.eval)()
    }

    /// Materialize into any collection.
    pub fn collect<C: FromIterator<T>>(&self) -> C {
        self.to_vec().into_iter().collect()
    }

    /// Materialize into a key/value map; later items overwrite earlier ones.
    pub fn to_map<K, V, KF, VF>(&self, key: KF, value: VF) -> HashMap<K, V>
    where
        K: Hash + Eq,
        KF: Fn(&T) -> K,
        VF: Fn(&T) -> V,
    {
        self.collect_map(key, value)
    }

    /// Materialize into any collection of key/value pairs.
    pub fn collect_map<K, V, M, KF, VF>(&self, key: KF, value: VF) -> M
    where
        M: FromIterator<(K, V)>,
        KF: Fn(&T) -> K,
        VF: Fn(&T) -> V,
    {
        self.to_vec()
            .iter()
            .map(|item| (key(item), value(item)))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.to_vec().len()
    }

    /// True if every item matches. An empty pipeline never matches.
    pub fn all_match<P>(&self, predicate: P) -> bool
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate: Predicate<T> = Arc::new(predicate);
        self.engine.all_match(self.to_vec(), &predicate)
    }

    pub fn any_match<P>(&self, predicate: P) -> bool
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate: Predicate<T> = Arc::new(predicate);
        self.engine.any_match(self.to_vec(), &predicate)
    }

    pub fn none_match<P>(&self, predicate: P) -> bool
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate: Predicate<T> = Arc::new(predicate);
        self.engine.none_match(self.to_vec(), &predicate)
    }

    pub fn find_first(&self) -> Option<T> {
        self.to_vec().into_iter().next()
    }

    /// A uniformly random item, if any.
    pub fn find_any(&self) -> Option<T> {
        let mut items = self.to_vec();
        if items.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..items.len());
        Some(items.swap_remove(index))
    }

    /// Run `consumer` on every item; concurrently on the parallel engine.
    pub fn for_each<C>(&self, consumer: C)
    where
        C: Fn(&T) + Send + Sync + 'static,
    {
        let consumer: Consumer<T> = Arc::new(consumer);
        self.engine.for_each(self.to_vec(), &consumer);
    }

    /// Largest item under `less`; the last one among equals.
    pub fn max<C>(&self, less: C) -> Option<T>
    where
        C: Fn(&T, &T) -> bool,
    {
        self.to_vec()
            .into_iter()
            .reduce(|best, item| if less(&item, &best) { best } else { item })
    }

    /// Smallest item under `less`; the first one among equals.
    pub fn min<C>(&self, less: C) -> Option<T>
    where
        C: Fn(&T, &T) -> bool,
    {
        self.to_vec()
            .into_iter()
            .reduce(|best, item| if less(&item, &best) { item } else { best })
    }

    /// Fold from `init`; returns `init` for an empty pipeline.
    pub fn reduce<U, F>(&self, init: U, reducer: F) -> U
    where
        F: Fn(U, T) -> U,
    {
        self.to_vec().into_iter().fold(init, reducer)
    }

    /// Fold where each step computes `combiner(acc, reducer(&acc, item))`.
    pub fn reduce_with_combiner<U, R, C>(&self, init: U, reducer: R, combiner: C) -> U
    where
        R: Fn(&U, T) -> U,
        C: Fn(U, U) -> U,
    {
        self.to_vec().into_iter().fold(init, |acc, item| {
            let partial = reducer(&acc, item);
            combiner(acc, partial)
        })
    }

    /// Fold seeded with the first item; `None` for an empty pipeline.
    pub fn reduce_optional<F>(&self, reducer: F) -> Option<T>
    where
        F: Fn(T, T) -> T,
    {
        self.to_vec().into_iter().reduce(reducer)
    }
}
