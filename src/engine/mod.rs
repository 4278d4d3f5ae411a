//! Execution engines for pipeline stages.
//!
//! Both engines implement [`Executor`], the capability set every stage is
//! expressed in. [`SequentialExecutor`] runs stages in plain iteration
//! order. [`ParallelExecutor`] runs one worker per item in bounded batches.
//! [`Engine`] is what a pipeline carries: one of the two, chosen at
//! construction and swapped only through replay.

pub(crate) mod correlation;
mod parallel;
mod sequential;

pub use parallel::ParallelExecutor;
pub use sequential::SequentialExecutor;

use crate::config::ParallelConfig;
use crate::errors::Result;
use crate::pipeline::{Comparator, Consumer, Element, FlatMapper, KeyFn, Mapper, Order, Predicate};
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Operations whose execution differs between engines.
///
/// Stages that are the same everywhere (limit, skip, reductions, lookups)
/// are not part of this trait; the pipeline runs them directly.
pub trait Executor: Clone + Send + Sync + 'static {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// True if every item matches. An empty input never matches.
    fn all_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool;

    fn any_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool;

    fn none_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        !self.any_match(items, predicate)
    }

    fn filter<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>, order: Order) -> Vec<T>;

    fn map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &Mapper<T, U>,
        order: Order,
    ) -> Vec<U>;

    fn flat_map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &FlatMapper<T, U>,
        order: Order,
    ) -> Vec<U>;

    /// Run `consumer` on every item and hand the items back in input order.
    fn peek<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) -> Vec<T>;

    fn for_each<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>);

    /// Keep one item per key.
    fn distinct<T, K>(&self, items: Vec<T>, key: &KeyFn<T, K>) -> Vec<T>
    where
        T: Element,
        K: Hash + Eq + Send + 'static;

    fn reverse<T: Element>(&self, items: Vec<T>) -> Vec<T>;

    fn sort<T: Element>(&self, items: Vec<T>, less: &Comparator<T>) -> Vec<T>;
}

/// The engine a pipeline runs on.
#[derive(Debug, Clone)]
pub enum Engine {
    Sequential(SequentialExecutor),
    Parallel(ParallelExecutor),
}

impl Engine {
    pub fn sequential() -> Self {
        Self::Sequential(SequentialExecutor)
    }

    /// A parallel engine with `degree` workers.
    ///
    /// Fails with [`PipelineError::InvalidConcurrency`](crate::PipelineError::InvalidConcurrency)
    /// when `degree` is zero.
    pub fn parallel(degree: usize) -> Result<Self> {
        ParallelExecutor::new(degree).map(Self::Parallel)
    }

    /// Pick an engine from configuration.
    pub fn from_config(config: &ParallelConfig) -> Result<Self> {
        config.validate()?;
        if !config.enabled {
            return Ok(Self::sequential());
        }
        ParallelExecutor::with_sort_cutoff(config.effective_concurrency().get(), config.sort_cutoff)
            .map(Self::Parallel)
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Parallel(_))
    }

    /// Worker count for a parallel engine, `None` for the sequential one.
    pub fn concurrency(&self) -> Option<NonZeroUsize> {
        match self {
            Self::Sequential(_) => None,
            Self::Parallel(executor) => Some(executor.degree()),
        }
    }
}

macro_rules! dispatch {
    ($engine:expr, $executor:ident => $call:expr) => {
        match $engine {
            Engine::Sequential($executor) => $call,
            Engine::Parallel($executor) => $call,
        }
    };
}

impl Executor for Engine {
    fn name(&self) -> &'static str {
        dispatch!(self, e => e.name())
    }

    fn all_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        dispatch!(self, e => e.all_match(items, predicate))
    }

    fn any_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        dispatch!(self, e => e.any_match(items, predicate))
    }

    fn none_match<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>) -> bool {
        dispatch!(self, e => e.none_match(items, predicate))
    }

    fn filter<T: Element>(&self, items: Vec<T>, predicate: &Predicate<T>, order: Order) -> Vec<T> {
        dispatch!(self, e => e.filter(items, predicate, order))
    }

    fn map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &Mapper<T, U>,
        order: Order,
    ) -> Vec<U> {
        dispatch!(self, e => e.map(items, mapper, order))
    }

    fn flat_map<T: Element, U: Element>(
        &self,
        items: Vec<T>,
        mapper: &FlatMapper<T, U>,
        order: Order,
    ) -> Vec<U> {
        dispatch!(self, e => e.flat_map(items, mapper, order))
    }

    fn peek<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) -> Vec<T> {
        dispatch!(self, e => e.peek(items, consumer))
    }

    fn for_each<T: Element>(&self, items: Vec<T>, consumer: &Consumer<T>) {
        dispatch!(self, e => e.for_each(items, consumer))
    }

    fn distinct<T, K>(&self, items: Vec<T>, key: &KeyFn<T, K>) -> Vec<T>
    where
        T: Element,
        K: Hash + Eq + Send + 'static,
    {
        dispatch!(self, e => e.distinct(items, key))
    }

    fn reverse<T: Element>(&self, items: Vec<T>) -> Vec<T> {
        dispatch!(self, e => e.reverse(items))
    }

    fn sort<T: Element>(&self, items: Vec<T>, less: &Comparator<T>) -> Vec<T> {
        dispatch!(self, e => e.sort(items, less))
    }
}
