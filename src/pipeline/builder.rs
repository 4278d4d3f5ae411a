//! Pipeline values and their construction.
//!
//! A [`Pipeline`] is an immutable handle on a chain of stages. Building one
//! runs nothing: construction wraps the source in a materialize closure,
//! and every operation wraps its parent's closure in a new one. A terminal
//! call runs the whole chain once.
//!
//! # Example
//!
//! ```rust
//! use flowline::Pipeline;
//!
//! let result = Pipeline::of(vec![1, 2, 3, 4])
//!     .filter(|x| *x > 2)
//!     .map(|x| x + 1)
//!     .reverse()
//!     .sorted(|a, b| a < b)
//!     .skip(1)
//!     .to_vec();
//! assert_eq!(result, vec![5]);
//! ```

use super::descriptor::{self, Operation, OperationDescriptor, OperationTag};
use super::stage::Element;
use crate::config::ParallelConfig;
use crate::engine::{Engine, Executor};
use crate::errors::{PipelineError, Result};
use im::Vector;
use log::debug;
use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

type Materialize<T> = Arc<dyn Fn() -> Vec<T> + Send + Sync>;

/// Rebuilds the root pipeline on a given engine from freshly materialized source data.
type Seed = Arc<dyn Fn(Engine) -> Box<dyn Any> + Send + Sync>;

/// A lazily evaluated chain of stages over items of type `T`.
///
/// Cloning is cheap: clones share the captured stages and source.
pub struct Pipeline<T> {
    pub(super) engine: Engine,
    pub(super) eval: Materialize<T>,
    pub(super) seed: Seed,
    pub(super) log: Vector<OperationDescriptor>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            eval: Arc::clone(&self.eval),
            seed: Arc::clone(&self.seed),
            log: self.log.clone(),
        }
    }
}

impl<T: Element> Pipeline<T> {
    /// Sequential pipeline over `items`.
    pub fn of<I: IntoIterator<Item = T>>(items: I) -> Self {
        Self::from_vec(items.into_iter().collect())
    }

    /// Sequential pipeline over an existing vector.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::on_engine(Engine::sequential(), items)
    }

    /// Parallel pipeline over `items` with `degree` workers.
    pub fn of_parallel<I: IntoIterator<Item = T>>(degree: usize, items: I) -> Result<Self> {
        Self::from_vec_parallel(degree, items.into_iter().collect())
    }

    /// Parallel pipeline over an existing vector with `degree` workers.
    pub fn from_vec_parallel(degree: usize, items: Vec<T>) -> Result<Self> {
        Ok(Self::on_engine(Engine::parallel(degree)?, items))
    }

    /// Pipeline on whichever engine `config` selects.
    pub fn with_config(config: &ParallelConfig, items: Vec<T>) -> Result<Self> {
        Ok(Self::on_engine(Engine::from_config(config)?, items))
    }

    /// Pipeline over `items` on an explicit engine.
    pub fn on_engine(engine: Engine, items: Vec<T>) -> Self {
        Self::shared(engine, Arc::new(items))
    }

    /// Sequential pipeline over the concatenated output of `pipelines`.
    ///
    /// Each input pipeline is evaluated, in order, whenever the result is.
    pub fn concat<I: IntoIterator<Item = Pipeline<T>>>(pipelines: I) -> Self {
        Self::concat_on(Engine::sequential(), pipelines)
    }

    /// Parallel form of [`Pipeline::concat`].
    pub fn concat_parallel<I>(degree: usize, pipelines: I) -> Result<Self>
    where
        I: IntoIterator<Item = Pipeline<T>>,
    {
        Ok(Self::concat_on(Engine::parallel(degree)?, pipelines))
    }

    fn concat_on<I: IntoIterator<Item = Pipeline<T>>>(engine: Engine, pipelines: I) -> Self {
        let parts: Vec<Pipeline<T>> = pipelines.into_iter().collect();
        Self::rooted(engine, move || parts.iter().flat_map(Pipeline::to_vec).collect())
    }

    fn shared(engine: Engine, data: Arc<Vec<T>>) -> Self {
        Self::rooted(engine, move || data.as_ref().clone())
    }

    fn rooted<S>(engine: Engine, source: S) -> Self
    where
        S: Fn() -> Vec<T> + Send + Sync + 'static,
    {
        let source = Arc::new(source);
        let reseed = Arc::clone(&source);
        let seed: Seed = Arc::new(move |engine| {
            let data = Arc::new(reseed());
            Box::new(Pipeline::shared(engine, data)) as Box<dyn Any>
        });
        Self {
            engine,
            eval: source,
            seed,
            log: Vector::new(),
        }
    }

    /// Append a stage that runs `stage` on the parent's output.
    pub(super) fn then<U, F>(&self, operation: Operation<T, U>, stage: F) -> Pipeline<U>
    where
        U: Element,
        F: Fn(&Engine, Vec<T>) -> Vec<U> + Send + Sync + 'static,
    {
        let upstream = Arc::clone(&self.eval);
        let engine = self.engine.clone();
        let mut log = self.log.clone();
        log.push_back(OperationDescriptor::new(operation));
        Pipeline {
            engine: self.engine.clone(),
            eval: Arc::new(move || stage(&engine, upstream())),
            seed: Arc::clone(&self.seed),
            log,
        }
    }

    /// Same chain, run by `degree` workers.
    ///
    /// Materializes the root source once, then replays every recorded
    /// operation onto a parallel pipeline over that data. A pipeline that
    /// already runs with `degree` workers is returned as is.
    pub fn to_parallel(&self, degree: usize) -> Result<Self> {
        if self.concurrency().map(NonZeroUsize::get) == Some(degree) {
            return Ok(self.clone());
        }
        self.to_engine(Engine::parallel(degree)?)
    }

    /// Same chain, run on the calling thread.
    ///
    /// A sequential pipeline is returned as is.
    pub fn to_sequential(&self) -> Result<Self> {
        if !self.is_parallel() {
            return Ok(self.clone());
        }
        self.to_engine(Engine::sequential())
    }

    /// Replay this chain onto `engine`.
    pub fn to_engine(&self, engine: Engine) -> Result<Self> {
        debug!(
            "Switching pipeline from {} to {} engine, replaying {} operations",
            self.engine.name(),
            engine.name(),
            self.log.len()
        );
        let root = (self.seed)(engine);
        descriptor::replay(&self.log, root)?
            .downcast::<Self>()
            .map(|pipeline| *pipeline)
            .map_err(|_| PipelineError::ReplayOutputMismatch)
    }

    pub fn is_parallel(&self) -> bool {
        self.engine.is_parallel()
    }

    /// Worker count of a parallel pipeline.
    pub fn concurrency(&self) -> Option<NonZeroUsize> {
        self.engine.concurrency()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Tags of the recorded operations, oldest first.
    pub fn operations(&self) -> Vec<OperationTag> {
        self.log.iter().map(OperationDescriptor::tag).collect()
    }

    pub fn stage_count(&self) -> usize {
        self.log.len()
    }
}

impl<T: Element> FromIterator<T> for Pipeline<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::of(iter)
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operations: Vec<_> = self.log.iter().map(OperationDescriptor::tag).collect();
        f.debug_struct("Pipeline")
            .field("engine", &self.engine)
            .field("operations", &operations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_construction_preserves_order() {
        assert_eq!(Pipeline::of(['a', 'b', 'c']).to_vec(), vec!['a', 'b', 'c']);
        assert_eq!(Pipeline::from_vec(vec![3, 1, 2]).to_vec(), vec![3, 1, 2]);
    }

    #[test]
    fn test_parallel_construction() {
        let pipeline = Pipeline::of_parallel(2, 1..=4).unwrap();
        assert!(pipeline.is_parallel());
        assert_eq!(pipeline.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_degree_fails() {
        assert!(matches!(
            Pipeline::of_parallel(0, vec![1]),
            Err(PipelineError::InvalidConcurrency { degree: 0 })
        ));
    }

    #[test]
    fn test_from_iterator() {
        let pipeline: Pipeline<u8> = (1..4).collect();
        assert_eq!(pipeline.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_concat_mixes_engines() {
        let pipeline = Pipeline::concat_parallel(
            2,
            vec![
                Pipeline::of(vec![1, 2, 3, 4]),
                Pipeline::of_parallel(2, vec![5, 6, 7, 8]).unwrap(),
            ],
        )
        .unwrap();
        assert!(pipeline.is_parallel());
        assert_eq!(pipeline.to_vec(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_operations_are_recorded() {
        let pipeline = Pipeline::of(vec![1, 2, 3])
            .filter_ordered(|x| *x > 1)
            .map_ordered(|x| x.to_string())
            .limit(1);
        assert_eq!(
            pipeline.operations(),
            vec![
                OperationTag::FilterOrdered,
                OperationTag::MapOrdered,
                OperationTag::Limit
            ]
        );
        assert_eq!(pipeline.stage_count(), 3);
    }

    #[test]
    fn test_original_is_not_mutated() {
        let root = Pipeline::of(vec![1, 2, 3]);
        let _derived = root.map(|x| x * 2).reverse();
        assert_eq!(root.to_vec(), vec![1, 2, 3]);
        assert!(root.operations().is_empty());
    }

    #[test]
    fn test_to_sequential_on_sequential_is_identity() {
        let pipeline = Pipeline::of(vec![1, 2]).skip(1);
        let same = pipeline.to_sequential().unwrap();
        assert!(!same.is_parallel());
        assert_eq!(same.to_vec(), vec![2]);
    }

    #[test]
    fn test_to_parallel_same_degree_skips_materialization() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        let source = Pipeline::of(vec![1, 2, 3]).peek(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let parallel = Pipeline::concat_parallel(2, vec![source]).unwrap();
        let same = parallel.to_parallel(2).unwrap();
        assert_eq!(evaluations.load(Ordering::SeqCst), 0);
        assert_eq!(same.concurrency().map(NonZeroUsize::get), Some(2));
    }

    #[test]
    fn test_switch_materializes_source_once() {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluations);
        let source = Pipeline::of(vec![1, 2, 3]).peek(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let parallel = Pipeline::concat(vec![source])
            .map(|x| x * 2)
            .to_parallel(2)
            .unwrap();
        // The source ran eagerly during the switch.
        assert_eq!(evaluations.load(Ordering::SeqCst), 3);

        assert_eq!(parallel.map(|x| x).to_sequential().unwrap().to_vec().len(), 3);
        assert_eq!(parallel.operations(), vec![OperationTag::Map]);
    }

    #[test]
    fn test_switch_round_trip_keeps_ordered_result() {
        let pipeline = Pipeline::of(1..=10)
            .filter_ordered(|x| x % 2 == 0)
            .map_ordered(|x| x * 3)
            .flat_map_ordered(|x| vec![x, x + 1])
            .skip(1)
            .limit(6);
        let expected = pipeline.to_vec();
        let switched = pipeline.to_parallel(2).unwrap().to_sequential().unwrap();
        assert_eq!(switched.to_vec(), expected);
        assert_eq!(switched.operations(), pipeline.operations());
    }

    #[test]
    fn test_switch_replays_every_operation() {
        let visits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visits);
        let pipeline = Pipeline::of(vec![3, 1, 2, 3, 5])
            .distinct(|x| *x)
            .filter(|x| *x > 1)
            .filter_ordered(|x| *x < 100)
            .flat_map(|x| vec![x, x + 10])
            .flat_map_ordered(|x| vec![x])
            .limit(10)
            .map(|x: i32| x.to_string())
            .map_ordered(|s| format!("n{s}"))
            .peek(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .reverse()
            .skip(0)
            .sorted(|a, b| a < b);
        let expected = vec!["n12", "n13", "n15", "n2", "n3", "n5"];
        assert_eq!(pipeline.to_vec(), expected);

        let parallel = pipeline.to_parallel(3).unwrap();
        assert!(parallel.is_parallel());
        assert_eq!(parallel.operations(), OperationTag::ALL.to_vec());
        assert_eq!(parallel.to_vec(), expected);

        let sequential = parallel.to_sequential().unwrap();
        assert!(!sequential.is_parallel());
        assert_eq!(sequential.operations(), OperationTag::ALL.to_vec());
        assert_eq!(sequential.to_vec(), expected);

        // The replayed peek is the same consumer: one visit per item per evaluation.
        assert_eq!(visits.load(Ordering::SeqCst), 18);
    }

    #[test]
    fn test_on_engine_reuses_worker_pool() {
        let engine = Engine::parallel(2).unwrap();
        let workers = Arc::new(std::sync::Mutex::new(std::collections::HashSet::new()));
        for _ in 0..3 {
            let seen = Arc::clone(&workers);
            Pipeline::on_engine(engine.clone(), (0..8).collect()).for_each(move |_: &i32| {
                seen.lock().unwrap().insert(std::thread::current().id());
            });
        }
        assert!(workers.lock().unwrap().len() <= 2);
    }

    #[test]
    fn test_change_degree_rebuilds() {
        let pipeline = Pipeline::of_parallel(2, vec![3, 1, 2])
            .unwrap()
            .sorted(|a, b| a < b);
        let wider = pipeline.to_parallel(4).unwrap();
        assert_eq!(wider.concurrency().map(NonZeroUsize::get), Some(4));
        assert_eq!(wider.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_debug_lists_operations() {
        let pipeline = Pipeline::of(vec![1]).reverse();
        let rendered = format!("{:?}", pipeline);
        assert!(rendered.contains("Reverse"));
    }
}
