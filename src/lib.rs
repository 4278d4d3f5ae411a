//! Composable data-processing pipelines with interchangeable engines.
//!
//! A [`Pipeline`] is a lazily evaluated chain of stages over a finite
//! source. It runs either on the calling thread or on a bounded pool of
//! workers, and can be moved between the two at any point in the chain.
//!
//! ```rust
//! use flowline::Pipeline;
//!
//! let doubled = Pipeline::of_parallel(4, 1..=8)?
//!     .map_ordered(|x| x * 2)
//!     .filter_ordered(|x| x % 3 != 0)
//!     .to_vec();
//! assert_eq!(doubled, vec![2, 4, 8, 10, 14, 16]);
//! # Ok::<(), flowline::PipelineError>(())
//! ```

// Export modules for library usage
pub mod config;
pub mod engine;
pub mod errors;
pub mod pipeline;
pub mod sort;

// Re-export commonly used types
pub use crate::config::ParallelConfig;
pub use crate::engine::{Engine, Executor, ParallelExecutor, SequentialExecutor};
pub use crate::errors::{PipelineError, Result};
pub use crate::pipeline::{
    Comparator, Consumer, Element, FlatMapper, KeyFn, Mapper, OperationDescriptor, OperationTag,
    Order, Pipeline, Predicate,
};
pub use crate::sort::{heap_sort, merge_sort};
