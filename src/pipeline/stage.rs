//! Shared vocabulary for pipeline stages.
//!
//! Callbacks are stored behind `Arc` so a stage can be handed to many
//! workers and recorded for replay at the same time.

use std::sync::Arc;

/// Bound for items flowing through a pipeline.
///
/// Items are cloned out of the root source on every evaluation and moved
/// into worker threads by the parallel engine.
pub trait Element: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Element for T {}

/// Keep/drop test for filter and the match predicates.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// One-to-one transform.
pub type Mapper<T, U> = Arc<dyn Fn(T) -> U + Send + Sync>;

/// One-to-many transform.
pub type FlatMapper<T, U> = Arc<dyn Fn(T) -> Vec<U> + Send + Sync>;

/// Side-effecting visitor used by peek and for_each.
pub type Consumer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Strict "less-than" ordering.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Identity function for distinct.
pub type KeyFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Whether a stage must preserve input order.
///
/// Only the parallel engine distinguishes the two; the sequential engine
/// always preserves order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Output is any permutation of the ordered result.
    Unordered,
    /// Output order follows input order.
    Ordered,
}
