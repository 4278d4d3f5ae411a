//! Replayable record of the stages applied to a pipeline.
//!
//! Every intermediate operation appends one [`OperationDescriptor`] to the
//! pipeline's log. Switching engines materializes the root source and
//! re-applies the log, in order, to a fresh pipeline on the target engine.
//!
//! Element types change across `map` and `flat_map`, so a log cannot be a
//! list of one concrete operation type. Each descriptor keeps its typed
//! [`Operation`] behind [`ReplayStage`], which takes and returns a boxed
//! pipeline and checks the element type on the way in.

use super::builder::Pipeline;
use super::ops::DistinctBy;
use super::stage::{Comparator, Consumer, Element, FlatMapper, Mapper, Order, Predicate};
use crate::errors::{PipelineError, Result};
use im::Vector;
use log::trace;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Name of a replayable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationTag {
    Distinct,
    Filter,
    FilterOrdered,
    FlatMap,
    FlatMapOrdered,
    Limit,
    Map,
    MapOrdered,
    Peek,
    Reverse,
    Skip,
    Sorted,
}

impl OperationTag {
    /// Every tag, in declaration order.
    pub const ALL: [OperationTag; 12] = [
        OperationTag::Distinct,
        OperationTag::Filter,
        OperationTag::FilterOrdered,
        OperationTag::FlatMap,
        OperationTag::FlatMapOrdered,
        OperationTag::Limit,
        OperationTag::Map,
        OperationTag::MapOrdered,
        OperationTag::Peek,
        OperationTag::Reverse,
        OperationTag::Skip,
        OperationTag::Sorted,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationTag::Distinct => "DISTINCT",
            OperationTag::Filter => "FILTER",
            OperationTag::FilterOrdered => "FILTER_ORDERED",
            OperationTag::FlatMap => "FLAT_MAP",
            OperationTag::FlatMapOrdered => "FLAT_MAP_ORDERED",
            OperationTag::Limit => "LIMIT",
            OperationTag::Map => "MAP",
            OperationTag::MapOrdered => "MAP_ORDERED",
            OperationTag::Peek => "PEEK",
            OperationTag::Reverse => "REVERSE",
            OperationTag::Skip => "SKIP",
            OperationTag::Sorted => "SORTED",
        }
    }

    /// True for the explicitly order-preserving variants.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            OperationTag::FilterOrdered | OperationTag::FlatMapOrdered | OperationTag::MapOrdered
        )
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationTag {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PipelineError::UnknownOperation(name.to_string()))
    }
}

/// A recorded stage with its captured parameters.
///
/// `U` is the output element type; it equals `T` for every operation except
/// the map and flat-map families.
pub(crate) enum Operation<T, U = T> {
    Distinct(Arc<dyn DistinctBy<T>>),
    Filter(Predicate<T>),
    FilterOrdered(Predicate<T>),
    FlatMap(FlatMapper<T, U>),
    FlatMapOrdered(FlatMapper<T, U>),
    Limit(usize),
    Map(Mapper<T, U>),
    MapOrdered(Mapper<T, U>),
    Peek(Consumer<T>),
    Reverse,
    Skip(usize),
    Sorted(Comparator<T>),
}

impl<T, U> Operation<T, U> {
    pub fn tag(&self) -> OperationTag {
        match self {
            Operation::Distinct(_) => OperationTag::Distinct,
            Operation::Filter(_) => OperationTag::Filter,
            Operation::FilterOrdered(_) => OperationTag::FilterOrdered,
            Operation::FlatMap(_) => OperationTag::FlatMap,
            Operation::FlatMapOrdered(_) => OperationTag::FlatMapOrdered,
            Operation::Limit(_) => OperationTag::Limit,
            Operation::Map(_) => OperationTag::Map,
            Operation::MapOrdered(_) => OperationTag::MapOrdered,
            Operation::Peek(_) => OperationTag::Peek,
            Operation::Reverse => OperationTag::Reverse,
            Operation::Skip(_) => OperationTag::Skip,
            Operation::Sorted(_) => OperationTag::Sorted,
        }
    }
}

/// Type-erased replay of one recorded operation.
pub(crate) trait ReplayStage: Send + Sync {
    /// Apply the operation to a boxed `Pipeline<T>`, producing a boxed `Pipeline<U>`.
    fn replay(&self, upstream: Box<dyn Any>) -> Result<Box<dyn Any>>;
}

impl<T: Element, U: Element> ReplayStage for Operation<T, U> {
    fn replay(&self, upstream: Box<dyn Any>) -> Result<Box<dyn Any>> {
        let pipeline = upstream
            .downcast::<Pipeline<T>>()
            .map_err(|_| PipelineError::ReplayTypeMismatch { tag: self.tag() })?;

        let replayed: Box<dyn Any> = match self {
            Operation::Distinct(dedup) => Box::new(pipeline.distinct_with(Arc::clone(dedup))),
            Operation::Filter(predicate) => {
                Box::new(pipeline.filter_with(Arc::clone(predicate), Order::Unordered))
            }
            Operation::FilterOrdered(predicate) => {
                Box::new(pipeline.filter_with(Arc::clone(predicate), Order::Ordered))
            }
            Operation::FlatMap(mapper) => {
                Box::new(pipeline.flat_map_with(Arc::clone(mapper), Order::Unordered))
            }
            Operation::FlatMapOrdered(mapper) => {
                Box::new(pipeline.flat_map_with(Arc::clone(mapper), Order::Ordered))
            }
            Operation::Limit(count) => Box::new(pipeline.limit(*count)),
            Operation::Map(mapper) => Box::new(pipeline.map_with(Arc::clone(mapper), Order::Unordered)),
            Operation::MapOrdered(mapper) => {
                Box::new(pipeline.map_with(Arc::clone(mapper), Order::Ordered))
            }
            Operation::Peek(consumer) => Box::new(pipeline.peek_with(Arc::clone(consumer))),
            Operation::Reverse => Box::new(pipeline.reverse()),
            Operation::Skip(count) => Box::new(pipeline.skip(*count)),
            Operation::Sorted(less) => Box::new(pipeline.sorted_with(Arc::clone(less))),
        };
        Ok(replayed)
    }
}

/// One entry of a pipeline's operation log.
#[derive(Clone)]
pub struct OperationDescriptor {
    tag: OperationTag,
    stage: Arc<dyn ReplayStage>,
}

impl OperationDescriptor {
    pub(crate) fn new<T: Element, U: Element>(operation: Operation<T, U>) -> Self {
        Self {
            tag: operation.tag(),
            stage: Arc::new(operation),
        }
    }

    pub fn tag(&self) -> OperationTag {
        self.tag
    }

    pub(crate) fn replay(&self, upstream: Box<dyn Any>) -> Result<Box<dyn Any>> {
        self.stage.replay(upstream)
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Re-apply `log` to `root`, oldest entry first.
pub(crate) fn replay(log: &Vector<OperationDescriptor>, root: Box<dyn Any>) -> Result<Box<dyn Any>> {
    log.iter().try_fold(root, |pipeline, descriptor| {
        trace!("Replaying {} operation", descriptor.tag());
        descriptor.replay(pipeline)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trips_through_text() {
        for tag in OperationTag::ALL {
            assert_eq!(tag.as_str().parse::<OperationTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_tag_parse_is_case_insensitive() {
        assert_eq!(
            " flat_map_ordered ".parse::<OperationTag>().unwrap(),
            OperationTag::FlatMapOrdered
        );
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = "SHUFFLE".parse::<OperationTag>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownOperation(ref name) if name == "SHUFFLE"));
    }

    #[test]
    fn test_tag_serde_names() {
        let json = serde_json::to_string(&OperationTag::MapOrdered).unwrap();
        assert_eq!(json, "\"MAP_ORDERED\"");
        let tags: Vec<OperationTag> = serde_json::from_str(r#"["SKIP","FLAT_MAP"]"#).unwrap();
        assert_eq!(tags, vec![OperationTag::Skip, OperationTag::FlatMap]);
    }

    #[test]
    fn test_ordered_tags() {
        let ordered: Vec<_> = OperationTag::ALL
            .into_iter()
            .filter(|tag| tag.is_ordered())
            .collect();
        assert_eq!(
            ordered,
            vec![
                OperationTag::FilterOrdered,
                OperationTag::FlatMapOrdered,
                OperationTag::MapOrdered
            ]
        );
    }

    #[test]
    fn test_replay_onto_wrong_element_type() {
        let descriptor = OperationDescriptor::new(Operation::<i32, i32>::Limit(1));
        let wrong = Box::new(Pipeline::of(vec!["a".to_string()]));
        let err = descriptor.replay(wrong).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ReplayTypeMismatch {
                tag: OperationTag::Limit
            }
        ));
    }

    #[test]
    fn test_replay_applies_operation() {
        let descriptor = OperationDescriptor::new(Operation::<i32, i32>::Skip(2));
        let replayed = descriptor.replay(Box::new(Pipeline::of(vec![1, 2, 3]))).unwrap();
        let pipeline = replayed.downcast::<Pipeline<i32>>().unwrap();
        assert_eq!(pipeline.to_vec(), vec![3]);
        assert_eq!(pipeline.operations(), vec![OperationTag::Skip]);
    }
}
