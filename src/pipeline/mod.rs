//! Lazily evaluated, composable pipelines.
//!
//! A pipeline is built from a source, extended with intermediate
//! operations that each return a new pipeline, and evaluated by a terminal
//! operation. Every intermediate operation is also recorded so the chain
//! can be rebuilt on another engine.

mod builder;
mod descriptor;
mod ops;
mod stage;
mod terminal;

pub use builder::Pipeline;
pub use descriptor::{OperationDescriptor, OperationTag};
pub use stage::{Comparator, Consumer, Element, FlatMapper, KeyFn, Mapper, Order, Predicate};
