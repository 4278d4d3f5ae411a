//! Comparator-driven sorting used by the `sorted` stage.
//!
//! Both sorts take a strict "less-than" comparator. The parallel engine
//! uses [`merge_sort`], which is stable and splits work with `rayon::join`.
//! The sequential engine uses [`heap_sort`], which sorts in place and is
//! not stable. A comparator that is not a strict weak order produces an
//! unspecified permutation of the input, never a panic or a lost element.

mod heap;
mod merge;

pub use heap::heap_sort;
pub use merge::{merge_sort, merge_sort_with_cutoff};

/// Slice length at or below which [`merge_sort`] sorts sequentially.
pub const DEFAULT_SORT_CUTOFF: usize = 32;
