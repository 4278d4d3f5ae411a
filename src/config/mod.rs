//! Configuration for pipeline engines.

mod parallel;

pub use parallel::ParallelConfig;
