//! Parallelism configuration for pipeline execution.
//!
//! This module controls which engine a configured pipeline starts on and
//! how far the concurrent merge sort recurses before switching to a
//! sequential sort.

use crate::errors::{PipelineError, Result};
use crate::sort::DEFAULT_SORT_CUTOFF;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Default value for parallel processing enabled
fn default_enabled() -> bool {
    true
}

fn default_sort_cutoff() -> usize {
    DEFAULT_SORT_CUTOFF
}

/// Configuration for parallel pipeline execution.
///
/// When `enabled` is false, [`Pipeline::with_config`](crate::Pipeline::with_config)
/// builds a sequential pipeline and `max_concurrency` is ignored.
///
/// # Example
///
/// ```rust
/// use flowline::config::ParallelConfig;
///
/// let config = ParallelConfig {
///     enabled: true,
///     max_concurrency: Some(4),
///     sort_cutoff: 64,
/// };
/// assert_eq!(config.effective_concurrency().get(), 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelConfig {
    /// Enable parallel processing (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of workers in flight at once (default: num_cpus)
    ///
    /// Zero is rejected by [`ParallelConfig::validate`].
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Slice length at or below which merge sort stops splitting (default: 32)
    #[serde(default = "default_sort_cutoff")]
    pub sort_cutoff: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrency: None,
            sort_cutoff: default_sort_cutoff(),
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config with parallel processing disabled.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Create a config with a fixed number of workers.
    pub fn with_concurrency(degree: usize) -> Self {
        Self {
            max_concurrency: Some(degree),
            ..Default::default()
        }
    }

    /// Parse a config from TOML text.
    ///
    /// ```rust
    /// use flowline::config::ParallelConfig;
    ///
    /// let config = ParallelConfig::from_toml_str("max_concurrency = 3").unwrap();
    /// assert!(config.enabled);
    /// assert_eq!(config.max_concurrency, Some(3));
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no engine can run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == Some(0) {
            return Err(PipelineError::InvalidConcurrency { degree: 0 });
        }
        if self.sort_cutoff == 0 {
            return Err(PipelineError::config("sort_cutoff must be at least 1"));
        }
        Ok(())
    }

    /// Get the effective concurrency level.
    ///
    /// Returns the configured max_concurrency, or the number of
    /// available CPU cores if not specified or zero.
    pub fn effective_concurrency(&self) -> NonZeroUsize {
        self.max_concurrency
            .and_then(NonZeroUsize::new)
            .unwrap_or_else(num_cpus)
    }
}

/// Returns the number of available CPU cores.
fn num_cpus() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
