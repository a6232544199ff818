//! Engine configuration and per-invocation overrides

use crate::cancel::AbortSignal;

/// Engine-level defaults applied to every invocation.
///
/// Out of the box the engine runs items one at a time with memoization off;
/// both knobs can be raised per engine or overridden per invocation through
/// [`RunOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum simultaneously running subgraph invocations
    pub concurrency: usize,
    /// Whether per-item results are memoized
    pub caching: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            caching: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    /// Apply per-invocation overrides.
    ///
    /// An explicit override beats the configured default; a concurrency of
    /// zero (from either source) is clamped to one.
    pub fn resolve(&self, options: &RunOptions) -> ResolvedRun {
        ResolvedRun {
            concurrency: options.concurrency.unwrap_or(self.concurrency).max(1),
            caching: options.caching.unwrap_or(self.caching),
        }
    }
}

/// Per-invocation overrides and the optional external abort signal.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Override the configured concurrency limit
    pub concurrency: Option<usize>,
    /// Override whether caching is enabled
    pub caching: Option<bool>,
    /// External abort signal observed by this invocation; firing it is
    /// equivalent to an internal task failure tripping the latch
    pub signal: Option<AbortSignal>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = Some(caching);
        self
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRun {
    pub concurrency: usize,
    pub caching: bool,
}
