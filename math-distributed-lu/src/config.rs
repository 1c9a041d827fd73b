//! Factorization settings

use serde::Serialize;

/// What to do when a round's pivot has an exactly-zero leading entry.
///
/// No row interchange is ever performed, so a zero pivot cannot be repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ZeroPivotPolicy {
    /// Log a warning, reduce with a zero multiplier and keep going. The
    /// resulting factors no longer reproduce the input matrix.
    #[default]
    Fallback,
    /// Stop the run with [`crate::LuError::DegeneratePivot`].
    Fail,
}

/// Factorization configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactorConfig {
    /// Zero pivot handling
    pub zero_pivot: ZeroPivotPolicy,
    /// Log progress every N rounds (0 = no output)
    pub progress_interval: usize,
}

impl FactorConfig {
    pub fn builder() -> FactorConfigBuilder {
        FactorConfigBuilder::new()
    }
}

/// Builder for [`FactorConfig`]
#[derive(Debug, Clone, Default)]
pub struct FactorConfigBuilder {
    cfg: FactorConfig,
}

impl FactorConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }
    /// Sets the zero pivot policy.
    pub fn zero_pivot(mut self, v: ZeroPivotPolicy) -> Self {
        self.cfg.zero_pivot = v;
        self
    }
    /// Shorthand for `zero_pivot(ZeroPivotPolicy::Fail)` when `fail` is set.
    pub fn fail_on_zero_pivot(self, fail: bool) -> Self {
        if fail {
            self.zero_pivot(ZeroPivotPolicy::Fail)
        } else {
            self.zero_pivot(ZeroPivotPolicy::Fallback)
        }
    }
    /// Sets the progress logging interval in rounds.
    pub fn progress_interval(mut self, v: usize) -> Self {
        self.cfg.progress_interval = v;
        self
    }
    pub fn build(self) -> FactorConfig {
        self.cfg
    }
}
