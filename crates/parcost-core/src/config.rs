//! Estimator configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::plan::Measure;

/// Iteration factor assumed for loops whose trip count is unknown.
pub const FACTOR_NUM_ITERATIONS: u64 = 10;
/// Default execution time of a leaf: 5ms.
pub const DEFAULT_TIME_ESTIMATE: f64 = 5.0;
/// Default memory consumption of a leaf: 1KB.
pub const DEFAULT_MEM_ESTIMATE: f64 = 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Trip count used for `For`/`Parfor` nodes without a `num_iterations` parameter.
    pub default_iterations: u64,

    /// Trip count assumed for every `While` loop.
    pub while_iterations: u64,

    /// Fallback leaf execution time (ms) handed out by leaf models.
    pub default_time_ms: f64,

    /// Fallback leaf memory (bytes) handed out by leaf models.
    pub default_mem_bytes: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            default_iterations: FACTOR_NUM_ITERATIONS,
            while_iterations: FACTOR_NUM_ITERATIONS,
            default_time_ms: DEFAULT_TIME_ESTIMATE,
            default_mem_bytes: DEFAULT_MEM_ESTIMATE,
        }
    }
}

impl EstimatorConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PARCOST_DEFAULT_ITERATIONS`: trip count for loops without one
    /// - `PARCOST_WHILE_ITERATIONS`: trip count for while loops
    /// - `PARCOST_DEFAULT_TIME_MS`: fallback leaf time
    /// - `PARCOST_DEFAULT_MEM_BYTES`: fallback leaf memory
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(s) = lookup("PARCOST_DEFAULT_ITERATIONS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.default_iterations = v;
            }
        }

        if let Some(s) = lookup("PARCOST_WHILE_ITERATIONS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.while_iterations = v;
            }
        }

        if let Some(s) = lookup("PARCOST_DEFAULT_TIME_MS") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.default_time_ms = v;
            }
        }

        if let Some(s) = lookup("PARCOST_DEFAULT_MEM_BYTES") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.default_mem_bytes = v;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_iterations == 0 {
            return Err(Error::Config("default_iterations must be positive".into()));
        }
        if self.while_iterations == 0 {
            return Err(Error::Config("while_iterations must be positive".into()));
        }
        for (name, v) in [
            ("default_time_ms", self.default_time_ms),
            ("default_mem_bytes", self.default_mem_bytes),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Config(format!(
                    "{name} must be a finite non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Fallback estimate for a leaf nobody knows anything about.
    pub fn default_estimate(&self, measure: Measure) -> f64 {
        match measure {
            Measure::ExecTime => self.default_time_ms,
            Measure::MemoryUsage => self.default_mem_bytes,
        }
    }
}
