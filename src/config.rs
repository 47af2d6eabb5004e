//! Engine configuration.
//!
//! Loaded from an optional `config.toml` merged with `PATHQL_*`-prefixed
//! environment variables via [`figment`], with [`Default`] covering the
//! no-file case so library callers never have to ship a config file.
//!
//! ## Example
//!
//! ```bash
//! PATHQL_MAX_ITERATIONS=10000 PATHQL_LOG_FIXED_POINT_PROGRESS=true cargo test
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Soft cap on the number of outer iterations a fixed-point loop
    /// (transitive closure squaring, Hellings worklist drain, tensor CFPQ
    /// saturation) may take before returning `IterationLimitExceeded`.
    /// `None` means unbounded (rely on monotone growth to terminate).
    #[serde(default)]
    pub max_iterations: Option<usize>,

    /// Default value for `sort_states` when a caller does not specify it
    /// explicitly when building a decomposition.
    #[serde(default = "default_sort_states")]
    pub sort_states_default: bool,

    /// Emit a `tracing::debug!` per outer fixed-point iteration with the
    /// current nnz / triple count.
    #[serde(default)]
    pub log_fixed_point_progress: bool,
}

fn default_sort_states() -> bool {
    false
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_iterations: None,
            sort_states_default: default_sort_states(),
            log_fixed_point_progress: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration layering `config.toml` (if present) under
    /// `PATHQL_*` environment variables, falling back to [`Default`] for
    /// anything unset in either layer.
    pub fn load() -> figment::error::Result<Self> {
        Figment::from(figment::providers::Serialized::defaults(
            EngineConfig::default(),
        ))
        .merge(Toml::file("config.toml"))
        .merge(Env::prefixed("PATHQL_"))
        .extract()
    }
}
