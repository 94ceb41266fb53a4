//! Control graph configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GraphConfig {
    /// Reject dependency cycles at load instead of appending cyclic
    /// controls to the end of the plan. Default: false.
    pub strict_cycles: Option<bool>,
}

impl GraphConfig {
    pub fn effective_strict_cycles(&self) -> bool {
        self.strict_cycles.unwrap_or(false)
    }
}
