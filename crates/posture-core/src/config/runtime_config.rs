//! Assessment runtime configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Fetch every plan signal before evaluation starts. Default: false.
    pub preflight: Option<bool>,
    /// Evaluate independent controls of a dependency wave in parallel.
    /// Implies preflight. Default: false.
    pub parallel: Option<bool>,
    /// Ask the graph for question resolvers after evaluation. Default: true.
    pub collect_questions: Option<bool>,
}

impl RuntimeConfig {
    pub fn effective_parallel(&self) -> bool {
        self.parallel.unwrap_or(false)
    }

    pub fn effective_preflight(&self) -> bool {
        self.preflight.unwrap_or(false) || self.effective_parallel()
    }

    pub fn effective_collect_questions(&self) -> bool {
        self.collect_questions.unwrap_or(true)
    }
}
