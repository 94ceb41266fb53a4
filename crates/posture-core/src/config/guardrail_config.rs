//! Evidence and relationship guardrail configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How cost figures may appear in derived output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CostMode {
    /// Only Low/Medium/High labels; dollar amounts are violations.
    #[default]
    CategoryOnly,
    /// Figures come from a pricing tool and may be quoted.
    ToolBacked,
}

impl CostMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CategoryOnly => "category_only",
            Self::ToolBacked => "tool_backed",
        }
    }
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category_only" => Ok(Self::CategoryOnly),
            "tool_backed" => Ok(Self::ToolBacked),
            other => Err(format!(
                "unknown cost mode '{other}', expected category_only or tool_backed"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Cost figure policy. Default: "category_only".
    pub cost_mode: Option<String>,
    /// Require grounding items to look like `D07.01`. Default: true.
    pub enforce_checklist_format: Option<bool>,
}

impl GuardrailConfig {
    /// Unknown modes fall back to the strict default; `validate` rejects
    /// them before a config is handed out.
    pub fn effective_cost_mode(&self) -> CostMode {
        self.cost_mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    pub fn effective_enforce_checklist_format(&self) -> bool {
        self.enforce_checklist_format.unwrap_or(true)
    }
}
