//! Closed vocabularies for control metadata.
//!
//! Every enumerated catalog field parses into one of these types. Parsing
//! is exact: `"Network"` is not `"network"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declares a closed string vocabulary: enum, `ALL`, `name`, `FromStr`, `Display`.
macro_rules! closed_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Allowed spellings, in declaration order.
            pub fn allowed() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.name()).collect()
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("'{}' not in {:?}", other, Self::allowed())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

closed_vocabulary! {
    /// Landing-zone design area a control belongs to.
    DesignArea {
        Network => "network",
        Identity => "identity",
        Governance => "governance",
        Management => "management",
        Security => "security",
        DataProtection => "data_protection",
        Resilience => "resilience",
        Cost => "cost",
    }
}

closed_vocabulary! {
    /// Scoring display section. Derived from [`DesignArea`], never authored.
    Section {
        Networking => "Networking",
        Identity => "Identity",
        Governance => "Governance",
        Management => "Management",
        Security => "Security",
        DataProtection => "Data Protection",
        Resilience => "Resilience",
        Cost => "Cost",
    }
}

closed_vocabulary! {
    /// Well-Architected Framework pillar.
    WafPillar {
        Security => "Security",
        Reliability => "Reliability",
        CostOptimization => "Cost Optimization",
        OperationalExcellence => "Operational Excellence",
        PerformanceEfficiency => "Performance Efficiency",
    }
}

closed_vocabulary! {
    /// Where a control comes from: the native checklist or a derived rule.
    ControlType {
        Alz => "ALZ",
        Derived => "Derived",
        Manual => "Manual",
        Hybrid => "Hybrid",
    }
}

closed_vocabulary! {
    Severity {
        High => "High",
        Medium => "Medium",
        Low => "Low",
        Info => "Info",
    }
}

closed_vocabulary! {
    /// How a control is scored.
    EvaluationMode {
        Automated => "automated",
        Manual => "manual",
        Hybrid => "hybrid",
    }
}

impl DesignArea {
    /// Fixed design-area to section lookup. Total over the vocabulary.
    pub fn section(&self) -> Section {
        match self {
            Self::Network => Section::Networking,
            Self::Identity => Section::Identity,
            Self::Governance => Section::Governance,
            Self::Management => Section::Management,
            Self::Security => Section::Security,
            Self::DataProtection => Section::DataProtection,
            Self::Resilience => Section::Resilience,
            Self::Cost => Section::Cost,
        }
    }
}

impl Section {
    /// Domain weight used when scoring a section.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Security => 1.5,
            Self::Networking => 1.4,
            Self::Identity => 1.4,
            Self::Governance => 1.3,
            Self::DataProtection => 1.3,
            Self::Resilience => 1.2,
            Self::Management => 1.1,
            Self::Cost => 1.0,
        }
    }

    /// Core landing-zone sections, as opposed to the operational overlay
    /// (data protection, resilience, cost).
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            Self::Identity | Self::Networking | Self::Governance | Self::Security | Self::Management
        )
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}
