//! Taxonomy & control model: closed vocabularies, statuses, and the
//! validate-then-construct path that produces frozen control definitions.

pub mod control;
pub mod status;
pub mod validator;
pub mod vocabulary;

pub use control::{ControlCatalog, ControlDefinition};
pub use status::ControlStatus;
pub use validator::{
    validate_and_build, validate_and_build_value, validate_control, validate_design_area_index,
    RawCatalog, RawDesignArea, REQUIRED_CONTROL_FIELDS,
};
pub use vocabulary::{ControlType, DesignArea, EvaluationMode, Section, Severity, WafPillar};
