//! Fast hash collections used across the workspace.

pub use rustc_hash::{FxHashMap, FxHashSet};

/// Small inline list for the handful of parents or signals a control has.
pub type SmallIds = smallvec::SmallVec<[String; 4]>;
