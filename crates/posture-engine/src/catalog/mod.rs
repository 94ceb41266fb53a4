//! Control pack loading.

pub mod pack;

pub use pack::{ControlPack, PackManifest, MANIFEST_FILE};
