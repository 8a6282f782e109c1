//! Module descriptor parsing

pub mod literal;
pub mod reader;

pub use literal::{Literal, LiteralError};
pub use reader::{parse_manifest, Manifest, ManifestReader};
