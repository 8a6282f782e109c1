//! Module and addon-root discovery over a directory tree

mod discoverer;
mod markers;

pub use discoverer::ModuleDiscoverer;
pub use markers::{
    DiscoveryOptions, DuplicatePolicy, MalformedPolicy, MarkerSet, DEFAULT_DESCRIPTORS,
    DEFAULT_ENTRY_POINTS,
};
